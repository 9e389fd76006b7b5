//! Action repositories
//! Mission: authoritative durable mirror of per-(user,target) actions
//! (spec section 3's UserAction). StatsCore writes through here
//! synchronously on every toggle so a cold hot-store can recover
//! "has this user acted?" state (spec section 4.3).

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct PostActionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PostActionRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Inserts the (user, post, kind) row if absent; a no-op if it
    /// already exists (best-effort — the hot action hash is the source
    /// of truth while the object is hot).
    pub async fn set(&self, user_id: i64, post_id: i64, kind: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO post_actions (user_id, post_id, action_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, post_id, kind, now],
        )
        .context("insert post action")?;
        Ok(())
    }

    pub async fn clear(&self, user_id: i64, post_id: i64, kind: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM post_actions WHERE user_id = ?1 AND post_id = ?2 AND action_type = ?3",
            params![user_id, post_id, kind],
        )
        .context("delete post action")?;
        Ok(())
    }
}

pub struct CommentActionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CommentActionRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn set(&self, user_id: i64, comment_id: i64, kind: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO comment_actions (user_id, comment_id, action_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, comment_id, kind, now],
        )
        .context("insert comment action")?;
        Ok(())
    }

    pub async fn clear(&self, user_id: i64, comment_id: i64, kind: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM comment_actions WHERE user_id = ?1 AND comment_id = ?2 AND action_type = ?3",
            params![user_id, comment_id, kind],
        )
        .context("delete comment action")?;
        Ok(())
    }
}
