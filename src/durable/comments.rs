//! Comment repository
//! Mission: minimal comment persistence mirroring posts.rs, restricted
//! to the like/dislike counters spec section 3 defines for comments.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentCounters {
    pub like_count: i64,
    pub dislike_count: i64,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub counters: CommentCounters,
}

pub struct CommentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CommentRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i64,
        post_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<CommentRow> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO comments (user_id, post_id, parent_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user_id, post_id, parent_id, content, now],
        )
        .context("insert comment")?;
        let id = conn.last_insert_rowid();
        Ok(CommentRow {
            id,
            user_id,
            post_id,
            parent_id,
            content: content.to_string(),
            counters: CommentCounters::default(),
        })
    }

    pub async fn get_by_id(&self, comment_id: i64) -> Result<Option<CommentRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, user_id, post_id, parent_id, content, like_count, dislike_count
             FROM comments WHERE id = ?1",
        )?;
        match stmt.query_row(params![comment_id], row_to_comment) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_counters(&self, comment_id: i64) -> Result<Option<CommentCounters>> {
        Ok(self.get_by_id(comment_id).await?.map(|c| c.counters))
    }

    pub async fn update_counters(&self, comment_id: i64, counters: CommentCounters) -> Result<bool> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE comments SET like_count = ?1, dislike_count = ?2, updated_at = ?3 WHERE id = ?4",
            params![counters.like_count, counters.dislike_count, now, comment_id],
        )?;
        Ok(updated > 0)
    }
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        parent_id: row.get(3)?,
        content: row.get(4)?,
        counters: CommentCounters {
            like_count: row.get(5)?,
            dislike_count: row.get(6)?,
        },
    })
}
