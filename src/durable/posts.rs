//! Post repository
//! Mission: the minimal post persistence needed to make counters and
//! cold-read hydration meaningful (spec section 3's Post entity). Full
//! authoring/moderation CRUD is out of scope per spec section 1.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostCounters {
    pub like_count: i64,
    pub dislike_count: i64,
    pub favorite_count: i64,
    pub view_count: i64,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub content: String,
    pub counters: PostCounters,
}

pub struct PostRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PostRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn create(&self, user_id: i64, category_id: i64, title: &str, content: &str) -> Result<PostRow> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO posts (user_id, category_id, title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user_id, category_id, title, content, now],
        )
        .context("insert post")?;
        let id = conn.last_insert_rowid();
        Ok(PostRow {
            id,
            user_id,
            category_id,
            title: title.to_string(),
            content: content.to_string(),
            counters: PostCounters::default(),
        })
    }

    pub async fn get_by_id(&self, post_id: i64) -> Result<Option<PostRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, user_id, category_id, title, content, like_count, dislike_count, favorite_count, view_count
             FROM posts WHERE id = ?1",
        )?;
        match stmt.query_row(params![post_id], row_to_post) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_counters(&self, post_id: i64) -> Result<Option<PostCounters>> {
        Ok(self.get_by_id(post_id).await?.map(|p| p.counters))
    }

    /// Sets the four aggregate counter fields to the given absolute
    /// values. This is the persister's write-back primitive (spec
    /// section 4.5 step 1b): HotStore values are authoritative, so the
    /// durable row is overwritten, not incremented.
    pub async fn update_counters(&self, post_id: i64, counters: PostCounters) -> Result<bool> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE posts SET like_count = ?1, dislike_count = ?2, favorite_count = ?3, view_count = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                counters.like_count,
                counters.dislike_count,
                counters.favorite_count,
                counters.view_count,
                now,
                post_id,
            ],
        )?;
        Ok(updated > 0)
    }
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        counters: PostCounters {
            like_count: row.get(5)?,
            dislike_count: row.get(6)?,
            favorite_count: row.get(7)?,
            view_count: row.get(8)?,
        },
    })
}
