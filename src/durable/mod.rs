//! Durable store
//! Mission: repositories over the relational database (spec section 4.3,
//! the "DurableStore" leaf described in section 2).
//!
//! Connection-management idiom grounded on vault::vault_db::VaultDb: one
//! SQLite connection guarded by a tokio mutex, shared by every
//! repository via Arc clone.

mod schema;

pub mod actions;
pub mod comments;
pub mod posts;
pub mod signin;
pub mod users;

pub use actions::{CommentActionRepository, PostActionRepository};
pub use comments::CommentRepository;
pub use posts::PostRepository;
pub use signin::SigninRepository;
pub use users::UserRepository;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct DurableStore {
    conn: Arc<Mutex<Connection>>,
}

impl DurableStore {
    pub fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("create durable store directory")?;
            }
        }

        let conn = Connection::open(db_path).context("open durable store")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.execute_batch(schema::DDL).context("apply durable schema")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory durable store")?;
        conn.execute_batch(schema::DDL).context("apply durable schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.conn.clone())
    }

    pub fn posts(&self) -> PostRepository {
        PostRepository::new(self.conn.clone())
    }

    pub fn comments(&self) -> CommentRepository {
        CommentRepository::new(self.conn.clone())
    }

    pub fn post_actions(&self) -> PostActionRepository {
        PostActionRepository::new(self.conn.clone())
    }

    pub fn comment_actions(&self) -> CommentActionRepository {
        CommentActionRepository::new(self.conn.clone())
    }

    pub fn signin(&self) -> SigninRepository {
        SigninRepository::new(self.conn.clone())
    }
}
