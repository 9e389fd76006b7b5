//! User repository
//! Mission: CRUD over the users table (spec section 3's User entity),
//! following auth::user_store::UserStore's by-key Option<T> convention.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "superadmin",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "moderator" => UserRole::Moderator,
            "admin" => UserRole::Admin,
            "superadmin" => UserRole::SuperAdmin,
            _ => UserRole::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Normal,
    Mute,
    Blocked,
    ActivationPending,
    RiskControl,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Normal => "normal",
            UserStatus::Mute => "mute",
            UserStatus::Blocked => "blocked",
            UserStatus::ActivationPending => "activation_pending",
            UserStatus::RiskControl => "risk_control",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mute" => UserStatus::Mute,
            "blocked" => UserStatus::Blocked,
            "activation_pending" => UserStatus::ActivationPending,
            "risk_control" => UserStatus::RiskControl,
            _ => UserStatus::Normal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub points: i64,
    pub currency: i64,
    pub email_verified: bool,
    pub created_at: String,
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    let role: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: UserRole::from_str(&role),
        status: UserStatus::from_str(&status),
        points: row.get(6)?,
        currency: row.get(7)?,
        email_verified: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, username, email, password_hash, role, status, points, currency, email_verified, created_at";

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, user_id: i64) -> Result<Option<UserRow>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = ?1");
        let mut stmt = conn.prepare_cached(&sql)?;
        match stmt.query_row(params![user_id], row_to_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE username = ?1");
        let mut stmt = conn.prepare_cached(&sql)?;
        match stmt.query_row(params![username], row_to_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<UserRow> {
        let conn = self.conn.lock().await;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, role, status, points, currency, email_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'normal', 0, 0, 0, ?5, ?5)",
            params![username, email, password_hash, role.as_str(), now],
        )
        .context("insert user")?;
        let id = conn.last_insert_rowid();

        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = ?1");
        let mut stmt = conn.prepare_cached(&sql)?;
        Ok(stmt.query_row(params![id], row_to_user)?)
    }

    pub async fn list(&self) -> Result<Vec<UserRow>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users ORDER BY id ASC");
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
