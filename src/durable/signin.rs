//! Sign-in repository
//! Mission: authoritative sign-in state, append-only log, and the
//! single durable transaction spec section 4.4 step 6 requires (log
//! insert + status upsert + balance credit + balance-log append).

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SigninStatusRow {
    pub last_signin_date: Option<NaiveDate>,
    pub continuous_days: i64,
    pub total_days: i64,
}

pub struct SigninCommit {
    pub user_id: i64,
    pub date: NaiveDate,
    pub continuous_days: i64,
    pub total_days: i64,
    pub reward: i64,
}

pub enum SigninCommitOutcome {
    Committed { balance_after: i64 },
    /// The (user, date) uniqueness constraint rejected the log insert —
    /// a concurrent attempt (or a replica race the lock didn't catch)
    /// beat this one to it.
    AlreadySignedToday,
}

pub struct SigninRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SigninRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn get_status(&self, user_id: i64) -> Result<Option<SigninStatusRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT last_signin_date, continuous_days, total_days FROM user_signin_status WHERE user_id = ?1",
        )?;
        let row = stmt
            .query_row(params![user_id], |row| {
                let date_str: Option<String> = row.get(0)?;
                Ok(SigninStatusRow {
                    last_signin_date: date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
                    continuous_days: row.get(1)?,
                    total_days: row.get(2)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    pub async fn has_log(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT 1 FROM user_signin_logs WHERE user_id = ?1 AND sign_date = ?2 LIMIT 1",
        )?;
        let exists = stmt
            .query_row(params![user_id, date.format("%Y-%m-%d").to_string()], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    /// Runs the full sign-in commit as one transaction: log insert,
    /// status upsert, point credit, balance-log append.
    pub async fn commit_signin(&self, input: SigninCommit) -> Result<SigninCommitOutcome> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().context("begin signin transaction")?;
        let date_str = input.date.format("%Y-%m-%d").to_string();
        let now = Utc::now().to_rfc3339();

        let log_result = tx.execute(
            "INSERT INTO user_signin_logs (user_id, sign_date, created_at) VALUES (?1, ?2, ?3)",
            params![input.user_id, date_str, now],
        );

        match log_result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Ok(SigninCommitOutcome::AlreadySignedToday);
            }
            Err(e) => return Err(e).context("insert signin log"),
        }

        tx.execute(
            "INSERT INTO user_signin_status (user_id, last_signin_date, continuous_days, total_days)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                last_signin_date = excluded.last_signin_date,
                continuous_days = excluded.continuous_days,
                total_days = excluded.total_days",
            params![input.user_id, date_str, input.continuous_days, input.total_days],
        )
        .context("upsert signin status")?;

        let before_amount: i64 = tx
            .query_row(
                "SELECT points FROM users WHERE id = ?1",
                params![input.user_id],
                |row| row.get(0),
            )
            .context("read user points before credit")?;
        let after_amount = before_amount + input.reward;

        tx.execute(
            "UPDATE users SET points = ?1, updated_at = ?2 WHERE id = ?3",
            params![after_amount, now, input.user_id],
        )
        .context("credit user points")?;

        tx.execute(
            "INSERT INTO user_balance_logs
             (user_id, type, amount, before_amount, after_amount, reason, operator_id, related_id, related_type, ip_address, created_at)
             VALUES (?1, 'signin_reward', ?2, ?3, ?4, 'daily sign-in reward', NULL, NULL, NULL, NULL, ?5)",
            params![input.user_id, input.reward, before_amount, after_amount, now],
        )
        .context("append balance log")?;

        tx.commit().context("commit signin transaction")?;

        Ok(SigninCommitOutcome::Committed {
            balance_after: after_amount,
        })
    }

    pub async fn continuous_ranking(&self, limit: usize) -> Result<Vec<(i64, i64, i64)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, continuous_days, total_days FROM user_signin_status
             ORDER BY continuous_days DESC, total_days DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
