//! SigninEngine
//! Mission: enforce at-most-one sign-in per user per calendar day,
//! compute the reward, credit balances atomically, publish the ranking
//! entry (spec section 4.4).

pub mod model;
pub mod policy;

use crate::config::RewardConfig;
use crate::durable::signin::{SigninCommit, SigninCommitOutcome};
use crate::durable::DurableStore;
use crate::error::{AppError, AppResult};
use crate::hotstore::{DistributedLock, HotStore, LockOptions};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use model::{ContinuousRankingEntry, DailyRankingEntry, SigninOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn daily_ranking_key(date: NaiveDate) -> String {
    format!("signin:ranking:{}", date.format("%Y-%m-%d"))
}

pub struct SigninEngine {
    hot: Arc<dyn HotStore>,
    durable: DurableStore,
    lock: DistributedLock,
    lock_ttl: Duration,
    tz_offset_minutes: i32,
    reward: RewardConfig,
}

impl SigninEngine {
    pub fn new(
        hot: Arc<dyn HotStore>,
        durable: DurableStore,
        lock_ttl: Duration,
        tz_offset_minutes: i32,
        reward: RewardConfig,
    ) -> Self {
        let lock = DistributedLock::new(hot.clone());
        Self {
            hot,
            durable,
            lock,
            lock_ttl,
            tz_offset_minutes,
            reward,
        }
    }

    fn today(&self) -> NaiveDate {
        (Utc::now() + ChronoDuration::minutes(self.tz_offset_minutes as i64)).date_naive()
    }

    /// Runs the full sign-in procedure for `user_id` under a per-user
    /// lock. See spec section 4.4 for the step-by-step contract.
    pub async fn signin(
        &self,
        user_id: i64,
        token: &CancellationToken,
    ) -> AppResult<SigninOutcome> {
        let lock_key = format!("signin:lock:{user_id}");
        let options = LockOptions::non_blocking(self.lock_ttl);
        let guard = self
            .lock
            .lock(&lock_key, options, token)
            .await?
            .ok_or(AppError::SigninInProgress)?;

        let result = self.signin_locked(user_id, token).await;

        self.lock.unlock(&guard.key, &guard.value, token).await;
        result
    }

    async fn signin_locked(
        &self,
        user_id: i64,
        token: &CancellationToken,
    ) -> AppResult<SigninOutcome> {
        let date = self.today();
        let signin_repo = self.durable.signin();

        if signin_repo.has_log(user_id, date).await? {
            return Err(AppError::AlreadySignedToday);
        }

        let status = signin_repo.get_status(user_id).await?;
        let (continuous_days, total_days) = match status {
            None => (1, 1),
            Some(s) => match s.last_signin_date {
                None => (1, s.total_days + 1),
                Some(last) => {
                    let gap = (date - last).num_days();
                    if gap == 1 {
                        (s.continuous_days + 1, s.total_days + 1)
                    } else if gap > 1 {
                        (1, s.total_days + 1)
                    } else {
                        return Err(AppError::AlreadySignedToday);
                    }
                }
            },
        };

        let outcome = policy::compute_reward(continuous_days, &self.reward);

        let commit_result = signin_repo
            .commit_signin(SigninCommit {
                user_id,
                date,
                continuous_days,
                total_days,
                reward: outcome.reward,
            })
            .await?;

        let balance_after = match commit_result {
            SigninCommitOutcome::AlreadySignedToday => return Err(AppError::AlreadySignedToday),
            SigninCommitOutcome::Committed { balance_after } => balance_after,
        };

        let ranking_key = daily_ranking_key(date);
        let rank = match self
            .hot
            .zadd(&ranking_key, &user_id.to_string(), continuous_days as f64, token)
            .await
        {
            Ok(()) => {
                let _ = self
                    .hot
                    .expire(&ranking_key, Duration::from_secs(48 * 3600), token)
                    .await;
                self.hot
                    .zrevrank(&ranking_key, &user_id.to_string(), token)
                    .await
                    .unwrap_or(None)
            }
            Err(_) => None,
        };

        Ok(SigninOutcome {
            reward: outcome.reward,
            experience: outcome.experience,
            continuous_days,
            total_days,
            balance_after,
            rank,
        })
    }

    /// Reverse-range of the day's sorted set, top `limit` entries,
    /// enriched with username.
    pub async fn daily_ranking(
        &self,
        date: NaiveDate,
        limit: usize,
        token: &CancellationToken,
    ) -> AppResult<Vec<DailyRankingEntry>> {
        let ranking_key = daily_ranking_key(date);
        let entries = self
            .hot
            .zrevrange_with_scores(&ranking_key, limit, token)
            .await?;

        let users = self.durable.users();
        let mut out = Vec::with_capacity(entries.len());
        for (rank, (member, score)) in entries.into_iter().enumerate() {
            let Ok(user_id) = member.parse::<i64>() else {
                continue;
            };
            let username = users
                .get_by_id(user_id)
                .await
                .ok()
                .flatten()
                .map(|u| u.username)
                .unwrap_or_default();
            out.push(DailyRankingEntry {
                user_id,
                username,
                continuous_days: score as i64,
                rank: rank as u64,
            });
        }
        Ok(out)
    }

    /// Durable query over the status table, ordered by continuous-days
    /// desc then total-days desc.
    pub async fn continuous_ranking(&self, limit: usize) -> AppResult<Vec<ContinuousRankingEntry>> {
        let rows = self.durable.signin().continuous_ranking(limit).await?;
        Ok(rows
            .into_iter()
            .map(|(user_id, continuous_days, total_days)| ContinuousRankingEntry {
                user_id,
                continuous_days,
                total_days,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardMode;
    use crate::hotstore::InMemoryHotStore;

    fn reward_config() -> RewardConfig {
        RewardConfig {
            mode: RewardMode::Fixed,
            fixed_reward: 10,
            increment_base: 5,
            increment_step: 1,
            increment_cycle: 7,
            clamp: 30,
            random_min: 5,
            random_max: 15,
            experience_reward: 0.0,
        }
    }

    fn engine() -> SigninEngine {
        let hot: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
        let durable = DurableStore::open_in_memory().unwrap();
        SigninEngine::new(hot, durable, Duration::from_secs(10), 0, reward_config())
    }

    #[tokio::test]
    async fn first_signin_starts_a_streak_of_one() {
        let engine = engine();
        let token = CancellationToken::new();

        engine.durable.users().create("alice", "a@x.com", "h", crate::durable::users::UserRole::User).await.unwrap();

        let outcome = engine.signin(1, &token).await.unwrap();
        assert_eq!(outcome.continuous_days, 1);
        assert_eq!(outcome.total_days, 1);
        assert_eq!(outcome.reward, 10);
        assert_eq!(outcome.balance_after, 10);
    }

    #[tokio::test]
    async fn second_signin_same_day_is_rejected() {
        let engine = engine();
        let token = CancellationToken::new();

        engine.signin(1, &token).await.unwrap();
        let second = engine.signin(1, &token).await;
        assert!(matches!(second, Err(AppError::AlreadySignedToday)));
    }
}
