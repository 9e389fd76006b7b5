//! Configuration
//! Mission: Load environment-driven settings with sane defaults

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardMode {
    Fixed,
    Increment,
    Random,
}

impl RewardMode {
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(RewardMode::Fixed),
            "increment" => Ok(RewardMode::Increment),
            "random" => Ok(RewardMode::Random),
            other => anyhow::bail!("unknown SIGNIN_REWARD_MODE: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub mode: RewardMode,
    pub fixed_reward: i64,
    pub increment_base: i64,
    pub increment_step: i64,
    pub increment_cycle: i64,
    pub clamp: i64,
    pub random_min: i64,
    pub random_max: i64,
    pub experience_reward: f64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub hotstore_url: String,
    pub durable_db_path: String,
    pub jwt_secret: String,
    pub signin_timezone_offset_minutes: i32,
    pub signin_lock_ttl: Duration,
    pub reward: RewardConfig,
    pub stats_hot_ttl: Duration,
    pub stats_dirty_set_soft_cap: usize,
    pub persister_interval: Duration,
    pub persister_batch_size: usize,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let reward = RewardConfig {
            mode: RewardMode::from_str(&env_or("SIGNIN_REWARD_MODE", "fixed"))?,
            fixed_reward: env_parse("SIGNIN_REWARD_FIXED", 10)?,
            increment_base: env_parse("SIGNIN_REWARD_INCREMENT_BASE", 5)?,
            increment_step: env_parse("SIGNIN_REWARD_INCREMENT_STEP", 1)?,
            increment_cycle: env_parse("SIGNIN_REWARD_INCREMENT_CYCLE", 7)?,
            clamp: env_parse("SIGNIN_REWARD_CLAMP", 30)?,
            random_min: env_parse("SIGNIN_REWARD_RANDOM_MIN", 5)?,
            random_max: env_parse("SIGNIN_REWARD_RANDOM_MAX", 15)?,
            experience_reward: env_parse("SIGNIN_EXPERIENCE_REWARD", 0.0)?,
        };

        if reward.increment_cycle <= 0 {
            anyhow::bail!("SIGNIN_REWARD_INCREMENT_CYCLE must be positive");
        }
        if reward.random_min > reward.random_max {
            anyhow::bail!("SIGNIN_REWARD_RANDOM_MIN must be <= SIGNIN_REWARD_RANDOM_MAX");
        }

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            hotstore_url: env_or("HOTSTORE_URL", "redis://127.0.0.1:6379"),
            durable_db_path: env_or("DURABLE_DB_PATH", "./data/forum.db"),
            jwt_secret: env_or("JWT_SECRET", "dev-secret-change-me"),
            signin_timezone_offset_minutes: env_parse("SIGNIN_TIMEZONE_OFFSET_MINUTES", 0)?,
            signin_lock_ttl: Duration::from_millis(env_parse("SIGNIN_LOCK_TTL_MS", 10_000)?),
            reward,
            stats_hot_ttl: Duration::from_secs(env_parse("STATS_HOT_TTL_SECONDS", 3_600)?),
            stats_dirty_set_soft_cap: env_parse("STATS_DIRTY_SET_SOFT_CAP", 100_000)?,
            persister_interval: Duration::from_secs(env_parse("PERSISTER_INTERVAL_SECONDS", 30)?),
            persister_batch_size: env_parse("PERSISTER_BATCH_SIZE", 500)?,
            rate_limit_max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 100)?,
            rate_limit_window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECONDS", 60)?),
        })
        .context("loading AppConfig from environment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_mode_parses_known_values() {
        assert_eq!(RewardMode::from_str("fixed").unwrap(), RewardMode::Fixed);
        assert_eq!(
            RewardMode::from_str("INCREMENT").unwrap(),
            RewardMode::Increment
        );
        assert!(RewardMode::from_str("bogus").is_err());
    }
}
