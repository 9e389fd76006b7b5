//! Hot store façade
//! Mission: typed, cancellable access to the remote in-memory data server
//! that mirrors engagement state while an object is hot (spec section 4.1)

pub mod lock;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use lock::{DistributedLock, LockOptions};
pub use memory::InMemoryHotStore;
pub use redis_store::RedisHotStore;

#[derive(Debug)]
pub enum HotStoreError {
    Unavailable(String),
    Cancelled,
}

impl std::fmt::Display for HotStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HotStoreError::Unavailable(c) => write!(f, "hot store unavailable: {c}"),
            HotStoreError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for HotStoreError {}

pub type HotStoreResult<T> = Result<T, HotStoreError>;

/// Checks a token before doing I/O, per spec section 5: "Cancellation
/// before starting an I/O returns a Cancelled error without side effects."
pub fn check_cancelled(token: &CancellationToken) -> HotStoreResult<()> {
    if token.is_cancelled() {
        Err(HotStoreError::Cancelled)
    } else {
        Ok(())
    }
}

/// Semantic façade over the remote in-memory server (spec section 4.1).
/// Every operation is cancellable; Get/HGet distinguish "absent" from
/// transport failure, writes never fail with "not found".
#[async_trait]
pub trait HotStore: Send + Sync {
    async fn get(&self, key: &str, token: &CancellationToken) -> HotStoreResult<Option<String>>;
    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<()>;
    async fn del(&self, keys: &[&str], token: &CancellationToken) -> HotStoreResult<u64>;
    async fn exists(&self, key: &str, token: &CancellationToken) -> HotStoreResult<bool>;
    async fn expire(
        &self,
        key: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<bool>;
    async fn incr(&self, key: &str, token: &CancellationToken) -> HotStoreResult<i64>;
    async fn decr(&self, key: &str, token: &CancellationToken) -> HotStoreResult<i64>;

    async fn hget(
        &self,
        key: &str,
        field: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<String>;
    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<()>;
    async fn hmset(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> HotStoreResult<()>;
    async fn hdel(
        &self,
        key: &str,
        fields: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64>;
    async fn hgetall(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<HashMap<String, String>>;
    async fn hincrby(
        &self,
        key: &str,
        field: &str,
        delta: i64,
        token: &CancellationToken,
    ) -> HotStoreResult<i64>;
    async fn hmget(
        &self,
        key: &str,
        fields: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<String>>;

    async fn sadd(
        &self,
        key: &str,
        members: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64>;
    async fn srem(
        &self,
        key: &str,
        members: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64>;
    async fn smembers(&self, key: &str, token: &CancellationToken) -> HotStoreResult<Vec<String>>;
    async fn scard(&self, key: &str, token: &CancellationToken) -> HotStoreResult<u64>;
    async fn sismember(
        &self,
        key: &str,
        member: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<bool>;

    async fn zadd(
        &self,
        key: &str,
        member: &str,
        score: f64,
        token: &CancellationToken,
    ) -> HotStoreResult<()>;
    /// Reverse-range by score, highest first, up to `limit` entries.
    async fn zrevrange_with_scores(
        &self,
        key: &str,
        limit: usize,
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<(String, f64)>>;
    async fn zrevrank(
        &self,
        key: &str,
        member: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<Option<u64>>;

    /// Compare-and-delete: deletes `key` iff its current value equals
    /// `expected`, as one atomic server-side operation. Used by
    /// DistributedLock::unlock.
    async fn eval_compare_and_delete(
        &self,
        key: &str,
        expected: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<bool>;

    /// Sets `key=value` with `ttl` only if absent (`SET NX EX`). Used by
    /// DistributedLock::lock.
    async fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<bool>;
}

/// Parses a hash field as a non-negative integer, treating an absent
/// field (empty string) as zero — spec section 4.1's numeric-conversion
/// rule for counter hashes.
pub fn field_as_i64(value: &str) -> i64 {
    if value.is_empty() {
        0
    } else {
        value.parse().unwrap_or(0)
    }
}
