//! Distributed lock
//! Mission: scoped mutual exclusion over the hot store (spec section 4.2)

use super::HotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// TTL on the lock key. A holder that outlives this has no lock.
    pub expiration: Duration,
    /// Total time to keep retrying a contended lock. Zero means a single
    /// non-blocking attempt.
    pub timeout: Duration,
    /// Sleep between retry attempts.
    pub retry_interval: Duration,
}

impl LockOptions {
    pub fn non_blocking(expiration: Duration) -> Self {
        Self {
            expiration,
            timeout: Duration::ZERO,
            retry_interval: Duration::from_millis(50),
        }
    }
}

/// A held lock. Carries the fencing value so `Unlock` can verify
/// ownership before releasing.
pub struct LockGuard {
    pub key: String,
    pub value: String,
}

pub struct DistributedLock {
    store: Arc<dyn HotStore>,
}

impl DistributedLock {
    pub fn new(store: Arc<dyn HotStore>) -> Self {
        Self { store }
    }

    /// Attempts to acquire `key`, retrying per `options` until acquired,
    /// the token is cancelled, or `options.timeout` elapses.
    pub async fn lock(
        &self,
        key: &str,
        options: LockOptions,
        token: &CancellationToken,
    ) -> Result<Option<LockGuard>, super::HotStoreError> {
        let value = Uuid::new_v4().to_string();
        let deadline = tokio::time::Instant::now() + options.timeout;

        loop {
            if token.is_cancelled() {
                return Err(super::HotStoreError::Cancelled);
            }

            let acquired = self
                .store
                .set_nx_ex(key, &value, options.expiration, token)
                .await?;

            if acquired {
                debug!(key = %key, "lock acquired");
                return Ok(Some(LockGuard {
                    key: key.to_string(),
                    value,
                }));
            }

            if options.timeout.is_zero() || tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }

            tokio::select! {
                _ = tokio::time::sleep(options.retry_interval) => {}
                _ = token.cancelled() => return Err(super::HotStoreError::Cancelled),
            }
        }
    }

    /// Releases `key` iff the stored value still equals `value`. Never
    /// errors when the lock is already absent or held by someone else —
    /// release is idempotent by design (spec section 4.2).
    pub async fn unlock(&self, key: &str, value: &str, token: &CancellationToken) {
        match self.store.eval_compare_and_delete(key, value, token).await {
            Ok(true) => debug!(key = %key, "lock released"),
            Ok(false) => debug!(key = %key, "lock release was a no-op (expired or stolen)"),
            Err(e) => warn!(key = %key, error = %e, "lock release failed, ignoring"),
        }
    }

    pub async fn is_locked(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<bool, super::HotStoreError> {
        self.store.exists(key, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotstore::InMemoryHotStore;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn second_locker_is_rejected_until_release() {
        let store: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
        let lock = DistributedLock::new(store);
        let t = token();

        let guard = lock
            .lock("signin:lock:1", LockOptions::non_blocking(Duration::from_secs(10)), &t)
            .await
            .unwrap()
            .expect("first lock should succeed");

        let second = lock
            .lock("signin:lock:1", LockOptions::non_blocking(Duration::from_secs(10)), &t)
            .await
            .unwrap();
        assert!(second.is_none(), "contended lock must fail");

        lock.unlock(&guard.key, &guard.value, &t).await;

        let third = lock
            .lock("signin:lock:1", LockOptions::non_blocking(Duration::from_secs(10)), &t)
            .await
            .unwrap();
        assert!(third.is_some(), "lock must be available after release");
    }

    #[tokio::test]
    async fn unlock_with_wrong_value_is_a_noop() {
        let store: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
        let lock = DistributedLock::new(store);
        let t = token();

        let guard = lock
            .lock("k", LockOptions::non_blocking(Duration::from_secs(10)), &t)
            .await
            .unwrap()
            .unwrap();

        lock.unlock(&guard.key, "not-the-fencing-value", &t).await;

        let contender = lock
            .lock("k", LockOptions::non_blocking(Duration::from_secs(10)), &t)
            .await
            .unwrap();
        assert!(contender.is_none(), "stale unlock must not release a live lock");
    }

    #[tokio::test]
    async fn unlock_on_absent_key_never_errors() {
        let store: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
        let lock = DistributedLock::new(store);
        let t = token();
        lock.unlock("never-locked", "whatever", &t).await;
    }
}
