//! In-memory HotStore test double.
//! Mission: exercise StatsCore/SigninEngine/DistributedLock without a
//! running Redis, following the teacher's hand-rolled-fake-over-mock-
//! framework idiom (see auth::user_store's tempfile-backed tests).

use super::{check_cancelled, HotStore, HotStoreError, HotStoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, std::collections::HashSet<String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
}

impl State {
    fn sweep_expired(&mut self, key: &str) {
        if let Some(entry) = self.strings.get(key) {
            if let Some(exp) = entry.expires_at {
                if Instant::now() >= exp {
                    self.strings.remove(key);
                }
            }
        }
    }
}

/// Thread-safe in-memory stand-in for the remote data server.
#[derive(Clone, Default)]
pub struct InMemoryHotStore {
    state: std::sync::Arc<Mutex<State>>,
}

impl InMemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HotStore for InMemoryHotStore {
    async fn get(&self, key: &str, token: &CancellationToken) -> HotStoreResult<Option<String>> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        s.sweep_expired(key);
        Ok(s.strings.get(key).map(|e| e.value.clone()))
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        s.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[&str], token: &CancellationToken) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let mut count = 0u64;
        for k in keys {
            if s.strings.remove(*k).is_some()
                || s.hashes.remove(*k).is_some()
                || s.sets.remove(*k).is_some()
                || s.zsets.remove(*k).is_some()
            {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn exists(&self, key: &str, token: &CancellationToken) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        s.sweep_expired(key);
        Ok(s.strings.contains_key(key) || s.hashes.contains_key(key))
    }

    async fn expire(
        &self,
        key: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        if let Some(entry) = s.strings.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
            return Ok(true);
        }
        Ok(false)
    }

    async fn incr(&self, key: &str, token: &CancellationToken) -> HotStoreResult<i64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let entry = s.strings.entry(key.to_string()).or_default();
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn decr(&self, key: &str, token: &CancellationToken) -> HotStoreResult<i64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let entry = s.strings.entry(key.to_string()).or_default();
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current - 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn hget(
        &self,
        key: &str,
        field: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<String> {
        check_cancelled(token)?;
        let s = self.state.lock();
        Ok(s.hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned()
            .unwrap_or_default())
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        s.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hmset(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let h = s.hashes.entry(key.to_string()).or_default();
        for (f, v) in fields {
            h.insert(f.clone(), v.clone());
        }
        Ok(())
    }

    async fn hdel(
        &self,
        key: &str,
        fields: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let mut count = 0u64;
        if let Some(h) = s.hashes.get_mut(key) {
            for f in fields {
                if h.remove(*f).is_some() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn hgetall(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<HashMap<String, String>> {
        check_cancelled(token)?;
        let s = self.state.lock();
        Ok(s.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hincrby(
        &self,
        key: &str,
        field: &str,
        delta: i64,
        token: &CancellationToken,
    ) -> HotStoreResult<i64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let h = s.hashes.entry(key.to_string()).or_default();
        let current: i64 = h.get(field).map(|v| v.parse().unwrap_or(0)).unwrap_or(0);
        let next = current + delta;
        h.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn hmget(
        &self,
        key: &str,
        fields: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<String>> {
        check_cancelled(token)?;
        let s = self.state.lock();
        let h = s.hashes.get(key);
        Ok(fields
            .iter()
            .map(|f| h.and_then(|h| h.get(*f)).cloned().unwrap_or_default())
            .collect())
    }

    async fn sadd(
        &self,
        key: &str,
        members: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let set = s.sets.entry(key.to_string()).or_default();
        let mut added = 0u64;
        for m in members {
            if set.insert(m.to_string()) {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn srem(
        &self,
        key: &str,
        members: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        let mut removed = 0u64;
        if let Some(set) = s.sets.get_mut(key) {
            for m in members {
                if set.remove(*m) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn smembers(&self, key: &str, token: &CancellationToken) -> HotStoreResult<Vec<String>> {
        check_cancelled(token)?;
        let s = self.state.lock();
        Ok(s.sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scard(&self, key: &str, token: &CancellationToken) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        let s = self.state.lock();
        Ok(s.sets.get(key).map(|set| set.len() as u64).unwrap_or(0))
    }

    async fn sismember(
        &self,
        key: &str,
        member: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let s = self.state.lock();
        Ok(s.sets
            .get(key)
            .map(|set| set.contains(member))
            .unwrap_or(false))
    }

    async fn zadd(
        &self,
        key: &str,
        member: &str,
        score: f64,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        s.zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        limit: usize,
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<(String, f64)>> {
        check_cancelled(token)?;
        let s = self.state.lock();
        let mut entries: Vec<(String, f64)> = s
            .zsets
            .get(key)
            .map(|z| z.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        entries.truncate(limit);
        Ok(entries)
    }

    async fn zrevrank(
        &self,
        key: &str,
        member: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<Option<u64>> {
        check_cancelled(token)?;
        let s = self.state.lock();
        let Some(z) = s.zsets.get(key) else {
            return Ok(None);
        };
        if !z.contains_key(member) {
            return Ok(None);
        }
        let mut entries: Vec<(&String, &f64)> = z.iter().collect();
        entries.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap());
        let rank = entries.iter().position(|(m, _)| m.as_str() == member);
        Ok(rank.map(|r| r as u64))
    }

    async fn eval_compare_and_delete(
        &self,
        key: &str,
        expected: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        match s.strings.get(key) {
            Some(entry) if entry.value == expected => {
                s.strings.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut s = self.state.lock();
        s.sweep_expired(key);
        if s.strings.contains_key(key) {
            return Ok(false);
        }
        s.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hincrby_tracks_running_total() {
        let store = InMemoryHotStore::new();
        let token = CancellationToken::new();
        assert_eq!(
            store.hincrby("k", "f", 5, &token).await.unwrap(),
            5
        );
        assert_eq!(
            store.hincrby("k", "f", -2, &token).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn set_nx_ex_only_sets_once() {
        let store = InMemoryHotStore::new();
        let token = CancellationToken::new();
        assert!(store
            .set_nx_ex("lock", "v1", Duration::from_secs(10), &token)
            .await
            .unwrap());
        assert!(!store
            .set_nx_ex("lock", "v2", Duration::from_secs(10), &token)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn compare_and_delete_requires_matching_value() {
        let store = InMemoryHotStore::new();
        let token = CancellationToken::new();
        store
            .set_ex("lock", "v1", Duration::from_secs(10), &token)
            .await
            .unwrap();
        assert!(!store
            .eval_compare_and_delete("lock", "wrong", &token)
            .await
            .unwrap());
        assert!(store
            .eval_compare_and_delete("lock", "v1", &token)
            .await
            .unwrap());
        assert!(store.get("lock", &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancellation_short_circuits_before_io() {
        let store = InMemoryHotStore::new();
        let token = CancellationToken::new();
        token.cancel();
        let err = store.get("k", &token).await.unwrap_err();
        matches!(err, HotStoreError::Cancelled);
    }
}
