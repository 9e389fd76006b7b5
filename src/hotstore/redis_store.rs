//! Redis-backed HotStore implementation.
//! Mission: talk to the remote in-memory data server over the wire
//! contract in spec section 6.

use super::{check_cancelled, HotStore, HotStoreError, HotStoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct RedisHotStore {
    manager: ConnectionManager,
}

impl RedisHotStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    fn map_err(e: redis::RedisError) -> HotStoreError {
        HotStoreError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl HotStore for RedisHotStore {
    async fn get(&self, key: &str, token: &CancellationToken) -> HotStoreResult<Option<String>> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(Self::map_err)
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs)
            .await
            .map_err(Self::map_err)
    }

    async fn del(&self, keys: &[&str], token: &CancellationToken) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        conn.del(keys).await.map_err(Self::map_err)
    }

    async fn exists(&self, key: &str, token: &CancellationToken) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.exists(key).await.map_err(Self::map_err)
    }

    async fn expire(
        &self,
        key: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.expire(key, ttl.as_secs().max(1) as i64)
            .await
            .map_err(Self::map_err)
    }

    async fn incr(&self, key: &str, token: &CancellationToken) -> HotStoreResult<i64> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.incr(key, 1).await.map_err(Self::map_err)
    }

    async fn decr(&self, key: &str, token: &CancellationToken) -> HotStoreResult<i64> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.decr(key, 1).await.map_err(Self::map_err)
    }

    async fn hget(
        &self,
        key: &str,
        field: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<String> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.hget(key, field).await.map_err(Self::map_err)?;
        Ok(value.unwrap_or_default())
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(Self::map_err)
    }

    async fn hmset(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let pairs: Vec<(&String, &String)> = fields.iter().collect();
        conn.hset_multiple::<_, _, _, ()>(key, &pairs)
            .await
            .map_err(Self::map_err)
    }

    async fn hdel(
        &self,
        key: &str,
        fields: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        conn.hdel(key, fields).await.map_err(Self::map_err)
    }

    async fn hgetall(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<HashMap<String, String>> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.hgetall(key).await.map_err(Self::map_err)
    }

    async fn hincrby(
        &self,
        key: &str,
        field: &str,
        delta: i64,
        token: &CancellationToken,
    ) -> HotStoreResult<i64> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.hincr(key, field, delta).await.map_err(Self::map_err)
    }

    async fn hmget(
        &self,
        key: &str,
        fields: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<String>> {
        check_cancelled(token)?;
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        let values: Vec<Option<String>> = conn.hget(key, fields).await.map_err(Self::map_err)?;
        Ok(values.into_iter().map(|v| v.unwrap_or_default()).collect())
    }

    async fn sadd(
        &self,
        key: &str,
        members: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        conn.sadd(key, members).await.map_err(Self::map_err)
    }

    async fn srem(
        &self,
        key: &str,
        members: &[&str],
        token: &CancellationToken,
    ) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        conn.srem(key, members).await.map_err(Self::map_err)
    }

    async fn smembers(&self, key: &str, token: &CancellationToken) -> HotStoreResult<Vec<String>> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.smembers(key).await.map_err(Self::map_err)
    }

    async fn scard(&self, key: &str, token: &CancellationToken) -> HotStoreResult<u64> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.scard(key).await.map_err(Self::map_err)
    }

    async fn sismember(
        &self,
        key: &str,
        member: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.sismember(key, member).await.map_err(Self::map_err)
    }

    async fn zadd(
        &self,
        key: &str,
        member: &str,
        score: f64,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.zadd::<_, _, _, ()>(key, member, score)
            .await
            .map_err(Self::map_err)
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        limit: usize,
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<(String, f64)>> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        let stop = if limit == 0 { 0 } else { (limit - 1) as isize };
        conn.zrevrange_withscores(key, 0, stop)
            .await
            .map_err(Self::map_err)
    }

    async fn zrevrank(
        &self,
        key: &str,
        member: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<Option<u64>> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        conn.zrevrank(key, member).await.map_err(Self::map_err)
    }

    async fn eval_compare_and_delete(
        &self,
        key: &str,
        expected: &str,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        // Reads then deletes atomically server-side — the fencing check
        // for DistributedLock::unlock (spec section 4.2).
        let script = Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
            "#,
        );
        let deleted: i64 = script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(deleted > 0)
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        token: &CancellationToken,
    ) -> HotStoreResult<bool> {
        check_cancelled(token)?;
        let mut conn = self.manager.clone();
        let secs = ttl.as_secs().max(1);
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(secs)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(result.is_some())
    }
}
