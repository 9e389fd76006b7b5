//! Persister
//! Mission: converge HotStore counters into the durable store at a
//! bounded lag (spec section 4.5).

use crate::durable::comments::CommentCounters;
use crate::durable::posts::PostCounters;
use crate::durable::DurableStore;
use crate::hotstore::{field_as_i64, HotStore};
use crate::stats::keys;
use crate::stats::model::TargetKind;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct Persister {
    hot: Arc<dyn HotStore>,
    durable: DurableStore,
    interval: Duration,
    batch_size: usize,
}

impl Persister {
    pub fn new(
        hot: Arc<dyn HotStore>,
        durable: DurableStore,
        interval: Duration,
        batch_size: usize,
    ) -> Self {
        Self {
            hot,
            durable,
            interval,
            batch_size,
        }
    }

    /// Runs the drain loop until `token` is cancelled, sleeping
    /// `interval` between cycles. Also drains once unconditionally on
    /// shutdown so nothing is lost at process exit.
    pub async fn run(&self, token: CancellationToken) {
        loop {
            self.run_once(&token).await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = token.cancelled() => {
                    debug!("persister shutting down, running final drain");
                    self.run_once(&CancellationToken::new()).await;
                    return;
                }
            }
        }
    }

    /// Runs a single drain cycle over both post and comment dirty sets.
    pub async fn run_once(&self, token: &CancellationToken) {
        self.drain_kind(TargetKind::Post, token).await;
        self.drain_kind(TargetKind::Comment, token).await;
    }

    async fn drain_kind(&self, kind: TargetKind, token: &CancellationToken) {
        let set_key = kind.dirty_set_key();
        let members = match self.hot.smembers(set_key, token).await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "persister failed to read dirty set");
                return;
            }
        };

        for id_str in members.into_iter().take(self.batch_size) {
            let Ok(id) = id_str.parse::<i64>() else {
                continue;
            };
            self.persist_one(kind, id, token).await;
        }
    }

    async fn persist_one(&self, kind: TargetKind, id: i64, token: &CancellationToken) {
        let stats_key = match kind {
            TargetKind::Post => keys::post_stats_key(id),
            TargetKind::Comment => keys::comment_stats_key(id),
        };

        let fields = match self.hot.hgetall(&stats_key, token).await {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, id, "persister failed to read counter hash");
                return;
            }
        };

        if fields.is_empty() {
            // Nothing to persist — drop from the dirty set.
            self.remove_from_dirty(kind, id, token).await;
            return;
        }

        let write_result = match kind {
            TargetKind::Post => {
                let counters = PostCounters {
                    like_count: fields.get("like_count").map(|v| field_as_i64(v)).unwrap_or(0),
                    dislike_count: fields
                        .get("dislike_count")
                        .map(|v| field_as_i64(v))
                        .unwrap_or(0),
                    favorite_count: fields
                        .get("favorite_count")
                        .map(|v| field_as_i64(v))
                        .unwrap_or(0),
                    view_count: fields.get("view_count").map(|v| field_as_i64(v)).unwrap_or(0),
                };
                self.durable.posts().update_counters(id, counters).await
            }
            TargetKind::Comment => {
                let counters = CommentCounters {
                    like_count: fields.get("like_count").map(|v| field_as_i64(v)).unwrap_or(0),
                    dislike_count: fields
                        .get("dislike_count")
                        .map(|v| field_as_i64(v))
                        .unwrap_or(0),
                };
                self.durable.comments().update_counters(id, counters).await
            }
        };

        match write_result {
            Ok(_) => self.remove_from_dirty(kind, id, token).await,
            Err(e) => warn!(error = %e, id, "persister durable write failed, retrying next cycle"),
        }
    }

    async fn remove_from_dirty(&self, kind: TargetKind, id: i64, token: &CancellationToken) {
        let set_key = kind.dirty_set_key();
        if let Err(e) = self.hot.srem(set_key, &[&id.to_string()], token).await {
            warn!(error = %e, id, "persister failed to clear dirty marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotstore::InMemoryHotStore;

    fn persister() -> (Persister, Arc<dyn HotStore>, DurableStore) {
        let hot: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
        let durable = DurableStore::open_in_memory().unwrap();
        let persister = Persister::new(hot.clone(), durable.clone(), Duration::from_secs(30), 500);
        (persister, hot, durable)
    }

    #[tokio::test]
    async fn drains_a_dirty_post_into_the_durable_row() {
        let (persister, hot, durable) = persister();
        let token = CancellationToken::new();

        let row = durable.posts().create(1, 1, "t", "c").await.unwrap();
        hot.hincrby(&keys::post_stats_key(row.id), "like_count", 3, &token)
            .await
            .unwrap();
        hot.sadd(TargetKind::Post.dirty_set_key(), &[&row.id.to_string()], &token)
            .await
            .unwrap();

        persister.run_once(&token).await;

        let counters = durable.posts().get_counters(row.id).await.unwrap().unwrap();
        assert_eq!(counters.like_count, 3);

        let still_dirty = hot
            .smembers(TargetKind::Post.dirty_set_key(), &token)
            .await
            .unwrap();
        assert!(!still_dirty.contains(&row.id.to_string()));
    }

    #[tokio::test]
    async fn absent_counter_hash_drops_the_id_without_writing() {
        let (persister, hot, _durable) = persister();
        let token = CancellationToken::new();

        hot.sadd(TargetKind::Post.dirty_set_key(), &[&"999".to_string()], &token)
            .await
            .unwrap();

        persister.run_once(&token).await;

        let still_dirty = hot
            .smembers(TargetKind::Post.dirty_set_key(), &token)
            .await
            .unwrap();
        assert!(still_dirty.is_empty());
    }
}
