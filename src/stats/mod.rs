//! StatsCore
//! Mission: the canonical path for all engagement mutations and reads
//! (spec section 4.3).

pub mod keys;
pub mod model;

use crate::durable::DurableStore;
use crate::hotstore::{field_as_i64, HotStore, HotStoreResult};
use model::{ActionFlags, ActionKind, CommentStats, PostStats, TargetKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const LIKE_FIELD: &str = "like_count";
const DISLIKE_FIELD: &str = "dislike_count";
const FAVORITE_FIELD: &str = "favorite_count";
const VIEW_FIELD: &str = "view_count";

fn counter_field(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Like => LIKE_FIELD,
        ActionKind::Dislike => DISLIKE_FIELD,
        ActionKind::Favorite => FAVORITE_FIELD,
    }
}

pub struct StatsCore {
    hot: Arc<dyn HotStore>,
    durable: DurableStore,
    hot_ttl: Duration,
}

impl StatsCore {
    pub fn new(hot: Arc<dyn HotStore>, durable: DurableStore, hot_ttl: Duration) -> Self {
        Self {
            hot,
            durable,
            hot_ttl,
        }
    }

    /// Toggles `kind` for (user, post), applying the like/dislike
    /// mutual-exclusion rule, and returns the resulting counters.
    pub async fn toggle_post_action(
        &self,
        user_id: i64,
        post_id: i64,
        kind: ActionKind,
        token: &CancellationToken,
    ) -> HotStoreResult<PostStats> {
        let stats_key = keys::post_stats_key(post_id);
        let action_key = keys::post_action_key(user_id, post_id);
        let field = counter_field(kind);

        let is_set = self.hot.hget(&action_key, field, token).await? == "1";

        if is_set {
            self.hot.hdel(&action_key, &[field], token).await?;
            self.hot.hincrby(&stats_key, field, -1, token).await?;
            let _ = self
                .durable
                .post_actions()
                .clear(user_id, post_id, kind.as_str())
                .await;
        } else {
            if let Some(opposite) = kind.opposite() {
                let opp_field = counter_field(opposite);
                if self.hot.hget(&action_key, opp_field, token).await? == "1" {
                    self.hot.hdel(&action_key, &[opp_field], token).await?;
                    self.hot.hincrby(&stats_key, opp_field, -1, token).await?;
                    let _ = self
                        .durable
                        .post_actions()
                        .clear(user_id, post_id, opposite.as_str())
                        .await;
                }
            }
            self.hot.hset(&action_key, field, "1", token).await?;
            self.hot.hincrby(&stats_key, field, 1, token).await?;
            let _ = self
                .durable
                .post_actions()
                .set(user_id, post_id, kind.as_str())
                .await;
        }

        self.mark_dirty(TargetKind::Post, post_id, token).await?;
        self.get_post_stats(post_id, None, token).await.map(|(s, _)| s)
    }

    /// Same shape as `toggle_post_action`, restricted to Like/Dislike.
    pub async fn toggle_comment_action(
        &self,
        user_id: i64,
        comment_id: i64,
        kind: ActionKind,
        token: &CancellationToken,
    ) -> HotStoreResult<CommentStats> {
        debug_assert!(matches!(kind, ActionKind::Like | ActionKind::Dislike));

        let stats_key = keys::comment_stats_key(comment_id);
        let action_key = keys::comment_action_key(user_id, comment_id);
        let field = counter_field(kind);

        let is_set = self.hot.hget(&action_key, field, token).await? == "1";

        if is_set {
            self.hot.hdel(&action_key, &[field], token).await?;
            self.hot.hincrby(&stats_key, field, -1, token).await?;
            let _ = self
                .durable
                .comment_actions()
                .clear(user_id, comment_id, kind.as_str())
                .await;
        } else {
            if let Some(opposite) = kind.opposite() {
                let opp_field = counter_field(opposite);
                if self.hot.hget(&action_key, opp_field, token).await? == "1" {
                    self.hot.hdel(&action_key, &[opp_field], token).await?;
                    self.hot.hincrby(&stats_key, opp_field, -1, token).await?;
                    let _ = self
                        .durable
                        .comment_actions()
                        .clear(user_id, comment_id, opposite.as_str())
                        .await;
                }
            }
            self.hot.hset(&action_key, field, "1", token).await?;
            self.hot.hincrby(&stats_key, field, 1, token).await?;
            let _ = self
                .durable
                .comment_actions()
                .set(user_id, comment_id, kind.as_str())
                .await;
        }

        self.mark_dirty(TargetKind::Comment, comment_id, token).await?;
        self.get_comment_stats(comment_id, None, token)
            .await
            .map(|(s, _)| s)
    }

    /// Unconditionally increments `view_count` and marks the post dirty.
    /// No per-user dedup — rate-limiting, if any, happens above this layer.
    pub async fn increment_post_view(
        &self,
        post_id: i64,
        token: &CancellationToken,
    ) -> HotStoreResult<i64> {
        let stats_key = keys::post_stats_key(post_id);
        let count = self.hot.hincrby(&stats_key, VIEW_FIELD, 1, token).await?;
        self.mark_dirty(TargetKind::Post, post_id, token).await?;
        Ok(count)
    }

    /// Hydrates from HotStore; on cold miss, reads durable counters and
    /// writes them through with the configured TTL.
    pub async fn get_post_stats(
        &self,
        post_id: i64,
        user_id: Option<i64>,
        token: &CancellationToken,
    ) -> HotStoreResult<(PostStats, ActionFlags)> {
        let stats_key = keys::post_stats_key(post_id);
        let mut fields = self.hot.hgetall(&stats_key, token).await?;

        if fields.is_empty() {
            if let Ok(Some(counters)) = self.durable.posts().get_counters(post_id).await {
                fields = HashMap::from([
                    (LIKE_FIELD.to_string(), counters.like_count.to_string()),
                    (DISLIKE_FIELD.to_string(), counters.dislike_count.to_string()),
                    (FAVORITE_FIELD.to_string(), counters.favorite_count.to_string()),
                    (VIEW_FIELD.to_string(), counters.view_count.to_string()),
                ]);
                // Best-effort write-through; a failure here just means the
                // next call re-hydrates from durable again.
                let _ = self.hot.hmset(&stats_key, &fields, token).await;
                let _ = self.hot.expire(&stats_key, self.hot_ttl, token).await;
            }
        }

        let stats = PostStats {
            like_count: fields.get(LIKE_FIELD).map(|v| field_as_i64(v)).unwrap_or(0),
            dislike_count: fields
                .get(DISLIKE_FIELD)
                .map(|v| field_as_i64(v))
                .unwrap_or(0),
            favorite_count: fields
                .get(FAVORITE_FIELD)
                .map(|v| field_as_i64(v))
                .unwrap_or(0),
            view_count: fields.get(VIEW_FIELD).map(|v| field_as_i64(v)).unwrap_or(0),
        };

        let flags = match user_id {
            Some(uid) => self.get_post_action_flags(uid, post_id, token).await?,
            None => ActionFlags::default(),
        };

        Ok((stats, flags))
    }

    async fn get_post_action_flags(
        &self,
        user_id: i64,
        post_id: i64,
        token: &CancellationToken,
    ) -> HotStoreResult<ActionFlags> {
        let action_key = keys::post_action_key(user_id, post_id);
        let fields = self.hot.hgetall(&action_key, token).await?;
        Ok(ActionFlags {
            liked: fields.get(LIKE_FIELD).map(|v| v == "1").unwrap_or(false),
            disliked: fields.get(DISLIKE_FIELD).map(|v| v == "1").unwrap_or(false),
            favorited: fields.get(FAVORITE_FIELD).map(|v| v == "1").unwrap_or(false),
        })
    }

    pub async fn get_comment_stats(
        &self,
        comment_id: i64,
        user_id: Option<i64>,
        token: &CancellationToken,
    ) -> HotStoreResult<(CommentStats, ActionFlags)> {
        let stats_key = keys::comment_stats_key(comment_id);
        let mut fields = self.hot.hgetall(&stats_key, token).await?;

        if fields.is_empty() {
            if let Ok(Some(counters)) = self.durable.comments().get_counters(comment_id).await {
                fields = HashMap::from([
                    (LIKE_FIELD.to_string(), counters.like_count.to_string()),
                    (DISLIKE_FIELD.to_string(), counters.dislike_count.to_string()),
                ]);
                let _ = self.hot.hmset(&stats_key, &fields, token).await;
                let _ = self.hot.expire(&stats_key, self.hot_ttl, token).await;
            }
        }

        let stats = CommentStats {
            like_count: fields.get(LIKE_FIELD).map(|v| field_as_i64(v)).unwrap_or(0),
            dislike_count: fields
                .get(DISLIKE_FIELD)
                .map(|v| field_as_i64(v))
                .unwrap_or(0),
        };

        let flags = match user_id {
            Some(uid) => {
                let action_key = keys::comment_action_key(uid, comment_id);
                let af = self.hot.hgetall(&action_key, token).await?;
                ActionFlags {
                    liked: af.get(LIKE_FIELD).map(|v| v == "1").unwrap_or(false),
                    disliked: af.get(DISLIKE_FIELD).map(|v| v == "1").unwrap_or(false),
                    favorited: false,
                }
            }
            None => ActionFlags::default(),
        };

        Ok((stats, flags))
    }

    /// Pipelines per-post lookups, preserving caller-supplied order.
    pub async fn batch_get_post_stats(
        &self,
        post_ids: &[i64],
        user_id: Option<i64>,
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<(i64, PostStats, ActionFlags)>> {
        let mut out = Vec::with_capacity(post_ids.len());
        for &id in post_ids {
            let (stats, flags) = self.get_post_stats(id, user_id, token).await?;
            out.push((id, stats, flags));
        }
        Ok(out)
    }

    pub async fn mark_dirty(
        &self,
        kind: TargetKind,
        id: i64,
        token: &CancellationToken,
    ) -> HotStoreResult<()> {
        let set_key = kind.dirty_set_key();
        self.hot.sadd(set_key, &[&id.to_string()], token).await?;
        Ok(())
    }

    /// Returns up to `batch` dirty identifiers without removing them;
    /// removal is the persister's responsibility after a durable write.
    pub async fn drain_dirty(
        &self,
        kind: TargetKind,
        batch: usize,
        token: &CancellationToken,
    ) -> HotStoreResult<Vec<i64>> {
        let set_key = kind.dirty_set_key();
        let members = self.hot.smembers(set_key, token).await?;
        Ok(members
            .into_iter()
            .take(batch)
            .filter_map(|m| m.parse().ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotstore::InMemoryHotStore;
    use std::time::Duration;

    fn core() -> StatsCore {
        let hot: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
        let durable = DurableStore::open_in_memory().expect("open in-memory durable store");
        StatsCore::new(hot, durable, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn liking_then_disliking_clears_the_prior_like() {
        let core = core();
        let token = CancellationToken::new();

        let stats = core
            .toggle_post_action(1, 100, ActionKind::Like, &token)
            .await
            .unwrap();
        assert_eq!(stats.like_count, 1);
        assert_eq!(stats.dislike_count, 0);

        let stats = core
            .toggle_post_action(1, 100, ActionKind::Dislike, &token)
            .await
            .unwrap();
        assert_eq!(stats.like_count, 0);
        assert_eq!(stats.dislike_count, 1);
    }

    #[tokio::test]
    async fn toggling_the_same_action_twice_clears_it() {
        let core = core();
        let token = CancellationToken::new();

        core.toggle_post_action(1, 100, ActionKind::Favorite, &token)
            .await
            .unwrap();
        let stats = core
            .toggle_post_action(1, 100, ActionKind::Favorite, &token)
            .await
            .unwrap();
        assert_eq!(stats.favorite_count, 0);
    }

    #[tokio::test]
    async fn view_increments_are_unconditional_and_mark_dirty() {
        let core = core();
        let token = CancellationToken::new();

        core.increment_post_view(7, &token).await.unwrap();
        core.increment_post_view(7, &token).await.unwrap();
        let (stats, _) = core.get_post_stats(7, None, &token).await.unwrap();
        assert_eq!(stats.view_count, 2);

        let dirty = core.drain_dirty(TargetKind::Post, 10, &token).await.unwrap();
        assert!(dirty.contains(&7));
    }

    #[tokio::test]
    async fn cold_miss_hydrates_from_durable_and_writes_through() {
        let core = core();
        let token = CancellationToken::new();

        let row = core.durable.posts().create(1, 1, "t", "c").await.unwrap();
        core.durable
            .posts()
            .update_counters(
                row.id,
                crate::durable::posts::PostCounters {
                    like_count: 5,
                    dislike_count: 1,
                    favorite_count: 2,
                    view_count: 40,
                },
            )
            .await
            .unwrap();

        let (stats, _) = core.get_post_stats(row.id, None, &token).await.unwrap();
        assert_eq!(stats.like_count, 5);
        assert_eq!(stats.view_count, 40);

        // Second read must now come from the hot store, not durable.
        let hot_fields = core
            .hot
            .hgetall(&keys::post_stats_key(row.id), &token)
            .await
            .unwrap();
        assert_eq!(hot_fields.get(LIKE_FIELD).map(String::as_str), Some("5"));
    }

    #[tokio::test]
    async fn batch_get_preserves_caller_order() {
        let core = core();
        let token = CancellationToken::new();

        core.increment_post_view(3, &token).await.unwrap();
        core.increment_post_view(1, &token).await.unwrap();
        core.increment_post_view(2, &token).await.unwrap();

        let results = core
            .batch_get_post_stats(&[3, 1, 2], None, &token)
            .await
            .unwrap();
        let ids: Vec<i64> = results.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
