//! Exercises StatsCore and Persister wired together against a real
//! SQLite file, the way they're actually assembled in main.rs.

use pokeforum_core::durable::DurableStore;
use pokeforum_core::hotstore::{HotStore, InMemoryHotStore};
use pokeforum_core::persister::Persister;
use pokeforum_core::stats::model::{ActionKind, TargetKind};
use pokeforum_core::stats::StatsCore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn open_store() -> (tempfile::TempDir, DurableStore) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pokeforum.db");
    let durable = DurableStore::open(db_path.to_str().unwrap()).unwrap();
    (dir, durable)
}

#[tokio::test]
async fn likes_and_views_converge_to_the_durable_row_through_the_persister() {
    let (_dir, durable) = open_store();
    let hot: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
    let stats = StatsCore::new(hot.clone(), durable.clone(), Duration::from_secs(3600));
    let persister = Persister::new(hot.clone(), durable.clone(), Duration::from_secs(30), 500);
    let token = CancellationToken::new();

    let user = durable
        .users()
        .create("carol", "carol@x.com", "h", pokeforum_core::durable::users::UserRole::User)
        .await
        .unwrap();
    let post = durable.posts().create(user.id, 1, "title", "body").await.unwrap();

    stats
        .toggle_post_action(user.id, post.id, ActionKind::Like, &token)
        .await
        .unwrap();
    stats.increment_post_view(post.id, &token).await.unwrap();
    stats.increment_post_view(post.id, &token).await.unwrap();

    // Nothing reaches the row until the persister drains the dirty set.
    let counters = durable.posts().get_counters(post.id).await.unwrap().unwrap();
    assert_eq!(counters.like_count, 0);
    assert_eq!(counters.view_count, 0);

    persister.run_once(&token).await;

    let counters = durable.posts().get_counters(post.id).await.unwrap().unwrap();
    assert_eq!(counters.like_count, 1);
    assert_eq!(counters.view_count, 2);

    let dirty = stats.drain_dirty(TargetKind::Post, 10, &token).await.unwrap();
    assert!(dirty.is_empty(), "persisted ids must be cleared from the dirty set");
}

#[tokio::test]
async fn batch_size_caps_a_single_drain_cycle_leaving_the_remainder_for_next_time() {
    let (_dir, durable) = open_store();
    let hot: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
    let stats = StatsCore::new(hot.clone(), durable.clone(), Duration::from_secs(3600));
    // Batch size of 2 over 5 dirty posts: one cycle can only fully
    // persist 2 of them.
    let persister = Persister::new(hot.clone(), durable.clone(), Duration::from_secs(30), 2);
    let token = CancellationToken::new();

    let user = durable
        .users()
        .create("dave", "dave@x.com", "h", pokeforum_core::durable::users::UserRole::User)
        .await
        .unwrap();

    let mut post_ids = Vec::new();
    for i in 0..5 {
        let post = durable
            .posts()
            .create(user.id, 1, &format!("t{i}"), "c")
            .await
            .unwrap();
        stats.increment_post_view(post.id, &token).await.unwrap();
        post_ids.push(post.id);
    }

    persister.run_once(&token).await;

    let persisted: usize = count_persisted(&durable, &post_ids).await;
    assert_eq!(persisted, 2, "only batch_size posts should be written through in one cycle");

    let still_dirty = stats.drain_dirty(TargetKind::Post, 10, &token).await.unwrap();
    assert_eq!(still_dirty.len(), 3);

    // A second cycle catches up on the remainder.
    persister.run_once(&token).await;
    persister.run_once(&token).await;
    persister.run_once(&token).await;
    let persisted: usize = count_persisted(&durable, &post_ids).await;
    assert_eq!(persisted, 5);
}

async fn count_persisted(durable: &DurableStore, post_ids: &[i64]) -> usize {
    let mut n = 0;
    for &id in post_ids {
        if durable.posts().get_counters(id).await.unwrap().unwrap().view_count > 0 {
            n += 1;
        }
    }
    n
}

#[tokio::test]
async fn comment_likes_persist_independently_of_post_likes() {
    let (_dir, durable) = open_store();
    let hot: Arc<dyn HotStore> = Arc::new(InMemoryHotStore::new());
    let stats = StatsCore::new(hot.clone(), durable.clone(), Duration::from_secs(3600));
    let persister = Persister::new(hot.clone(), durable.clone(), Duration::from_secs(30), 500);
    let token = CancellationToken::new();

    let user = durable
        .users()
        .create("erin", "erin@x.com", "h", pokeforum_core::durable::users::UserRole::User)
        .await
        .unwrap();
    let post = durable.posts().create(user.id, 1, "t", "c").await.unwrap();
    let comment = durable.comments().create(user.id, post.id, None, "nice post").await.unwrap();

    stats
        .toggle_comment_action(user.id, comment.id, ActionKind::Dislike, &token)
        .await
        .unwrap();

    persister.run_once(&token).await;

    let post_counters = durable.posts().get_counters(post.id).await.unwrap().unwrap();
    let comment_counters = durable.comments().get_counters(comment.id).await.unwrap().unwrap();
    assert_eq!(post_counters.like_count, 0);
    assert_eq!(comment_counters.like_count, 0);
    assert_eq!(comment_counters.dislike_count, 1);
}
