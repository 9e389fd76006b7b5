//! Exercises TaskRuntime's dispatch and scheduling loops end to end —
//! registering handlers, enqueuing across priorities, and firing an
//! `@every` schedule.

use pokeforum_core::tasks::model::{EnqueueOptions, Priority};
use pokeforum_core::tasks::TaskRuntime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[tokio::test]
async fn enqueued_tasks_across_priorities_all_reach_their_handler() {
    let runtime = Arc::new(TaskRuntime::new(4));
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = seen.clone();
    runtime
        .register_handler(
            "record",
            Arc::new(move |payload: String| {
                let seen = seen_clone.clone();
                async move {
                    seen.lock().await.push(payload);
                    Ok(())
                }
            }),
        )
        .await;

    runtime.start().await;

    runtime
        .enqueue("record", "critical-1", EnqueueOptions { priority: Priority::Critical })
        .await
        .unwrap();
    runtime
        .enqueue("record", "default-1", EnqueueOptions { priority: Priority::Default })
        .await
        .unwrap();
    runtime
        .enqueue("record", "low-1", EnqueueOptions { priority: Priority::Low })
        .await
        .unwrap();

    // Give the dispatch loop a few passes to drain all three queues.
    tokio::time::sleep(Duration::from_millis(200)).await;
    runtime.stop().await;

    let mut recorded = seen.lock().await.clone();
    recorded.sort();
    assert_eq!(recorded, vec!["critical-1", "default-1", "low-1"]);
}

#[tokio::test]
async fn an_unregistered_task_type_is_dropped_without_panicking() {
    let runtime = Arc::new(TaskRuntime::new(2));
    runtime.start().await;

    runtime
        .enqueue("no-such-handler", "payload", EnqueueOptions::default())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    runtime.stop().await;
}

#[tokio::test]
async fn an_every_schedule_fires_the_registered_task_on_its_own() {
    let runtime = Arc::new(TaskRuntime::new(2));
    let count = Arc::new(AtomicUsize::new(0));

    let count_clone = count.clone();
    runtime
        .register_handler(
            "tick",
            Arc::new(move |_payload: String| {
                let count = count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
        .await;

    runtime
        .register_schedule("@every 1s", "tick", "", Priority::Default)
        .await
        .unwrap();

    runtime.start().await;
    tokio::time::sleep(Duration::from_millis(2300)).await;
    runtime.stop().await;

    assert!(
        count.load(Ordering::SeqCst) >= 2,
        "a 1s schedule should fire at least twice within 2.3s, fired {}",
        count.load(Ordering::SeqCst)
    );
}
