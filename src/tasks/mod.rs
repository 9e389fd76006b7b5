//! TaskRuntime
//! Mission: receive task submissions, schedule recurring jobs, dispatch
//! handlers with bounded concurrency across three weighted priority
//! queues (spec section 4.6).

pub mod model;
pub mod schedule;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use model::{EnqueueOptions, HandlerRef, Priority, Task};
use schedule::ScheduleSpec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const QUEUE_CAPACITY: usize = 4096;

struct ScheduledJob {
    spec: ScheduleSpec,
    task_type: String,
    payload: String,
    priority: Priority,
    /// Absolute instant this job is next due. `next_after` only ever
    /// reports a delay relative to the `now` it's given, so the loop
    /// must anchor each job's due time itself rather than re-deriving
    /// "delay until next fire" from the current instant every pass —
    /// otherwise an `@every` schedule's delay never decays toward zero.
    next_due: DateTime<Utc>,
}

pub struct TaskRuntime {
    senders: HashMap<Priority, mpsc::Sender<Task>>,
    receivers: Mutex<Option<HashMap<Priority, mpsc::Receiver<Task>>>>,
    handlers: Arc<RwLock<HashMap<String, HandlerRef>>>,
    schedules: Mutex<Vec<ScheduledJob>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    token: CancellationToken,
    concurrency: usize,
}

impl TaskRuntime {
    pub fn new(concurrency: usize) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for priority in [Priority::Critical, Priority::Default, Priority::Low] {
            let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
            senders.insert(priority, tx);
            receivers.insert(priority, rx);
        }

        Self {
            senders,
            receivers: Mutex::new(Some(receivers)),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            schedules: Mutex::new(Vec::new()),
            workers: Mutex::new(Vec::new()),
            token: CancellationToken::new(),
            concurrency,
        }
    }

    pub async fn register_handler(&self, task_type: &str, handler: HandlerRef) {
        self.handlers.write().await.insert(task_type.to_string(), handler);
    }

    pub async fn register_schedule(
        &self,
        spec: &str,
        task_type: &str,
        payload: &str,
        priority: Priority,
    ) -> anyhow::Result<()> {
        let spec = ScheduleSpec::parse(spec)?;
        let now = Utc::now();
        let next_due = spec
            .next_after(now)
            .and_then(|d| ChronoDuration::from_std(d).ok())
            .map(|d| now + d)
            .unwrap_or(now);
        self.schedules.lock().await.push(ScheduledJob {
            spec,
            task_type: task_type.to_string(),
            payload: payload.to_string(),
            priority,
            next_due,
        });
        Ok(())
    }

    pub async fn enqueue(&self, task_type: &str, payload: &str, options: EnqueueOptions) -> anyhow::Result<()> {
        let task = Task {
            task_type: task_type.to_string(),
            payload: payload.to_string(),
            priority: options.priority,
        };
        self.senders
            .get(&options.priority)
            .expect("all priorities have a sender")
            .send(task)
            .await
            .map_err(|_| anyhow::anyhow!("task queue closed"))
    }

    /// Starts the dispatch loop and the scheduler loop. Non-blocking:
    /// returns once the runtime is accepting tasks.
    pub async fn start(self: &Arc<Self>) {
        let receivers = self
            .receivers
            .lock()
            .await
            .take()
            .expect("start called at most once");

        // A single weighted-round-robin dispatcher pulls from all three
        // queues and spawns a bounded pool of handler tasks.
        let this = self.clone();
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.concurrency.max(1)));
        let dispatcher = tokio::spawn(async move {
            this.dispatch_loop(receivers, semaphore).await;
        });
        self.workers.lock().await.push(dispatcher);

        let this = self.clone();
        let scheduler = tokio::spawn(async move {
            this.scheduler_loop().await;
        });
        self.workers.lock().await.push(scheduler);
    }

    async fn dispatch_loop(
        self: Arc<Self>,
        mut receivers: HashMap<Priority, mpsc::Receiver<Task>>,
        semaphore: Arc<tokio::sync::Semaphore>,
    ) {
        let order = [Priority::Critical, Priority::Default, Priority::Low];
        let mut credits: HashMap<Priority, u32> = order.iter().map(|p| (*p, 0)).collect();

        loop {
            if self.token.is_cancelled() {
                return;
            }

            let mut dispatched_any = false;
            for &priority in &order {
                let credit = credits.entry(priority).or_insert(0);
                if *credit == 0 {
                    *credit = priority.weight();
                }
            }

            for &priority in &order {
                if self.token.is_cancelled() {
                    return;
                }
                let credit = credits.get_mut(&priority).unwrap();
                if *credit == 0 {
                    continue;
                }
                let Some(rx) = receivers.get_mut(&priority) else {
                    continue;
                };
                match rx.try_recv() {
                    Ok(task) => {
                        *credit -= 1;
                        dispatched_any = true;
                        self.spawn_handler(task, semaphore.clone()).await;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => {}
                    Err(mpsc::error::TryRecvError::Disconnected) => {}
                }
            }

            if !dispatched_any {
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
                    _ = self.token.cancelled() => return,
                }
            }
        }
    }

    async fn spawn_handler(&self, task: Task, semaphore: Arc<tokio::sync::Semaphore>) {
        let handlers = self.handlers.clone();
        let Ok(permit) = semaphore.acquire_owned().await else {
            return;
        };
        tokio::spawn(async move {
            let _permit = permit;
            let handler = handlers.read().await.get(&task.task_type).cloned();
            match handler {
                Some(handler) => {
                    if let Err(e) = handler.handle(&task.payload).await {
                        error!(task_type = %task.task_type, error = %e, "task handler failed");
                    }
                }
                None => warn!(task_type = %task.task_type, "no handler registered, dropping task"),
            }
        });
    }

    async fn scheduler_loop(self: Arc<Self>) {
        loop {
            if self.token.is_cancelled() {
                return;
            }
            let now = Utc::now();
            let mut sleep_for = std::time::Duration::from_secs(60);
            let due_threshold = std::time::Duration::from_millis(250);

            for job in self.schedules.lock().await.iter_mut() {
                let delay = (job.next_due - now).to_std().unwrap_or(std::time::Duration::ZERO);
                if delay < sleep_for {
                    sleep_for = delay;
                }
                if delay <= due_threshold {
                    let _ = self
                        .enqueue(&job.task_type, &job.payload, EnqueueOptions { priority: job.priority })
                        .await;
                    if let Some(next) = job
                        .spec
                        .next_after(now)
                        .and_then(|d| ChronoDuration::from_std(d).ok())
                    {
                        job.next_due = now + next;
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(sleep_for.max(std::time::Duration::from_millis(250))) => {}
                _ = self.token.cancelled() => return,
            }
        }
    }

    /// Signals shutdown and waits for in-flight dispatch/scheduler loops
    /// to drain.
    pub async fn stop(&self) {
        self.token.cancel();
        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            let _ = handle.await;
        }
        info!("task runtime stopped");
    }
}
