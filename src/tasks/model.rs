//! Task runtime domain types (spec section 4.6).

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Critical,
    Default,
    Low,
}

impl Priority {
    /// Dispatch weight for the 6:3:1 weighted round robin.
    pub fn weight(&self) -> u32 {
        match self {
            Priority::Critical => 6,
            Priority::Default => 3,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub task_type: String,
    pub payload: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    pub priority: Priority,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Default
    }
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, payload: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> TaskHandler for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, payload: &str) -> anyhow::Result<()> {
        (self)(payload.to_string()).await
    }
}

pub type HandlerRef = Arc<dyn TaskHandler>;
