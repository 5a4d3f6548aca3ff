use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{Interceptor, Next};
use crate::context::Context;
use crate::job::Job;

pub const DEFAULT_POOL_SIZE: usize = 1000;

/// Caps how many job bodies run at once across every job sharing the chain.
/// Runs beyond the cap wait for a free slot.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[async_trait]
impl Interceptor for WorkerPool {
    async fn intercept(&self, ctx: Context, job: &Job, next: Next<'_>) -> anyhow::Result<()> {
        let _permit = self.permits.acquire().await?;
        debug!(entry_id = %job.entry_id(), free = self.available(), "worker slot acquired");
        next.run(ctx).await
    }
}
