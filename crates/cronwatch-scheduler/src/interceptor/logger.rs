use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{request_id, Interceptor, Next};
use crate::context::Context;
use crate::job::Job;

/// Logs the start and outcome of every run with its latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logger;

#[async_trait]
impl Interceptor for Logger {
    async fn intercept(&self, ctx: Context, job: &Job, next: Next<'_>) -> anyhow::Result<()> {
        let request_id = request_id(&ctx).unwrap_or("-").to_string();
        let entry_id = job.entry_id();
        debug!(%entry_id, name = %job.name(), spec = %job.spec(), %request_id, "job started");

        let t = Instant::now();
        let result = next.run(ctx).await;
        let latency_ms = t.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => info!(%entry_id, name = %job.name(), %request_id, latency_ms, "job finished"),
            Err(e) => warn!(%entry_id, name = %job.name(), %request_id, latency_ms, error = %e, "job failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::Chain;
    use crate::task::func;
    use cronwatch_core::StatusCode;
    use std::sync::Arc;

    #[tokio::test]
    async fn passes_results_through_untouched() {
        let chain = Arc::new(Chain::builder().with(Logger).build());
        let ok = Job::new("Ok", "@daily", Arc::new(func(|_| async { anyhow::Ok(()) })), chain.clone());
        let failing = Job::new(
            "Failing",
            "@daily",
            Arc::new(func(|_| async { Err::<(), _>(anyhow::anyhow!("disk full")) })),
            chain,
        );

        ok.run(Context::new()).await;
        failing.run(Context::new()).await;

        assert_eq!(ok.status(), StatusCode::Idle);
        assert_eq!(failing.status(), StatusCode::Error);
        assert_eq!(failing.last_error(), "disk full");
    }
}
