use async_trait::async_trait;
use uuid::Uuid;

use super::{Interceptor, Next};
use crate::context::Context;
use crate::job::Job;

/// Correlation id for one run, carried in the [`Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

pub fn request_id(ctx: &Context) -> Option<&str> {
    ctx.value::<RequestId>().map(|id| id.0.as_str())
}

/// Gives every run a UUID v4 request id unless an upstream one is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssignRequestId;

#[async_trait]
impl Interceptor for AssignRequestId {
    async fn intercept(&self, ctx: Context, _job: &Job, next: Next<'_>) -> anyhow::Result<()> {
        if ctx.value::<RequestId>().is_some() {
            return next.run(ctx).await;
        }
        let ctx = ctx.with_value(RequestId(Uuid::new_v4().to_string()));
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::Chain;
    use crate::task::func;
    use cronwatch_core::StatusCode;
    use std::sync::{Arc, Mutex};

    fn capturing_job(seen: Arc<Mutex<Vec<String>>>) -> Job {
        Job::new(
            "Capture",
            "@hourly",
            Arc::new(func(move |ctx: Context| {
                let seen = seen.clone();
                async move {
                    let id = request_id(&ctx).ok_or_else(|| anyhow::anyhow!("no request id"))?;
                    seen.lock().unwrap().push(id.to_string());
                    anyhow::Ok(())
                }
            })),
            Arc::new(Chain::builder().with(AssignRequestId).build()),
        )
    }

    #[tokio::test]
    async fn each_run_gets_a_fresh_id() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let job = capturing_job(seen.clone());

        job.run(Context::new()).await;
        job.run(Context::new()).await;

        assert_eq!(job.status(), StatusCode::Idle);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
        assert!(Uuid::parse_str(&seen[0]).is_ok());
    }

    #[tokio::test]
    async fn upstream_id_is_kept() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let job = capturing_job(seen.clone());

        let ctx = Context::new().with_value(RequestId("req-42".to_string()));
        job.run(ctx).await;

        assert_eq!(*seen.lock().unwrap(), vec!["req-42".to_string()]);
    }
}
