//! Composable wrappers around job execution.
//!
//! A [`Chain`] is an ordered list of [`Interceptor`]s built once per
//! controller. The first interceptor runs outermost: given `[A, B]` a run
//! observes `A-pre, B-pre, body, B-post, A-post`. An interceptor can
//!
//! - short-circuit by returning without calling [`Next::run`],
//! - hand a derived [`Context`] to `next`, visible only downstream,
//! - inspect the [`Job`] being run (name, entry id, spec).

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::job::Job;

mod logger;
mod recover;
mod request_id;
mod worker_pool;

pub use logger::Logger;
pub use recover::Recover;
pub use request_id::{request_id, AssignRequestId, RequestId};
pub use worker_pool::WorkerPool;

#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, ctx: Context, job: &Job, next: Next<'_>) -> anyhow::Result<()>;
}

/// The remainder of the chain after the current interceptor.
pub struct Next<'a> {
    job: &'a Job,
    rest: &'a [Arc<dyn Interceptor>],
}

impl<'a> Next<'a> {
    /// Continue with the next interceptor, or the job body once the chain is exhausted.
    pub async fn run(self, ctx: Context) -> anyhow::Result<()> {
        match self.rest.split_first() {
            Some((head, rest)) => {
                let next = Next { job: self.job, rest };
                head.intercept(ctx, self.job, next).await
            }
            None => self.job.invoke(ctx).await,
        }
    }
}

/// Immutable, ordered interceptor list shared by every job of a controller.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub(crate) fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Run `job` through every interceptor and finally its own logic.
    pub async fn run(&self, ctx: Context, job: &Job) -> anyhow::Result<()> {
        Next {
            job,
            rest: &self.interceptors,
        }
        .run(ctx)
        .await
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

#[derive(Default)]
pub struct ChainBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ChainBuilder {
    /// Append an interceptor; it runs inside every interceptor added before it.
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Chain {
        Chain::new(self.interceptors)
    }
}
