use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use cronwatch_core::{CronwatchError, EntryId, JobSnapshot, StatusCode};
use tracing::debug;

use crate::context::Context;
use crate::interceptor::Chain;
use crate::metadata::{with_job_metadata, JobMetadata};
use crate::sink::{ErrorSink, TracingSink};
use crate::sync::lock;
use crate::task::Task;

/// Outcome of the most recent run.
#[derive(Debug, Default)]
struct RunRecord {
    latency: Duration,
    last_error: String,
    prev_run: Option<DateTime<Utc>>,
}

/// One registration of user logic against a schedule.
///
/// Fields are written only by [`Job::run`] while it holds the run lock.
/// Readers take no run lock, so a listing may mix fields from two runs.
pub struct Job {
    name: String,
    spec: String,
    entry_id: OnceLock<EntryId>,
    status: AtomicU8,
    record: Mutex<RunRecord>,
    inner: Arc<dyn Task>,
    chain: Arc<Chain>,
    sink: Arc<dyn ErrorSink>,
    run_lock: tokio::sync::Mutex<()>,
}

impl Job {
    pub fn new(
        name: impl Into<String>,
        spec: impl Into<String>,
        inner: Arc<dyn Task>,
        chain: Arc<Chain>,
    ) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
            entry_id: OnceLock::new(),
            status: AtomicU8::new(StatusCode::Up.as_u8()),
            record: Mutex::new(RunRecord::default()),
            inner,
            chain,
            sink: Arc::new(TracingSink),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Record the id assigned by the trigger engine. Only the first call takes effect.
    pub(crate) fn bind_entry(&self, id: EntryId) {
        let _ = self.entry_id.set(id);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Id from the trigger engine; `EntryId(0)` before registration completes.
    pub fn entry_id(&self) -> EntryId {
        self.entry_id.get().copied().unwrap_or_default()
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn latency(&self) -> Duration {
        lock(&self.record).latency
    }

    pub fn last_error(&self) -> String {
        lock(&self.record).last_error.clone()
    }

    pub fn prev_run(&self) -> Option<DateTime<Utc>> {
        lock(&self.record).prev_run
    }

    pub fn metadata(&self) -> JobMetadata {
        JobMetadata {
            name: self.name.clone(),
            entry_id: self.entry_id(),
            spec: self.spec.clone(),
        }
    }

    /// Copy of the current fields. `next_run` is left for the controller to fill.
    pub fn snapshot(&self) -> JobSnapshot {
        let record = lock(&self.record);
        JobSnapshot {
            entry_id: self.entry_id(),
            name: self.name.clone(),
            spec: self.spec.clone(),
            status: self.status(),
            latency: record.latency,
            error: record.last_error.clone(),
            prev_run: record.prev_run,
            next_run: None,
        }
    }

    pub(crate) fn mark_down(&self) {
        self.set_status(StatusCode::Down);
    }

    fn set_status(&self, status: StatusCode) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Execute one firing through the interceptor chain.
    ///
    /// Overlapping firings of the same job queue on the run lock rather than
    /// being dropped. Failures are recorded on the job and reported to the
    /// error sink; nothing is returned to the trigger engine.
    pub async fn run(&self, ctx: Context) {
        let _running = self.run_lock.lock().await;
        self.set_status(StatusCode::Running);
        let started = Instant::now();
        let mut guard = RunGuard { job: self, started, finished: false };
        lock(&self.record).prev_run = Some(Utc::now());

        let ctx = with_job_metadata(&ctx, self.metadata());
        let outcome = self.chain.run(ctx, self).await;
        let latency = started.elapsed();

        match outcome {
            Ok(()) => {
                {
                    let mut record = lock(&self.record);
                    record.last_error.clear();
                    record.latency = latency;
                }
                self.set_status(StatusCode::Idle);
                debug!(entry_id = %self.entry_id(), name = %self.name, latency_ms = latency.as_millis() as u64, "job run succeeded");
            }
            Err(err) => {
                let message = format!("{err:#}");
                {
                    let mut record = lock(&self.record);
                    record.last_error = message.clone();
                    record.latency = latency;
                }
                self.set_status(StatusCode::Error);
                self.report_failure(err, message);
            }
        }
        guard.finished = true;
    }

    /// Terminal step of the chain: the user logic itself.
    pub(crate) async fn invoke(&self, ctx: Context) -> anyhow::Result<()> {
        self.inner.run(ctx).await
    }

    fn report_failure(&self, err: anyhow::Error, message: String) {
        let report = match err.downcast::<CronwatchError>() {
            Ok(recovered @ CronwatchError::PanicRecovered { .. }) => recovered,
            _ => CronwatchError::JobExecution {
                name: self.name.clone(),
                message,
            },
        };
        self.sink.report("run", &report);
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("entry_id", &self.entry_id())
            .field("status", &self.status())
            .finish()
    }
}

/// Marks a run that never reached its outcome (panic without a `Recover`
/// interceptor, or the future was dropped) as failed instead of leaving it
/// `Running` forever.
struct RunGuard<'a> {
    job: &'a Job,
    started: Instant,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            {
                let mut record = lock(&self.job.record);
                record.last_error = "run aborted before completion".to_string();
                record.latency = self.started.elapsed();
            }
            self.job.set_status(StatusCode::Error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::job_metadata;
    use crate::task::func;
    use std::sync::atomic::AtomicBool;

    fn job_from(task: impl Task + 'static) -> Arc<Job> {
        Arc::new(Job::new("Sampler", "@every 1s", Arc::new(task), Arc::new(Chain::default())))
    }

    #[tokio::test]
    async fn fresh_job_is_up() {
        let job = job_from(func(|_| async { anyhow::Ok(()) }));
        assert_eq!(job.status(), StatusCode::Up);
        assert_eq!(job.entry_id(), EntryId(0));
        assert!(job.prev_run().is_none());
    }

    #[tokio::test]
    async fn failure_then_success_clears_error() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = fail.clone();
        let job = job_from(func(move |_| {
            let fail = flag.load(Ordering::SeqCst);
            async move {
                if fail {
                    anyhow::bail!("upstream unavailable");
                }
                anyhow::Ok(())
            }
        }));

        job.run(Context::new()).await;
        assert_eq!(job.status(), StatusCode::Error);
        assert_eq!(job.last_error(), "upstream unavailable");
        assert!(job.prev_run().is_some());

        fail.store(false, Ordering::SeqCst);
        job.run(Context::new()).await;
        assert_eq!(job.status(), StatusCode::Idle);
        assert!(job.last_error().is_empty());
    }

    #[tokio::test]
    async fn latency_is_recorded() {
        let job = job_from(func(|_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            anyhow::Ok(())
        }));
        job.run(Context::new()).await;
        assert!(job.latency() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn body_sees_its_own_metadata() {
        let job = job_from(func(|ctx: Context| async move {
            let md = job_metadata(&ctx).ok_or_else(|| anyhow::anyhow!("missing metadata"))?;
            anyhow::ensure!(md.name == "Sampler" && md.entry_id == EntryId(9));
            anyhow::Ok(())
        }));
        job.bind_entry(EntryId(9));
        job.run(Context::new()).await;
        assert_eq!(job.status(), StatusCode::Idle, "{}", job.last_error());
    }

    #[tokio::test]
    async fn unrecovered_panic_still_releases_run_lock() {
        let panicking = Arc::new(AtomicBool::new(true));
        let flag = panicking.clone();
        let job = job_from(func(move |_| {
            let panic_now = flag.load(Ordering::SeqCst);
            async move {
                if panic_now {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    panic!("job exploded");
                }
                anyhow::Ok(())
            }
        }));

        let runner = job.clone();
        let joined = tokio::spawn(async move { runner.run(Context::new()).await }).await;
        assert!(joined.is_err(), "panic should surface on the task");
        assert_eq!(job.status(), StatusCode::Error);
        assert_eq!(job.last_error(), "run aborted before completion");
        assert!(job.latency() >= Duration::from_millis(20));

        panicking.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(1), job.run(Context::new()))
            .await
            .expect("run lock was not released");
        assert_eq!(job.status(), StatusCode::Idle);
    }
}
