use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use cronwatch_core::{
    Config, CronwatchError, EntryId, EntrySource, JobSnapshot, Location, Result,
};
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::interceptor::{Chain, Interceptor};
use crate::job::Job;
use crate::schedule::format_interval;
use crate::sink::{ErrorSink, TracingSink};
use crate::sync::{read, write};
use crate::task::{task_name, Task};
use crate::trigger::{Callback, CronTrigger, Trigger};

/// Entry id → job map plus the engine that fires them.
///
/// `trigger == None` is the uninitialized (or stopped) state.
struct Registry {
    trigger: Option<Arc<dyn Trigger>>,
    jobs: BTreeMap<EntryId, Arc<Job>>,
}

struct Shared {
    registry: RwLock<Registry>,
    chain: Arc<Chain>,
    sink: Arc<dyn ErrorSink>,
    location: Location,
    address: Option<String>,
    shutdown: CancellationToken,
}

impl Shared {
    fn entries(&self) -> Option<Vec<JobSnapshot>> {
        let registry = read(&self.registry);
        let trigger = registry.trigger.as_ref()?;
        let snapshots = registry
            .jobs
            .iter()
            .map(|(id, job)| {
                let mut snapshot = job.snapshot();
                snapshot.next_run = trigger.entry(*id).and_then(|t| t.next);
                snapshot
            })
            .collect();
        Some(snapshots)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let registry = self
            .registry
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(trigger) = registry.trigger.take() {
            trigger.stop();
        }
    }
}

/// Owns a trigger engine, one interceptor chain and the registry of jobs.
///
/// Cloning is cheap and every clone drives the same registry. Once
/// [`Controller::stop`] has run the controller is uninitialized: `schedule`
/// returns [`CronwatchError::Uninitialized`] and everything else is a no-op.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Shared>,
}

impl Controller {
    /// Controller with an empty chain, a [`CronTrigger`] and the tracing sink.
    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> ControllerBuilder {
        ControllerBuilder::new(config)
    }

    /// Register `task` on `spec`. The returned id keys the entry for
    /// [`remove`](Self::remove) and in listings.
    pub fn schedule<T: Task + 'static>(&self, spec: &str, task: T) -> Result<EntryId> {
        let name = task_name(&task);
        self.register("schedule", spec, name, Arc::new(task))
    }

    /// Register the same `task` once per `delimiter`-separated spec.
    ///
    /// Every valid fragment is registered even when an earlier one fails;
    /// the first failure is returned. Blank fragments are skipped.
    pub fn schedules<T: Task + 'static>(
        &self,
        specs: &str,
        delimiter: &str,
        task: T,
    ) -> Result<Vec<EntryId>> {
        let fragments: Vec<&str> = if delimiter.is_empty() {
            vec![specs]
        } else {
            specs.split(delimiter).collect()
        };
        let fragments: Vec<&str> = fragments
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if fragments.is_empty() {
            return Err(CronwatchError::invalid_schedule(specs, "no schedule in list"));
        }

        let name = task_name(&task);
        let inner: Arc<dyn Task> = Arc::new(task);
        let mut ids = Vec::with_capacity(fragments.len());
        let mut first_error = None;
        for spec in fragments {
            match self.register("schedules", spec, name.clone(), inner.clone()) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!(spec, error = %e, "skipping schedule fragment");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(ids),
        }
    }

    /// Run `task` every `every`, rounded down to whole seconds (minimum one).
    ///
    /// There is no error return: an uninitialized controller ignores the call
    /// and other failures go to the error sink.
    pub fn every<T: Task + 'static>(&self, every: Duration, task: T) -> Option<EntryId> {
        let every = Duration::from_secs(every.as_secs().max(1));
        let spec = format!("@every {}", format_interval(every));
        let name = task_name(&task);
        match self.register("every", &spec, name, Arc::new(task)) {
            Ok(id) => Some(id),
            Err(CronwatchError::Uninitialized { .. }) => {
                debug!("every ignored on uninitialized controller");
                None
            }
            Err(e) => {
                self.inner.sink.report("every", &e);
                None
            }
        }
    }

    /// Unregister `id` from the engine and the registry. Unknown ids are ignored.
    pub fn remove(&self, id: EntryId) {
        let mut registry = write(&self.inner.registry);
        let Some(trigger) = registry.trigger.clone() else {
            return;
        };
        trigger.remove(id);
        if let Some(job) = registry.jobs.remove(&id) {
            job.mark_down();
            info!(entry_id = %id, name = job.name(), "job removed");
        }
    }

    /// Point-in-time copy of every registered job, ordered by entry id.
    /// `None` when the controller is uninitialized.
    pub fn entries(&self) -> Option<Vec<JobSnapshot>> {
        self.inner.entries()
    }

    /// Fire nothing more and drop every registration.
    ///
    /// In-flight runs are not aborted; their contexts observe cancellation.
    pub fn stop(&self) {
        let (trigger, jobs) = {
            let mut registry = write(&self.inner.registry);
            let Some(trigger) = registry.trigger.take() else {
                return;
            };
            (trigger, std::mem::take(&mut registry.jobs))
        };
        trigger.stop();
        for job in jobs.values() {
            job.mark_down();
        }
        self.inner.shutdown.cancel();
        info!(jobs = jobs.len(), "controller stopped");
    }

    pub fn is_running(&self) -> bool {
        read(&self.inner.registry).trigger.is_some()
    }

    pub fn location(&self) -> Location {
        self.inner.location
    }

    /// Dashboard bind address, if one is configured.
    pub fn address(&self) -> Option<&str> {
        self.inner.address.as_deref()
    }

    pub fn chain(&self) -> &Chain {
        &self.inner.chain
    }

    fn register(
        &self,
        operation: &'static str,
        spec: &str,
        name: String,
        inner: Arc<dyn Task>,
    ) -> Result<EntryId> {
        let mut registry = write(&self.inner.registry);
        let Some(trigger) = registry.trigger.clone() else {
            return Err(CronwatchError::Uninitialized { operation });
        };

        let job = Arc::new(
            Job::new(name, spec, inner, self.inner.chain.clone())
                .with_sink(self.inner.sink.clone()),
        );
        let ctx = Context::with_cancellation(self.inner.shutdown.clone());
        let id = trigger.add(spec, fire_callback(Arc::downgrade(&job), ctx))?;
        job.bind_entry(id);
        info!(entry_id = %id, name = job.name(), spec, "job scheduled");
        registry.jobs.insert(id, job);
        Ok(id)
    }

    fn start_dashboard(&self, addr: String) {
        let Ok(runtime) = Handle::try_current() else {
            self.inner.sink.report(
                "dashboard",
                &CronwatchError::Dashboard(format!("no tokio runtime to serve {addr}")),
            );
            return;
        };
        let source: Arc<dyn EntrySource> = Arc::new(DashboardSource(Arc::downgrade(&self.inner)));
        let sink = self.inner.sink.clone();
        let shutdown = self.inner.shutdown.clone();
        runtime.spawn(async move {
            if let Err(e) = cronwatch_dashboard::serve(&addr, source, shutdown).await {
                sink.report("dashboard", &e);
            }
        });
    }
}

impl EntrySource for Controller {
    fn entries(&self) -> Option<Vec<JobSnapshot>> {
        self.inner.entries()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = read(&self.inner.registry);
        f.debug_struct("Controller")
            .field("running", &registry.trigger.is_some())
            .field("jobs", &registry.jobs.len())
            .field("location", &self.inner.location)
            .field("address", &self.inner.address)
            .finish()
    }
}

/// Dashboard view of a controller that does not keep it alive.
struct DashboardSource(Weak<Shared>);

impl EntrySource for DashboardSource {
    fn entries(&self) -> Option<Vec<JobSnapshot>> {
        self.0.upgrade()?.entries()
    }
}

/// Callback handed to the trigger engine. It holds the job weakly so a
/// removed job is freed even if the engine still has a firing queued.
///
/// The id is bound on every firing since the engine may fire before `add`
/// has returned it to the registry.
fn fire_callback(job: Weak<Job>, ctx: Context) -> Callback {
    Arc::new(move |id| {
        let job = job.clone();
        let ctx = ctx.clone();
        async move {
            if let Some(job) = job.upgrade() {
                job.bind_entry(id);
                job.run(ctx).await;
            }
        }
        .boxed()
    })
}

pub struct ControllerBuilder {
    config: Config,
    interceptors: Vec<Arc<dyn Interceptor>>,
    sink: Option<Arc<dyn ErrorSink>>,
    trigger: Option<Arc<dyn Trigger>>,
}

impl ControllerBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            interceptors: Vec::new(),
            sink: None,
            trigger: None,
        }
    }

    /// Append an interceptor; the first one added runs outermost.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Replace the interceptors added so far with `chain`.
    pub fn chain(mut self, chain: Chain) -> Self {
        self.interceptors = chain.interceptors().to_vec();
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use `trigger` instead of a [`CronTrigger`] in the configured location.
    pub fn trigger(mut self, trigger: Arc<dyn Trigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn build(self) -> Controller {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let location = self.config.timezone().unwrap_or_else(|e| {
            sink.report("new", &e);
            Location::Local
        });
        let trigger = self
            .trigger
            .unwrap_or_else(|| Arc::new(CronTrigger::new(location)));
        let address = self.config.bind_addr();

        let controller = Controller {
            inner: Arc::new(Shared {
                registry: RwLock::new(Registry {
                    trigger: Some(trigger),
                    jobs: BTreeMap::new(),
                }),
                chain: Arc::new(Chain::new(self.interceptors)),
                sink,
                location,
                address: address.clone(),
                shutdown: CancellationToken::new(),
            }),
        };
        info!(
            location = %location,
            interceptors = controller.inner.chain.len(),
            dashboard = address.as_deref().unwrap_or("disabled"),
            "controller created"
        );

        if let Some(addr) = address {
            controller.start_dashboard(addr);
        }
        controller
    }
}
