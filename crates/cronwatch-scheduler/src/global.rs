//! Process-wide default controller and the package-level helpers that use it.
//!
//! Nothing is created implicitly: until [`default`] or [`init`] runs, the
//! helpers behave exactly like an uninitialized controller.

use std::sync::OnceLock;
use std::time::Duration;

use cronwatch_core::{Config, CronwatchError, EntryId, JobSnapshot, Result};

use crate::controller::Controller;
use crate::task::Task;

static DEFAULT: OnceLock<Controller> = OnceLock::new();

/// The process-wide controller, created with [`Config::default`] on first use.
/// Concurrent first callers all get the same instance.
pub fn default() -> &'static Controller {
    DEFAULT.get_or_init(|| Controller::new(Config::default()))
}

/// Install `controller` as the process-wide default.
///
/// Fails if a default already exists; the rejected controller is stopped.
pub fn init(controller: Controller) -> Result<&'static Controller> {
    let mut installed = false;
    let current = DEFAULT.get_or_init(|| {
        installed = true;
        controller.clone()
    });
    if installed {
        Ok(current)
    } else {
        controller.stop();
        Err(CronwatchError::Config(
            "default controller is already initialized".to_string(),
        ))
    }
}

/// The default controller, if one has been created.
pub fn global() -> Option<&'static Controller> {
    DEFAULT.get()
}

pub fn schedule<T: Task + 'static>(spec: &str, task: T) -> Result<EntryId> {
    match global() {
        Some(controller) => controller.schedule(spec, task),
        None => Err(CronwatchError::Uninitialized { operation: "schedule" }),
    }
}

pub fn schedules<T: Task + 'static>(specs: &str, delimiter: &str, task: T) -> Result<Vec<EntryId>> {
    match global() {
        Some(controller) => controller.schedules(specs, delimiter, task),
        None => Err(CronwatchError::Uninitialized { operation: "schedules" }),
    }
}

pub fn every<T: Task + 'static>(every: Duration, task: T) -> Option<EntryId> {
    global().and_then(|controller| controller.every(every, task))
}

pub fn remove(id: EntryId) {
    if let Some(controller) = global() {
        controller.remove(id);
    }
}

pub fn entries() -> Option<Vec<JobSnapshot>> {
    global().and_then(Controller::entries)
}

pub fn stop() {
    if let Some(controller) = global() {
        controller.stop();
    }
}
