//! Time-trigger engines: the collaborator that decides *when* an entry fires.
//!
//! The controller hands a zero-argument [`Callback`] to [`Trigger::add`] and
//! never learns how timing is implemented.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cronwatch_core::{EntryId, Result};
use futures_util::future::BoxFuture;

mod manual;
mod timer;

pub use self::manual::ManualTrigger;
pub use self::timer::CronTrigger;

/// Invoked once per firing with the entry's id; the returned future is the
/// whole unit of work.
pub type Callback = Arc<dyn Fn(EntryId) -> BoxFuture<'static, ()> + Send + Sync>;

/// Firing times of one entry, as far as the engine knows them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryTimes {
    pub prev: Option<DateTime<Utc>>,
    pub next: Option<DateTime<Utc>>,
}

pub trait Trigger: Send + Sync {
    /// Validate `spec` and start firing `callback` on it.
    fn add(&self, spec: &str, callback: Callback) -> Result<EntryId>;

    /// Stop firing `id`. Unknown ids are ignored.
    fn remove(&self, id: EntryId);

    fn entry(&self, id: EntryId) -> Option<EntryTimes>;

    /// Fire nothing more. Firings already dispatched run to completion.
    fn stop(&self);
}
