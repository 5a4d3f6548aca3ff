use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use cronwatch_core::{CronwatchError, EntryId, Location, Result};
use tokio::task::JoinHandle;

use super::{Callback, EntryTimes, Trigger};
use crate::schedule::Schedule;
use crate::sync::lock;

struct ManualEntry {
    spec: String,
    callback: Callback,
    times: EntryTimes,
}

/// Trigger engine that only fires when told to.
///
/// Specs are validated with the same grammar as [`CronTrigger`], so it can
/// stand in for it anywhere timing should be driven by the caller (tests,
/// admin "run now" actions).
///
/// [`CronTrigger`]: super::CronTrigger
pub struct ManualTrigger {
    location: Location,
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<EntryId, ManualEntry>>,
    stopped: AtomicBool,
}

impl ManualTrigger {
    pub fn new() -> Self {
        Self::with_location(Location::Local)
    }

    pub fn with_location(location: Location) -> Self {
        Self {
            location,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(BTreeMap::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Registered entry ids with their specs, in id order.
    pub fn specs(&self) -> Vec<(EntryId, String)> {
        lock(&self.entries)
            .iter()
            .map(|(id, e)| (*id, e.spec.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Fire `id` and wait for the firing to finish. Returns false if `id` is
    /// unknown or the engine is stopped.
    pub async fn fire(&self, id: EntryId) -> bool {
        match self.take_callback(id) {
            Some(callback) => {
                callback(id).await;
                true
            }
            None => false,
        }
    }

    /// Fire `id` on a new task without waiting, the way a real engine
    /// dispatches overlapping firings.
    pub fn spawn_fire(&self, id: EntryId) -> Option<JoinHandle<()>> {
        self.take_callback(id).map(|callback| tokio::spawn(callback(id)))
    }

    /// Fire every entry once, sequentially, in id order.
    pub async fn fire_all(&self) -> usize {
        let ids: Vec<EntryId> = lock(&self.entries).keys().copied().collect();
        let mut fired = 0;
        for id in ids {
            if self.fire(id).await {
                fired += 1;
            }
        }
        fired
    }

    fn take_callback(&self, id: EntryId) -> Option<Callback> {
        if self.is_stopped() {
            return None;
        }
        let mut entries = lock(&self.entries);
        let entry = entries.get_mut(&id)?;
        entry.times.prev = Some(Utc::now());
        Some(entry.callback.clone())
    }
}

impl Default for ManualTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Trigger for ManualTrigger {
    fn add(&self, spec: &str, callback: Callback) -> Result<EntryId> {
        if self.is_stopped() {
            return Err(CronwatchError::Uninitialized { operation: "add" });
        }
        let schedule = Schedule::parse(spec, self.location)?;
        let id = EntryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.entries).insert(
            id,
            ManualEntry {
                spec: spec.to_string(),
                callback,
                times: EntryTimes {
                    prev: None,
                    next: schedule.next_after(Utc::now()),
                },
            },
        );
        Ok(id)
    }

    fn remove(&self, id: EntryId) {
        lock(&self.entries).remove(&id);
    }

    fn entry(&self, id: EntryId) -> Option<EntryTimes> {
        lock(&self.entries).get(&id).map(|e| e.times)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        lock(&self.entries).clear();
    }
}
