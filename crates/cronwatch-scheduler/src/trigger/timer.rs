use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use cronwatch_core::{CronwatchError, EntryId, Location, Result};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Callback, EntryTimes, Trigger};
use crate::schedule::Schedule;
use crate::sync::lock;

struct EntryState {
    cancel: CancellationToken,
    times: Arc<Mutex<EntryTimes>>,
}

/// Tokio trigger engine: one timer task per entry, and every firing is
/// dispatched onto its own task so a slow run never delays the timer.
pub struct CronTrigger {
    location: Location,
    next_id: AtomicU64,
    entries: Mutex<HashMap<EntryId, EntryState>>,
    root: CancellationToken,
}

impl CronTrigger {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Trigger for CronTrigger {
    fn add(&self, spec: &str, callback: Callback) -> Result<EntryId> {
        if self.root.is_cancelled() {
            return Err(CronwatchError::Uninitialized { operation: "add" });
        }
        let schedule = Schedule::parse(spec, self.location)?;
        let runtime = Handle::try_current().map_err(|e| {
            CronwatchError::Config(format!("trigger engine needs a tokio runtime: {e}"))
        })?;

        let id = EntryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = self.root.child_token();
        let times = Arc::new(Mutex::new(EntryTimes {
            prev: None,
            next: schedule.next_after(Utc::now()),
        }));

        lock(&self.entries).insert(
            id,
            EntryState {
                cancel: cancel.clone(),
                times: times.clone(),
            },
        );

        runtime.spawn(async move {
            loop {
                let Some(due) = lock(&times).next else {
                    debug!(entry_id = %id, "schedule exhausted");
                    break;
                };
                let wait = (due - Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                let fired_at = Utc::now().max(due);
                {
                    let mut t = lock(&times);
                    t.prev = Some(due);
                    t.next = schedule.next_after(fired_at);
                }
                debug!(entry_id = %id, "entry fired");
                tokio::spawn(callback(id));
            }
        });

        info!(entry_id = %id, spec, "entry added");
        Ok(id)
    }

    fn remove(&self, id: EntryId) {
        if let Some(entry) = lock(&self.entries).remove(&id) {
            entry.cancel.cancel();
            info!(entry_id = %id, "entry removed");
        }
    }

    fn entry(&self, id: EntryId) -> Option<EntryTimes> {
        lock(&self.entries).get(&id).map(|e| *lock(&e.times))
    }

    fn stop(&self) {
        self.root.cancel();
        lock(&self.entries).clear();
        info!("trigger engine stopped");
    }
}

impl Drop for CronTrigger {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn reporting_callback(tx: mpsc::UnboundedSender<EntryId>) -> Callback {
        Arc::new(move |id| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(id);
            }
            .boxed()
        })
    }

    fn utc() -> Location {
        Location::Zone(chrono_tz::UTC)
    }

    #[tokio::test]
    async fn fires_interval_entries() {
        let trigger = CronTrigger::new(utc());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = trigger.add("@every 1s", reporting_callback(tx)).unwrap();
        assert_eq!(id, EntryId(1));

        let fired = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("entry should fire within the interval")
            .expect("channel open");
        assert_eq!(fired, id);

        let times = trigger.entry(id).unwrap();
        assert!(times.prev.is_some());
        assert!(times.next > times.prev);
        trigger.stop();
    }

    #[tokio::test]
    async fn ids_are_sequential_and_bad_specs_rejected() {
        let trigger = CronTrigger::new(utc());
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = trigger.add("@hourly", reporting_callback(tx.clone())).unwrap();
        let err = trigger.add("broken spec", reporting_callback(tx.clone())).unwrap_err();
        let b = trigger.add("0 0 1 * * *", reporting_callback(tx)).unwrap();

        assert_eq!(err.code(), "INVALID_SCHEDULE");
        assert_eq!((a, b), (EntryId(1), EntryId(2)));
        assert_eq!(trigger.len(), 2);
    }

    #[tokio::test]
    async fn removed_entries_stop_firing() {
        let trigger = CronTrigger::new(utc());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = trigger.add("@every 1s", reporting_callback(tx)).unwrap();
        trigger.remove(id);
        assert!(trigger.entry(id).is_none());

        let fired = tokio::time::timeout(Duration::from_millis(1500), rx.recv()).await;
        // Either nothing arrived, or the channel closed because the timer task dropped its sender.
        assert!(matches!(fired, Err(_) | Ok(None)));
    }

    #[tokio::test]
    async fn stopped_engine_rejects_new_entries() {
        let trigger = CronTrigger::new(utc());
        let (tx, _rx) = mpsc::unbounded_channel();
        trigger.stop();
        let err = trigger.add("@hourly", reporting_callback(tx)).unwrap_err();
        assert_eq!(err.code(), "UNINITIALIZED_CONTROLLER");
        assert!(trigger.is_empty());
    }

    #[test]
    fn add_outside_runtime_is_an_error() {
        let trigger = CronTrigger::new(utc());
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = trigger.add("@hourly", reporting_callback(tx)).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
