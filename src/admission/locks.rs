//! Per-event mutual exclusion

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::EventId;

/// Registry of one lock per event.
///
/// Every command that reads the confirmed count of an event and then writes
/// statuses, or rewrites the event itself, runs inside [`EventLocks::run`]
/// for that event. Distinct events never share a lock. An entry lives only
/// while some command holds or waits for it, so ids that were never stored
/// leave nothing behind.
#[derive(Debug, Default)]
pub struct EventLocks {
    slots: Mutex<HashMap<EventId, Arc<Mutex<()>>>>,
}

/// A claimed registry entry; drops the entry when its last claimant leaves
struct Claim<'a> {
    locks: &'a EventLocks,
    event_id: EventId,
    handle: Arc<Mutex<()>>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock();
        // The map and this claim are the only owners left
        if Arc::strong_count(&self.handle) == 2 {
            slots.remove(&self.event_id);
        }
    }
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock of `event_id`
    pub fn run<R>(&self, event_id: EventId, f: impl FnOnce() -> R) -> R {
        let claim = Claim {
            locks: self,
            event_id,
            handle: self.slots.lock().entry(event_id).or_default().clone(),
        };
        let _guard = claim.handle.lock();
        f()
    }

    /// Number of events currently locked or waited on
    pub fn tracked(&self) -> usize {
        self.slots.lock().len()
    }
}
