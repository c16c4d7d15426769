//! In-memory tables with optional journal durability

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{
    EntityStore, EventFilter, HitFilter, Journal, RequestFilter, StoreError, StoreResult,
};
use crate::types::{Event, EventId, Hit, HitId, NewHit, ParticipationRequest, RequestId};

#[derive(Debug, Default)]
struct Entities {
    events: BTreeMap<EventId, Event>,
    requests: BTreeMap<RequestId, ParticipationRequest>,
    last_event_id: EventId,
    last_request_id: RequestId,
    writes_since_snapshot: usize,
}

impl Entities {
    fn restore(events: Vec<Event>, requests: Vec<ParticipationRequest>) -> Self {
        let mut entities = Entities::default();
        for event in events {
            entities.last_event_id = entities.last_event_id.max(event.id);
            entities.events.insert(event.id, event);
        }
        for request in requests {
            entities.last_request_id = entities.last_request_id.max(request.id);
            entities.requests.insert(request.id, request);
        }
        entities
    }
}

/// Hits live apart from the entity tables: recording one never waits on an
/// admission write, and an admission write never waits on the hit log.
#[derive(Debug, Default)]
struct HitLog {
    entries: RwLock<Vec<Hit>>,
    /// Held across the journal append so ids follow file order
    last_id: Mutex<HitId>,
}

/// Entity store keeping every table in memory.
///
/// One `RwLock` guards events and requests together, so each trait method
/// on them is atomic with respect to the others. Hits have their own locks.
/// When a journal is attached, a write is only kept in memory once it has
/// reached disk.
pub struct InMemoryStore {
    entities: RwLock<Entities>,
    hit_log: HitLog,
    journal: Option<Journal>,
}

impl InMemoryStore {
    /// Volatile store
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Entities::default()),
            hit_log: HitLog::default(),
            journal: None,
        }
    }

    /// Store backed by a journal, pre-loaded from it.
    ///
    /// The state file is compacted right away, which also drops a torn
    /// final write before anything is appended after it.
    pub fn with_journal(journal: Journal) -> StoreResult<Self> {
        let state = journal.load()?;
        let entities = Entities::restore(state.events, state.requests);
        journal.write_snapshot(entities.events.values(), entities.requests.values())?;

        let last_hit_id = state.hits.iter().map(|h| h.id).max().unwrap_or(0);
        Ok(Self {
            entities: RwLock::new(entities),
            hit_log: HitLog {
                entries: RwLock::new(state.hits),
                last_id: Mutex::new(last_hit_id),
            },
            journal: Some(journal),
        })
    }

    /// Make a committed entity write durable; the caller holds the write guard.
    ///
    /// Compaction runs every `snapshot_threshold` writes. A failed compaction
    /// keeps the log and is retried on the next write.
    fn persist(
        &self,
        entities: &mut Entities,
        append: impl FnOnce(&Journal) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        append(journal)?;

        entities.writes_since_snapshot += 1;
        if entities.writes_since_snapshot >= journal.snapshot_threshold() {
            match journal.write_snapshot(entities.events.values(), entities.requests.values()) {
                Ok(()) => {
                    debug!(writes = entities.writes_since_snapshot, "journal compacted");
                    entities.writes_since_snapshot = 0;
                }
                Err(e) => warn!(error = %e, "journal compaction failed"),
            }
        }
        Ok(())
    }

    pub fn event_count(&self) -> usize {
        self.entities.read().events.len()
    }

    pub fn hit_count(&self) -> usize {
        self.hit_log.entries.read().len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for InMemoryStore {
    fn insert_event(&self, mut event: Event) -> StoreResult<Event> {
        let mut entities = self.entities.write();
        let id = entities.last_event_id + 1;
        event.id = id;
        entities.events.insert(id, event.clone());

        if let Err(e) = self.persist(&mut entities, |journal| journal.append_event(&event)) {
            entities.events.remove(&id);
            return Err(e);
        }
        entities.last_event_id = id;
        Ok(event)
    }

    fn update_event(&self, event: &Event) -> StoreResult<()> {
        let mut entities = self.entities.write();
        let Some(slot) = entities.events.get_mut(&event.id) else {
            return Err(StoreError::Missing(format!("event {}", event.id)));
        };
        let previous = std::mem::replace(slot, event.clone());

        if let Err(e) = self.persist(&mut entities, |journal| journal.append_event(event)) {
            entities.events.insert(previous.id, previous);
            return Err(e);
        }
        Ok(())
    }

    fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        Ok(self.entities.read().events.get(&id).cloned())
    }

    fn list_events(&self, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        let entities = self.entities.read();
        Ok(entities
            .events
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn insert_request(&self, mut request: ParticipationRequest) -> StoreResult<ParticipationRequest> {
        let mut entities = self.entities.write();
        let id = entities.last_request_id + 1;
        request.id = id;
        entities.requests.insert(id, request.clone());

        let written = std::slice::from_ref(&request);
        if let Err(e) = self.persist(&mut entities, |journal| journal.append_requests(written)) {
            entities.requests.remove(&id);
            return Err(e);
        }
        entities.last_request_id = id;
        Ok(request)
    }

    fn find_request(&self, id: RequestId) -> StoreResult<Option<ParticipationRequest>> {
        Ok(self.entities.read().requests.get(&id).cloned())
    }

    fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ParticipationRequest>> {
        let entities = self.entities.read();
        Ok(entities
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn count_requests(&self, filter: &RequestFilter) -> StoreResult<usize> {
        let entities = self.entities.read();
        Ok(entities.requests.values().filter(|r| filter.matches(r)).count())
    }

    fn upsert_requests(&self, requests: &[ParticipationRequest]) -> StoreResult<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let mut entities = self.entities.write();
        let last_request_id = entities.last_request_id;
        let mut previous = Vec::with_capacity(requests.len());
        for request in requests {
            let old = entities.requests.insert(request.id, request.clone());
            previous.push((request.id, old));
        }

        if let Err(e) = self.persist(&mut entities, |journal| journal.append_requests(requests)) {
            // Undo in reverse so repeated ids end at their original value
            for (id, old) in previous.into_iter().rev() {
                match old {
                    Some(old) => entities.requests.insert(id, old),
                    None => entities.requests.remove(&id),
                };
            }
            return Err(e);
        }

        let max_id = requests.iter().map(|r| r.id).max().unwrap_or(0);
        entities.last_request_id = last_request_id.max(max_id);
        Ok(())
    }

    fn append_hit(&self, hit: NewHit) -> StoreResult<Hit> {
        let mut last_id = self.hit_log.last_id.lock();
        let hit = hit.into_hit(*last_id + 1);

        if let Some(journal) = &self.journal {
            journal.append_hit(&hit)?;
        }
        *last_id = hit.id;
        self.hit_log.entries.write().push(hit.clone());
        Ok(hit)
    }

    fn list_hits(&self, filter: &HitFilter) -> StoreResult<Vec<Hit>> {
        let entries = self.hit_log.entries.read();
        Ok(entries
            .iter()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect())
    }
}
