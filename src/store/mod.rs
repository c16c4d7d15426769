//! Entity store: persistence seam for events, participation requests and hits
//!
//! The services only talk to [`EntityStore`]. [`InMemoryStore`] is the
//! bundled implementation; with a [`Journal`] attached it also survives
//! restarts.
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌──────────────────┐    ┌───────────────────────┐
//! │ service  │───►│ entities (RwLock)│───►│ state.jsonl append,   │
//! │ command  │    │ apply batch      │    │ snapshot every N      │
//! └──────────┘    └──────────────────┘    └───────────────────────┘
//! ┌──────────┐    ┌──────────────────┐    ┌───────────────────────┐
//! │ hit      │───►│ hit log (own     │───►│ hits.jsonl append     │
//! │          │    │ locks)           │    │                       │
//! └──────────┘    └──────────────────┘    └───────────────────────┘
//! ```

mod journal;
mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{
    CategoryId, Event, EventId, EventState, Hit, NewHit, ParticipationRequest, RequestId,
    RequestStatus, UserId,
};

pub use journal::Journal;
pub use memory::InMemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("journal corrupted: {0}")]
    Corrupted(String),

    #[error("{0} is not stored")]
    Missing(String),
}

/// Conjunctive filter over events; `None` means "any"
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub ids: Option<Vec<EventId>>,
    pub initiators: Option<Vec<UserId>>,
    pub states: Option<Vec<EventState>>,
    pub categories: Option<Vec<CategoryId>>,
    /// Inclusive lower bound on `event_date`
    pub range_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `event_date`
    pub range_end: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        contains(&self.ids, &event.id)
            && contains(&self.initiators, &event.initiator)
            && contains(&self.states, &event.state)
            && contains(&self.categories, &event.category)
            && self.range_start.map_or(true, |start| event.event_date >= start)
            && self.range_end.map_or(true, |end| event.event_date <= end)
    }
}

/// Conjunctive filter over participation requests; `None` means "any"
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub ids: Option<Vec<RequestId>>,
    pub events: Option<Vec<EventId>>,
    pub requester: Option<UserId>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn for_event(event_id: EventId) -> Self {
        Self {
            events: Some(vec![event_id]),
            ..Default::default()
        }
    }

    pub fn for_requester(requester: UserId) -> Self {
        Self {
            requester: Some(requester),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_requester(mut self, requester: UserId) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn with_ids(mut self, ids: Vec<RequestId>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn matches(&self, request: &ParticipationRequest) -> bool {
        contains(&self.ids, &request.id)
            && contains(&self.events, &request.event)
            && self.requester.map_or(true, |id| request.requester == id)
            && self.status.map_or(true, |status| request.status == status)
    }
}

/// Hits inside `[start, end]`, restricted to `uris` unless it is empty
#[derive(Debug, Clone)]
pub struct HitFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub uris: Vec<String>,
}

impl HitFilter {
    pub fn matches(&self, hit: &Hit) -> bool {
        hit.timestamp >= self.start
            && hit.timestamp <= self.end
            && (self.uris.is_empty() || self.uris.iter().any(|uri| *uri == hit.uri))
    }
}

fn contains<T: PartialEq>(allowed: &Option<Vec<T>>, value: &T) -> bool {
    allowed.as_ref().map_or(true, |allowed| allowed.contains(value))
}

/// Transactional table interface used by every service.
///
/// Each method is atomic on its own. `upsert_requests` applies the whole
/// batch or nothing. Cross-call isolation (read a count, then write) is the
/// caller's job; see [`crate::admission::EventLocks`].
pub trait EntityStore: Send + Sync {
    /// Store a new event; the returned copy carries the assigned id
    fn insert_event(&self, event: Event) -> StoreResult<Event>;

    /// Overwrite an existing event
    fn update_event(&self, event: &Event) -> StoreResult<()>;

    fn find_event(&self, id: EventId) -> StoreResult<Option<Event>>;

    /// Events matching `filter`, ascending by id
    fn list_events(&self, filter: &EventFilter) -> StoreResult<Vec<Event>>;

    /// Store a new request; the returned copy carries the assigned id
    fn insert_request(&self, request: ParticipationRequest) -> StoreResult<ParticipationRequest>;

    fn find_request(&self, id: RequestId) -> StoreResult<Option<ParticipationRequest>>;

    /// Requests matching `filter`, ascending by id
    fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ParticipationRequest>>;

    fn count_requests(&self, filter: &RequestFilter) -> StoreResult<usize> {
        Ok(self.list_requests(filter)?.len())
    }

    /// Write every request in one atomic batch
    fn upsert_requests(&self, requests: &[ParticipationRequest]) -> StoreResult<()>;

    fn append_hit(&self, hit: NewHit) -> StoreResult<Hit>;

    fn list_hits(&self, filter: &HitFilter) -> StoreResult<Vec<Hit>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(id: RequestId, event: EventId, requester: UserId, status: RequestStatus) -> ParticipationRequest {
        ParticipationRequest {
            id,
            event,
            requester,
            status,
            created: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_request_filter_is_conjunctive() {
        let filter = RequestFilter::for_event(3)
            .with_requester(9)
            .with_status(RequestStatus::Pending);

        assert!(filter.matches(&request(1, 3, 9, RequestStatus::Pending)));
        assert!(!filter.matches(&request(1, 3, 9, RequestStatus::Confirmed)));
        assert!(!filter.matches(&request(1, 4, 9, RequestStatus::Pending)));
        assert!(!filter.matches(&request(1, 3, 8, RequestStatus::Pending)));
    }

    #[test]
    fn test_hit_filter_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap();
        let filter = HitFilter {
            start,
            end,
            uris: vec![],
        };
        let hit = |timestamp| Hit {
            id: 1,
            app: "main".to_string(),
            uri: "/events/1".to_string(),
            ip: "10.0.0.1".to_string(),
            timestamp,
        };

        assert!(filter.matches(&hit(start)));
        assert!(filter.matches(&hit(end)));
        assert!(!filter.matches(&hit(end + chrono::Duration::seconds(1))));
    }
}
