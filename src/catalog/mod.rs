//! Read side of events: owner, administrator and public queries
//!
//! Every listing is decorated at read time with the confirmed-request count
//! and the view count of each event. Public reads are themselves recorded as
//! hits.

mod params;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::mapper::{event_to_full, event_to_short};
use crate::stats::{event_uri, StatsRecorder, ViewCountAggregator, EVENTS_URI};
use crate::store::{EntityStore, EventFilter, RequestFilter};
use crate::types::{Event, EventFullDto, EventId, EventShortDto, EventState, RequestStatus, UserId};
use crate::utils::time::{format_wire, Clock};

pub use params::{AdminSearchParams, EventSort, PageRequest, PublicSearchParams, DEFAULT_PAGE_SIZE};

/// Event queries
pub struct EventCatalog {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    recorder: Arc<StatsRecorder>,
    aggregator: Arc<ViewCountAggregator>,
    app_name: String,
    unique_views: bool,
}

/// Per-event counters attached to a listing
#[derive(Debug, Default)]
struct Decorations {
    confirmed: HashMap<EventId, u64>,
    views: HashMap<EventId, u64>,
}

impl Decorations {
    fn confirmed(&self, id: EventId) -> u64 {
        self.confirmed.get(&id).copied().unwrap_or(0)
    }

    fn views(&self, id: EventId) -> u64 {
        self.views.get(&id).copied().unwrap_or(0)
    }
}

impl EventCatalog {
    pub fn new(
        store: Arc<dyn EntityStore>,
        clock: Arc<dyn Clock>,
        recorder: Arc<StatsRecorder>,
        aggregator: Arc<ViewCountAggregator>,
        app_name: impl Into<String>,
        unique_views: bool,
    ) -> Self {
        Self {
            store,
            clock,
            recorder,
            aggregator,
            app_name: app_name.into(),
            unique_views,
        }
    }

    /// Events created by `initiator`, ascending by id
    pub fn events_by_initiator(&self, initiator: UserId, page: PageRequest) -> DomainResult<Vec<EventShortDto>> {
        let filter = EventFilter {
            initiators: Some(vec![initiator]),
            ..Default::default()
        };
        let events = page.slice(self.store.list_events(&filter)?)?;
        let decorations = self.decorate(&events)?;

        Ok(events
            .iter()
            .map(|e| event_to_short(e, decorations.confirmed(e.id), decorations.views(e.id)))
            .collect())
    }

    /// One event as seen by its initiator
    pub fn event_by_initiator(&self, initiator: UserId, event_id: EventId) -> DomainResult<EventFullDto> {
        match self.store.find_event(event_id)? {
            Some(event) if event.initiator == initiator => self.full_view(&event),
            _ => Err(DomainError::not_found(format!(
                "event {} of user {} does not exist",
                event_id, initiator
            ))),
        }
    }

    /// Administrator search across every state
    pub fn search_admin(&self, params: &AdminSearchParams) -> DomainResult<Vec<EventFullDto>> {
        let filter = EventFilter {
            ids: None,
            initiators: params.users.clone().filter(|v| !v.is_empty()),
            states: params.states.clone().filter(|v| !v.is_empty()),
            categories: params.categories.clone().filter(|v| !v.is_empty()),
            range_start: params.range_start,
            range_end: params.range_end,
        };
        let events = params.page.slice(self.store.list_events(&filter)?)?;
        debug!(found = events.len(), "admin search");

        let decorations = self.decorate(&events)?;
        Ok(events
            .iter()
            .map(|e| event_to_full(e, decorations.confirmed(e.id), decorations.views(e.id)))
            .collect())
    }

    /// Public search over published events; counts as one hit on `/events`
    pub fn search_public(&self, params: &PublicSearchParams, client_ip: &str) -> DomainResult<Vec<EventShortDto>> {
        if let (Some(start), Some(end)) = (params.range_start, params.range_end) {
            if end < start {
                return Err(DomainError::validation(
                    "rangeEnd",
                    format!("{} is before {}", format_wire(&end), format_wire(&start)),
                ));
            }
        }

        self.recorder.record_hit(&self.app_name, EVENTS_URI, client_ip);

        let filter = EventFilter {
            states: Some(vec![EventState::Published]),
            categories: params.categories.clone().filter(|v| !v.is_empty()),
            ..Default::default()
        };
        let start = params.range_start.unwrap_or_else(|| self.clock.now());
        let text = params.text.as_deref().map(str::to_lowercase).filter(|t| !t.is_empty());

        let mut events: Vec<Event> = self
            .store
            .list_events(&filter)?
            .into_iter()
            .filter(|e| e.event_date > start)
            .filter(|e| params.range_end.map_or(true, |end| e.event_date < end))
            .filter(|e| params.paid.map_or(true, |paid| e.paid == paid))
            .filter(|e| text.as_deref().map_or(true, |t| mentions(e, t)))
            .collect();

        let mut decorations = Decorations {
            confirmed: self.confirmed_counts(&events)?,
            views: HashMap::new(),
        };
        if params.only_available {
            events.retain(|e| e.is_unlimited() || decorations.confirmed(e.id) < u64::from(e.participant_limit));
        }

        match params.sort {
            Some(EventSort::EventDate) => events.sort_by_key(|e| e.event_date),
            Some(EventSort::Views) => {
                decorations.views = self.views(&events)?;
                events.sort_by(|a, b| {
                    decorations
                        .views(b.id)
                        .cmp(&decorations.views(a.id))
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            None => {}
        }

        let events = params.page.slice(events)?;
        if params.sort != Some(EventSort::Views) {
            decorations.views = self.views(&events)?;
        }
        debug!(found = events.len(), "public search");

        Ok(events
            .iter()
            .map(|e| event_to_short(e, decorations.confirmed(e.id), decorations.views(e.id)))
            .collect())
    }

    /// A published event by id; counts as one hit on `/events/{id}`
    pub fn published_event(&self, event_id: EventId, client_ip: &str) -> DomainResult<EventFullDto> {
        let event = match self.store.find_event(event_id)? {
            Some(event) if event.state == EventState::Published => event,
            _ => {
                return Err(DomainError::not_found(format!(
                    "published event {} does not exist",
                    event_id
                )))
            }
        };

        self.recorder.record_hit(&self.app_name, &event_uri(event_id), client_ip);
        self.full_view(&event)
    }

    /// Decorate a single event
    pub fn full_view(&self, event: &Event) -> DomainResult<EventFullDto> {
        let decorations = self.decorate(std::slice::from_ref(event))?;
        Ok(event_to_full(event, decorations.confirmed(event.id), decorations.views(event.id)))
    }

    fn decorate(&self, events: &[Event]) -> DomainResult<Decorations> {
        Ok(Decorations {
            confirmed: self.confirmed_counts(events)?,
            views: self.views(events)?,
        })
    }

    fn confirmed_counts(&self, events: &[Event]) -> DomainResult<HashMap<EventId, u64>> {
        if events.is_empty() {
            return Ok(HashMap::new());
        }
        let filter = RequestFilter {
            events: Some(events.iter().map(|e| e.id).collect()),
            status: Some(RequestStatus::Confirmed),
            ..Default::default()
        };
        let mut counts = HashMap::new();
        for request in self.store.list_requests(&filter)? {
            *counts.entry(request.event).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Views since the earliest creation among `events`
    fn views(&self, events: &[Event]) -> DomainResult<HashMap<EventId, u64>> {
        let Some(since) = earliest_created(events) else {
            return Ok(HashMap::new());
        };
        let ids: Vec<EventId> = events.iter().map(|e| e.id).collect();
        self.aggregator.count_views(&ids, since, self.unique_views)
    }
}

fn earliest_created(events: &[Event]) -> Option<DateTime<Utc>> {
    events.iter().map(|e| e.created_on).min()
}

fn mentions(event: &Event, needle: &str) -> bool {
    event.annotation.to_lowercase().contains(needle) || event.description.to_lowercase().contains(needle)
}
