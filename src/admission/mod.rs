//! Capacity admission engine
//!
//! Owns the participation-request state machine:
//!
//! ```text
//! PENDING ──► CONFIRMED
//!    │  ├───► REJECTED
//!    │  └───► CANCELED
//! CONFIRMED ─► CANCELED   (requester withdraws)
//! ```
//!
//! Every operation that reads the confirmed count of an event and then
//! writes runs under that event's lock from [`EventLocks`], so concurrent
//! joins and bulk decisions on one event can never jointly overshoot the
//! participant limit.

mod bulk;
mod locks;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::mapper::{request_to_dto, requests_to_dtos};
use crate::store::{EntityStore, RequestFilter};
use crate::types::{
    Event, EventId, EventRequestStatusUpdateResult, EventState, ParticipationRequest,
    ParticipationRequestDto, RequestId, RequestStatus, UserId,
};
use crate::utils::time::Clock;

pub use locks::EventLocks;

/// Join, cancel and moderate participation requests
pub struct CapacityAdmissionEngine {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<EventLocks>,
}

impl CapacityAdmissionEngine {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, locks: Arc<EventLocks>) -> Self {
        Self { store, clock, locks }
    }

    /// Ask to join a published event.
    ///
    /// The new request is CONFIRMED when the event is unlimited or not
    /// moderated, PENDING otherwise.
    #[instrument(skip(self))]
    pub fn request_to_join(
        &self,
        requester: UserId,
        event_id: EventId,
    ) -> DomainResult<ParticipationRequestDto> {
        self.locks.run(event_id, || self.admit(requester, event_id))
    }

    fn admit(&self, requester: UserId, event_id: EventId) -> DomainResult<ParticipationRequestDto> {
        let event = self.find_event(event_id)?;
        if event.initiator == requester {
            warn!("initiator tried to join own event");
            return Err(DomainError::conflict(format!(
                "user {} is the initiator of event {}",
                requester, event_id
            )));
        }
        if event.state != EventState::Published {
            return Err(DomainError::conflict(format!(
                "event {} is not published",
                event_id
            )));
        }

        let duplicate = self
            .store
            .list_requests(&RequestFilter::for_event(event_id).with_requester(requester))?
            .into_iter()
            .any(|r| r.status != RequestStatus::Canceled);
        if duplicate {
            return Err(DomainError::conflict(format!(
                "user {} already requested to join event {}",
                requester, event_id
            )));
        }

        if !event.is_unlimited() {
            let confirmed = self.confirmed_count(event_id)?;
            if confirmed >= event.participant_limit as usize {
                return Err(DomainError::conflict(format!(
                    "participant limit of event {} is reached",
                    event_id
                )));
            }
        }

        let status = initial_status(&event);
        let request = self.store.insert_request(ParticipationRequest::new(
            event_id,
            requester,
            status,
            self.clock.now(),
        ))?;

        info!(request_id = request.id, ?status, "participation request created");
        Ok(request_to_dto(&request))
    }

    /// Withdraw an own request that is still pending or confirmed
    #[instrument(skip(self))]
    pub fn cancel_request(
        &self,
        requester: UserId,
        request_id: RequestId,
    ) -> DomainResult<ParticipationRequestDto> {
        let event_id = self.owned_request(requester, request_id)?.event;

        self.locks.run(event_id, || {
            // Re-read under the lock; a bulk decision may have landed in between
            let mut request = self.owned_request(requester, request_id)?;
            if request.status.is_closed() {
                return Err(DomainError::validation(
                    "status",
                    format!("request {} is already {:?}", request_id, request.status),
                ));
            }

            request.status = RequestStatus::Canceled;
            self.store.upsert_requests(std::slice::from_ref(&request))?;

            info!("participation request canceled");
            Ok(request_to_dto(&request))
        })
    }

    /// Confirm or reject many requests of one event at once.
    ///
    /// With `CONFIRMED`, pending requests are confirmed in input order until
    /// the free slots run out; the pending ones the walk did not reach are
    /// then rejected. With `REJECTED`, every pending request named is
    /// rejected. Requests in any other status are skipped. All status changes
    /// are written as one batch.
    #[instrument(skip(self, request_ids), fields(requested = request_ids.len()))]
    pub fn bulk_update_status(
        &self,
        owner: UserId,
        event_id: EventId,
        request_ids: &[RequestId],
        target: RequestStatus,
    ) -> DomainResult<EventRequestStatusUpdateResult> {
        self.locks
            .run(event_id, || self.moderate(owner, event_id, request_ids, target))
    }

    fn moderate(
        &self,
        owner: UserId,
        event_id: EventId,
        request_ids: &[RequestId],
        target: RequestStatus,
    ) -> DomainResult<EventRequestStatusUpdateResult> {
        let event = self.owned_event(owner, event_id)?;
        if !event.request_moderation || event.is_unlimited() {
            return Err(DomainError::conflict(format!(
                "event {} does not require request moderation",
                event_id
            )));
        }
        if !matches!(target, RequestStatus::Confirmed | RequestStatus::Rejected) {
            return Err(DomainError::validation(
                "status",
                format!("cannot bulk-update requests to {:?}", target),
            ));
        }

        let confirmed = self.confirmed_count(event_id)?;
        let free_slots = (event.participant_limit as usize).saturating_sub(confirmed);
        if target == RequestStatus::Confirmed && free_slots == 0 {
            return Err(DomainError::conflict(format!(
                "participant limit of event {} is reached",
                event_id
            )));
        }

        let requests = self.load_scoped(event_id, request_ids)?;
        let plan = match target {
            RequestStatus::Confirmed => bulk::plan_confirmation(requests, free_slots),
            _ => bulk::plan_rejection(requests),
        };

        self.store.upsert_requests(&plan.writes())?;

        if !plan.unprocessed.is_empty() {
            debug!(unprocessed = ?plan.unprocessed, "capacity ran out before these requests");
        }
        info!(
            confirmed = plan.confirmed.len(),
            rejected = plan.rejected.len(),
            free_slots,
            "bulk moderation applied"
        );

        Ok(EventRequestStatusUpdateResult {
            confirmed_requests: requests_to_dtos(&plan.confirmed),
            rejected_requests: requests_to_dtos(&plan.rejected),
        })
    }

    /// Every request a user has made
    pub fn requests_by_requester(&self, requester: UserId) -> DomainResult<Vec<ParticipationRequestDto>> {
        let requests = self.store.list_requests(&RequestFilter::for_requester(requester))?;
        Ok(requests_to_dtos(&requests))
    }

    /// Every request on an event, visible to its initiator only
    pub fn requests_for_event(
        &self,
        owner: UserId,
        event_id: EventId,
    ) -> DomainResult<Vec<ParticipationRequestDto>> {
        self.owned_event(owner, event_id)?;
        let requests = self.store.list_requests(&RequestFilter::for_event(event_id))?;
        Ok(requests_to_dtos(&requests))
    }

    fn find_event(&self, event_id: EventId) -> DomainResult<Event> {
        self.store
            .find_event(event_id)?
            .ok_or_else(|| DomainError::not_found(format!("event {} does not exist", event_id)))
    }

    fn owned_event(&self, owner: UserId, event_id: EventId) -> DomainResult<Event> {
        match self.store.find_event(event_id)? {
            Some(event) if event.initiator == owner => Ok(event),
            _ => Err(DomainError::not_found(format!(
                "event {} of user {} does not exist",
                event_id, owner
            ))),
        }
    }

    fn owned_request(&self, requester: UserId, request_id: RequestId) -> DomainResult<ParticipationRequest> {
        match self.store.find_request(request_id)? {
            Some(request) if request.requester == requester => Ok(request),
            _ => Err(DomainError::not_found(format!(
                "request {} of user {} does not exist",
                request_id, requester
            ))),
        }
    }

    fn confirmed_count(&self, event_id: EventId) -> DomainResult<usize> {
        Ok(self
            .store
            .count_requests(&RequestFilter::for_event(event_id).with_status(RequestStatus::Confirmed))?)
    }

    /// Requests named by `ids` on this event, in input order, duplicates dropped
    fn load_scoped(&self, event_id: EventId, ids: &[RequestId]) -> DomainResult<Vec<ParticipationRequest>> {
        let mut seen = HashSet::new();
        let ordered: Vec<RequestId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut found: HashMap<RequestId, ParticipationRequest> = self
            .store
            .list_requests(&RequestFilter::for_event(event_id).with_ids(ordered.clone()))?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        ordered
            .into_iter()
            .map(|id| {
                found.remove(&id).ok_or_else(|| {
                    DomainError::not_found(format!(
                        "request {} of event {} does not exist",
                        id, event_id
                    ))
                })
            })
            .collect()
    }
}

/// Unlimited capacity makes moderation moot: such requests are confirmed outright
fn initial_status(event: &Event) -> RequestStatus {
    if event.is_unlimited() || !event.request_moderation {
        RequestStatus::Confirmed
    } else {
        RequestStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::Location;
    use crate::utils::time::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    const OWNER: UserId = 1;

    struct Fixture {
        store: Arc<InMemoryStore>,
        locks: Arc<EventLocks>,
        engine: CapacityAdmissionEngine,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()));
        let locks = Arc::new(EventLocks::new());
        let engine = CapacityAdmissionEngine::new(store.clone(), clock, locks.clone());
        Fixture { store, locks, engine }
    }

    fn published_event(store: &InMemoryStore, limit: u32, moderation: bool) -> Event {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        store
            .insert_event(Event {
                id: 0,
                title: "Workshop".to_string(),
                annotation: "Hands-on workshop".to_string(),
                description: "Laptops required".to_string(),
                category: 1,
                location: Location::default(),
                paid: false,
                event_date: at + Duration::days(7),
                participant_limit: limit,
                request_moderation: moderation,
                initiator: OWNER,
                state: EventState::Published,
                created_on: at,
                published_on: Some(at),
            })
            .unwrap()
    }

    #[test]
    fn test_join_unlimited_event_is_confirmed_despite_moderation() {
        let f = fixture();
        let event = published_event(&f.store, 0, true);

        let request = f.engine.request_to_join(2, event.id).unwrap();
        assert_eq!(request.status, RequestStatus::Confirmed);

        let stored = f.store.find_request(request.id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Confirmed);
    }

    #[test]
    fn test_join_moderated_event_is_pending() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);

        let request = f.engine.request_to_join(2, event.id).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[test]
    fn test_join_unmoderated_event_is_confirmed() {
        let f = fixture();
        let event = published_event(&f.store, 5, false);

        let request = f.engine.request_to_join(2, event.id).unwrap();
        assert_eq!(request.status, RequestStatus::Confirmed);
    }

    #[test]
    fn test_initiator_cannot_join() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);

        let err = f.engine.request_to_join(OWNER, event.id).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn test_duplicate_join_conflicts_until_canceled() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);

        let first = f.engine.request_to_join(2, event.id).unwrap();
        assert!(matches!(
            f.engine.request_to_join(2, event.id),
            Err(DomainError::Conflict(_))
        ));

        f.engine.cancel_request(2, first.id).unwrap();
        let again = f.engine.request_to_join(2, event.id).unwrap();
        assert_ne!(again.id, first.id);
    }

    #[test]
    fn test_join_full_event_conflicts() {
        let f = fixture();
        let event = published_event(&f.store, 1, false);

        f.engine.request_to_join(2, event.id).unwrap();
        let err = f.engine.request_to_join(3, event.id).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn test_join_unknown_event_not_found() {
        let f = fixture();
        assert!(matches!(
            f.engine.request_to_join(2, 99),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_events_leave_no_locks_behind() {
        let f = fixture();
        for event_id in 1_000_000..1_010_000 {
            assert!(matches!(
                f.engine.request_to_join(2, event_id),
                Err(DomainError::NotFound(_))
            ));
        }
        assert!(matches!(
            f.engine.bulk_update_status(OWNER, 1_000_000, &[1], RequestStatus::Confirmed),
            Err(DomainError::NotFound(_))
        ));
        assert_eq!(f.locks.tracked(), 0);

        let event = published_event(&f.store, 2, true);
        f.engine.request_to_join(2, event.id).unwrap();
        assert_eq!(f.locks.tracked(), 0);
    }

    #[test]
    fn test_cancel_foreign_request_not_found() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);
        let request = f.engine.request_to_join(2, event.id).unwrap();

        assert!(matches!(
            f.engine.cancel_request(3, request.id),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_cancel_twice_is_validation_error() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);
        let request = f.engine.request_to_join(2, event.id).unwrap();

        let canceled = f.engine.cancel_request(2, request.id).unwrap();
        assert_eq!(canceled.status, RequestStatus::Canceled);
        assert!(matches!(
            f.engine.cancel_request(2, request.id),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_bulk_requires_moderation_and_limit() {
        let f = fixture();
        let unlimited = published_event(&f.store, 0, true);
        let unmoderated = published_event(&f.store, 3, false);

        for event in [unlimited, unmoderated] {
            let err = f
                .engine
                .bulk_update_status(OWNER, event.id, &[], RequestStatus::Confirmed)
                .unwrap_err();
            assert!(matches!(err, DomainError::Conflict(_)));
        }
    }

    #[test]
    fn test_bulk_by_non_owner_not_found() {
        let f = fixture();
        let event = published_event(&f.store, 2, true);

        assert!(matches!(
            f.engine.bulk_update_status(9, event.id, &[], RequestStatus::Confirmed),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_bulk_rejects_pending_target() {
        let f = fixture();
        let event = published_event(&f.store, 2, true);

        assert!(matches!(
            f.engine.bulk_update_status(OWNER, event.id, &[], RequestStatus::Pending),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_bulk_unknown_request_id_not_found_and_nothing_written() {
        let f = fixture();
        let event = published_event(&f.store, 2, true);
        let r1 = f.engine.request_to_join(2, event.id).unwrap();

        let err = f
            .engine
            .bulk_update_status(OWNER, event.id, &[r1.id, 404], RequestStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(
            f.store.find_request(r1.id).unwrap().unwrap().status,
            RequestStatus::Pending
        );
    }

    #[test]
    fn test_bulk_request_from_other_event_not_found() {
        let f = fixture();
        let event = published_event(&f.store, 2, true);
        let other = published_event(&f.store, 2, true);
        let foreign = f.engine.request_to_join(2, other.id).unwrap();

        assert!(matches!(
            f.engine
                .bulk_update_status(OWNER, event.id, &[foreign.id], RequestStatus::Rejected),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_bulk_confirm_when_full_conflicts() {
        let f = fixture();
        let event = published_event(&f.store, 1, true);
        let r1 = f.engine.request_to_join(2, event.id).unwrap();
        let r2 = f.engine.request_to_join(3, event.id).unwrap();
        f.engine
            .bulk_update_status(OWNER, event.id, &[r1.id], RequestStatus::Confirmed)
            .unwrap();

        let err = f
            .engine
            .bulk_update_status(OWNER, event.id, &[r2.id], RequestStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Rejection still works on a full event
        let result = f
            .engine
            .bulk_update_status(OWNER, event.id, &[r2.id], RequestStatus::Rejected)
            .unwrap();
        assert_eq!(result.rejected_requests.len(), 1);
    }

    #[test]
    fn test_bulk_duplicate_ids_collapse() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);
        let r1 = f.engine.request_to_join(2, event.id).unwrap();

        let result = f
            .engine
            .bulk_update_status(OWNER, event.id, &[r1.id, r1.id], RequestStatus::Confirmed)
            .unwrap();
        assert_eq!(result.confirmed_requests.len(), 1);
        assert!(result.rejected_requests.is_empty());
    }

    #[test]
    fn test_requests_for_event_is_owner_scoped() {
        let f = fixture();
        let event = published_event(&f.store, 5, true);
        f.engine.request_to_join(2, event.id).unwrap();
        f.engine.request_to_join(3, event.id).unwrap();

        assert_eq!(f.engine.requests_for_event(OWNER, event.id).unwrap().len(), 2);
        assert!(matches!(
            f.engine.requests_for_event(2, event.id),
            Err(DomainError::NotFound(_))
        ));
        assert_eq!(f.engine.requests_by_requester(3).unwrap().len(), 1);
    }
}
