//! Event lifecycle
//!
//! ```text
//!            SEND_TO_REVIEW            PUBLISH_EVENT
//!  create ──► PENDING ◄──────── CANCELED    PENDING ──► PUBLISHED
//!                │                 ▲           │
//!                └─ CANCEL_REVIEW ─┘           └─ REJECT_EVENT ─► CANCELED
//! ```
//!
//! Initiators edit their own events until publication; administrators edit
//! and decide on pending events only.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::admission::EventLocks;
use crate::error::{DomainError, DomainResult};
use crate::store::EntityStore;
use crate::types::{AdminStateAction, Event, EventId, EventPatch, EventState, NewEvent, UserId, UserStateAction};
use crate::utils::time::{format_wire, Clock};

/// Minimum lead time of `eventDate` for drafts and initiator edits
pub const USER_LEAD_HOURS: i64 = 2;

/// Minimum lead time of `eventDate` for administrator edits and publication
pub const ADMIN_LEAD_HOURS: i64 = 1;

/// Result of an edit
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Something changed and the new state was persisted
    Updated(Event),
    /// The edit had no effect; carries the prior state, nothing was written
    Unchanged(Event),
}

impl EditOutcome {
    pub fn event(&self) -> &Event {
        match self {
            EditOutcome::Updated(event) | EditOutcome::Unchanged(event) => event,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            EditOutcome::Updated(event) | EditOutcome::Unchanged(event) => event,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, EditOutcome::Updated(_))
    }
}

/// Create, edit and review events
pub struct EventLifecycleManager {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<EventLocks>,
}

impl EventLifecycleManager {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, locks: Arc<EventLocks>) -> Self {
        Self { store, clock, locks }
    }

    /// Store a new pending event for `initiator`
    pub fn create(&self, initiator: UserId, draft: NewEvent) -> DomainResult<Event> {
        let now = self.clock.now();
        require_lead(draft.event_date, now, USER_LEAD_HOURS)?;

        let event = self
            .store
            .insert_event(Event::from_draft(initiator, draft, now))?;

        info!(event_id = event.id, initiator, "event created");
        Ok(event)
    }

    /// Edit by the event's initiator; allowed until the event is published
    pub fn apply_user_edit(
        &self,
        initiator: UserId,
        event_id: EventId,
        patch: &EventPatch,
        action: Option<UserStateAction>,
    ) -> DomainResult<EditOutcome> {
        self.locks
            .run(event_id, || self.user_edit(initiator, event_id, patch, action))
    }

    /// Edit and review decision by an administrator; pending events only
    pub fn apply_admin_edit(
        &self,
        event_id: EventId,
        patch: &EventPatch,
        action: Option<AdminStateAction>,
    ) -> DomainResult<EditOutcome> {
        self.locks.run(event_id, || self.admin_edit(event_id, patch, action))
    }

    fn user_edit(
        &self,
        initiator: UserId,
        event_id: EventId,
        patch: &EventPatch,
        action: Option<UserStateAction>,
    ) -> DomainResult<EditOutcome> {
        let prior = match self.store.find_event(event_id)? {
            Some(event) if event.initiator == initiator => event,
            _ => {
                return Err(DomainError::not_found(format!(
                    "event {} of user {} does not exist",
                    event_id, initiator
                )))
            }
        };
        if prior.state == EventState::Published {
            warn!(event_id, "edit of a published event refused");
            return Err(DomainError::conflict(format!(
                "event {} is published and can no longer be changed",
                event_id
            )));
        }
        if let Some(event_date) = patch.event_date {
            require_lead(event_date, self.clock.now(), USER_LEAD_HOURS)?;
        }

        let mut event = prior.clone();
        let mut changed = patch.apply_to(&mut event);
        if let Some(action) = action {
            changed |= transition(&mut event, action.target_state());
        }

        self.commit(prior, event, changed)
    }

    fn admin_edit(
        &self,
        event_id: EventId,
        patch: &EventPatch,
        action: Option<AdminStateAction>,
    ) -> DomainResult<EditOutcome> {
        let prior = self
            .store
            .find_event(event_id)?
            .ok_or_else(|| DomainError::not_found(format!("event {} does not exist", event_id)))?;
        if prior.state != EventState::Pending {
            return Err(DomainError::conflict(format!(
                "event {} is {:?}; only pending events can be reviewed",
                event_id, prior.state
            )));
        }

        let now = self.clock.now();
        if let Some(event_date) = patch.event_date {
            require_lead(event_date, now, ADMIN_LEAD_HOURS)?;
        }

        let mut event = prior.clone();
        let mut changed = patch.apply_to(&mut event);
        match action {
            Some(AdminStateAction::PublishEvent) => {
                require_lead(event.event_date, now, ADMIN_LEAD_HOURS)?;
                event.state = EventState::Published;
                event.published_on = Some(now);
                changed = true;
            }
            Some(AdminStateAction::RejectEvent) => {
                changed |= transition(&mut event, EventState::Canceled);
            }
            None => {}
        }

        self.commit(prior, event, changed)
    }

    fn commit(&self, prior: Event, event: Event, changed: bool) -> DomainResult<EditOutcome> {
        if !changed {
            debug!(event_id = prior.id, "edit changed nothing");
            return Ok(EditOutcome::Unchanged(prior));
        }

        self.store.update_event(&event)?;
        if prior.state != event.state {
            info!(event_id = event.id, from = ?prior.state, to = ?event.state, "event state changed");
        } else {
            info!(event_id = event.id, "event updated");
        }
        Ok(EditOutcome::Updated(event))
    }
}

fn transition(event: &mut Event, target: EventState) -> bool {
    if event.state == target {
        return false;
    }
    event.state = target;
    true
}

fn require_lead(event_date: DateTime<Utc>, now: DateTime<Utc>, hours: i64) -> DomainResult<()> {
    let earliest = now + Duration::hours(hours);
    if event_date < earliest {
        return Err(DomainError::validation(
            "eventDate",
            format!(
                "{} is earlier than {} ({}h from now)",
                format_wire(&event_date),
                format_wire(&earliest),
                hours
            ),
        ));
    }
    Ok(())
}
