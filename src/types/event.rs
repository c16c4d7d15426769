//! Event records, drafts, patches and their public representations

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, EventId, UserId};
use crate::utils::time::wire_format;

/// Review state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventState {
    Pending,
    Published,
    Canceled,
}

impl FromStr for EventState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EventState::Pending),
            "PUBLISHED" => Ok(EventState::Published),
            "CANCELED" => Ok(EventState::Canceled),
            other => Err(format!("unknown event state {}", other)),
        }
    }
}

/// Transition requested by the event's initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStateAction {
    SendToReview,
    CancelReview,
}

impl UserStateAction {
    /// State the event lands in
    pub fn target_state(self) -> EventState {
        match self {
            UserStateAction::SendToReview => EventState::Pending,
            UserStateAction::CancelReview => EventState::Canceled,
        }
    }
}

/// Transition requested by an administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminStateAction {
    PublishEvent,
    RejectEvent,
}

/// Venue coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// Stored event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub annotation: String,
    pub description: String,
    pub category: CategoryId,
    pub location: Location,
    pub paid: bool,
    #[serde(with = "wire_format")]
    pub event_date: DateTime<Utc>,
    /// Zero means unlimited
    pub participant_limit: u32,
    pub request_moderation: bool,
    pub initiator: UserId,
    pub state: EventState,
    #[serde(with = "wire_format")]
    pub created_on: DateTime<Utc>,
    #[serde(default, with = "wire_format::option", skip_serializing_if = "Option::is_none")]
    pub published_on: Option<DateTime<Utc>>,
}

impl Event {
    /// Build a pending, not yet stored event from a draft
    pub fn from_draft(initiator: UserId, draft: NewEvent, created_on: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            title: draft.title,
            annotation: draft.annotation,
            description: draft.description,
            category: draft.category,
            location: draft.location,
            paid: draft.paid,
            event_date: draft.event_date,
            participant_limit: draft.participant_limit,
            request_moderation: draft.request_moderation,
            initiator,
            state: EventState::Pending,
            created_on,
            published_on: None,
        }
    }

    /// True when the event has no participant cap
    pub fn is_unlimited(&self) -> bool {
        self.participant_limit == 0
    }
}

/// Payload for creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub annotation: String,
    pub description: String,
    pub category: CategoryId,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub paid: bool,
    #[serde(with = "wire_format")]
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub participant_limit: u32,
    #[serde(default = "default_moderation")]
    pub request_moderation: bool,
}

fn default_moderation() -> bool {
    true
}

/// Partial update: absent fields stay untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    #[serde(
        default,
        with = "wire_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_moderation: Option<bool>,
}

impl EventPatch {
    /// Apply present fields to `event`, returning whether anything changed.
    ///
    /// Blank strings count as absent. Timing rules for `event_date` are the
    /// caller's concern.
    pub fn apply_to(&self, event: &mut Event) -> bool {
        let mut changed = false;
        changed |= assign_text(&mut event.title, self.title.as_deref());
        changed |= assign_text(&mut event.annotation, self.annotation.as_deref());
        changed |= assign_text(&mut event.description, self.description.as_deref());
        changed |= assign(&mut event.category, self.category);
        changed |= assign(&mut event.location, self.location);
        changed |= assign(&mut event.paid, self.paid);
        changed |= assign(&mut event.event_date, self.event_date);
        changed |= assign(&mut event.participant_limit, self.participant_limit);
        changed |= assign(&mut event.request_moderation, self.request_moderation);
        changed
    }
}

fn assign<T: PartialEq>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) if *slot != value => {
            *slot = value;
            true
        }
        _ => false,
    }
}

fn assign_text(slot: &mut String, value: Option<&str>) -> bool {
    match value {
        Some(value) if !value.trim().is_empty() && slot != value => {
            *slot = value.to_string();
            true
        }
        _ => false,
    }
}

/// Body of an initiator's edit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventUserRequest {
    #[serde(flatten)]
    pub patch: EventPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_action: Option<UserStateAction>,
}

/// Body of an administrator's edit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventAdminRequest {
    #[serde(flatten)]
    pub patch: EventPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_action: Option<AdminStateAction>,
}

/// Full public representation of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFullDto {
    pub id: EventId,
    pub title: String,
    pub annotation: String,
    pub description: String,
    pub category: CategoryId,
    pub location: Location,
    pub paid: bool,
    #[serde(with = "wire_format")]
    pub event_date: DateTime<Utc>,
    pub participant_limit: u32,
    pub request_moderation: bool,
    pub initiator: UserId,
    pub state: EventState,
    #[serde(with = "wire_format")]
    pub created_on: DateTime<Utc>,
    #[serde(default, with = "wire_format::option")]
    pub published_on: Option<DateTime<Utc>>,
    pub confirmed_requests: u64,
    pub views: u64,
}

/// Listing representation of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventShortDto {
    pub id: EventId,
    pub title: String,
    pub annotation: String,
    pub category: CategoryId,
    #[serde(with = "wire_format")]
    pub event_date: DateTime<Utc>,
    pub initiator: UserId,
    pub paid: bool,
    pub confirmed_requests: u64,
    pub views: u64,
}
