//! Participation requests and the moderation payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, RequestId, UserId};
use crate::utils::time::wire_format;

/// Lifecycle status of a participation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

impl RequestStatus {
    /// Statuses the requester can no longer cancel from
    pub fn is_closed(self) -> bool {
        matches!(self, RequestStatus::Canceled | RequestStatus::Rejected)
    }
}

/// Stored participation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationRequest {
    pub id: RequestId,
    pub event: EventId,
    pub requester: UserId,
    pub status: RequestStatus,
    #[serde(with = "wire_format")]
    pub created: DateTime<Utc>,
}

impl ParticipationRequest {
    /// A request not yet assigned an id by the store
    pub fn new(event: EventId, requester: UserId, status: RequestStatus, created: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            event,
            requester,
            status,
            created,
        }
    }
}

/// Public representation of a participation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRequestDto {
    pub id: RequestId,
    #[serde(with = "wire_format")]
    pub created: DateTime<Utc>,
    pub event: EventId,
    pub requester: UserId,
    pub status: RequestStatus,
}

/// Owner's bulk moderation decision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestStatusUpdateRequest {
    pub request_ids: Vec<RequestId>,
    pub status: RequestStatus,
}

/// Outcome of a bulk moderation decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestStatusUpdateResult {
    pub confirmed_requests: Vec<ParticipationRequestDto>,
    pub rejected_requests: Vec<ParticipationRequestDto>,
}
