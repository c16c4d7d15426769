//! Data types for the admission engine and statistics service
//!
//! This module contains all the core data structures used throughout the application.

mod event;
mod hit;
mod request;

pub use event::{
    AdminStateAction, Event, EventFullDto, EventPatch, EventShortDto, EventState, Location,
    NewEvent, UpdateEventAdminRequest, UpdateEventUserRequest, UserStateAction,
};
pub use hit::{Hit, NewHit, ViewStats};
pub use request::{
    EventRequestStatusUpdateRequest, EventRequestStatusUpdateResult, ParticipationRequest,
    ParticipationRequestDto, RequestStatus,
};

pub type EventId = u64;
pub type RequestId = u64;
pub type UserId = u64;
pub type CategoryId = u64;
pub type HitId = u64;
