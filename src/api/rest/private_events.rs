//! Initiator endpoints: own events and the requests on them

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::PaginationParams;
use crate::api::state::AppState;
use crate::error::DomainResult;
use crate::types::{
    EventFullDto, EventId, EventRequestStatusUpdateRequest, EventRequestStatusUpdateResult,
    EventShortDto, NewEvent, ParticipationRequestDto, UpdateEventUserRequest, UserId,
};

/// POST /users/:userId/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Json(draft): Json<NewEvent>,
) -> DomainResult<(StatusCode, Json<EventFullDto>)> {
    let event = state.lifecycle.create(user_id, draft)?;
    Ok((StatusCode::CREATED, Json(state.catalog.full_view(&event)?)))
}

/// GET /users/:userId/events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(params): Query<PaginationParams>,
) -> DomainResult<Json<Vec<EventShortDto>>> {
    Ok(Json(state.catalog.events_by_initiator(user_id, params.page())?))
}

/// GET /users/:userId/events/:eventId
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
) -> DomainResult<Json<EventFullDto>> {
    Ok(Json(state.catalog.event_by_initiator(user_id, event_id)?))
}

/// PATCH /users/:userId/events/:eventId
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
    Json(body): Json<UpdateEventUserRequest>,
) -> DomainResult<Json<EventFullDto>> {
    let outcome = state
        .lifecycle
        .apply_user_edit(user_id, event_id, &body.patch, body.state_action)?;
    Ok(Json(state.catalog.full_view(outcome.event())?))
}

/// GET /users/:userId/events/:eventId/requests
pub async fn list_event_requests(
    State(state): State<Arc<AppState>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
) -> DomainResult<Json<Vec<ParticipationRequestDto>>> {
    Ok(Json(state.admission.requests_for_event(user_id, event_id)?))
}

/// PATCH /users/:userId/events/:eventId/requests
pub async fn moderate_requests(
    State(state): State<Arc<AppState>>,
    Path((user_id, event_id)): Path<(UserId, EventId)>,
    Json(body): Json<EventRequestStatusUpdateRequest>,
) -> DomainResult<Json<EventRequestStatusUpdateResult>> {
    let result = state
        .admission
        .bulk_update_status(user_id, event_id, &body.request_ids, body.status)?;
    Ok(Json(result))
}
