//! Participant endpoints: join, list and cancel own requests

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::error::DomainResult;
use crate::types::{EventId, ParticipationRequestDto, RequestId, UserId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    pub event_id: EventId,
}

/// GET /users/:userId/requests
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> DomainResult<Json<Vec<ParticipationRequestDto>>> {
    Ok(Json(state.admission.requests_by_requester(user_id)?))
}

/// POST /users/:userId/requests?eventId=
pub async fn join_event(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Query(params): Query<JoinParams>,
) -> DomainResult<(StatusCode, Json<ParticipationRequestDto>)> {
    let request = state.admission.request_to_join(user_id, params.event_id)?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// PATCH /users/:userId/requests/:requestId/cancel
pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path((user_id, request_id)): Path<(UserId, RequestId)>,
) -> DomainResult<Json<ParticipationRequestDto>> {
    Ok(Json(state.admission.cancel_request(user_id, request_id)?))
}
