//! Administrator endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{default_size, parse_list, parse_time};
use crate::api::state::AppState;
use crate::catalog::{AdminSearchParams, PageRequest};
use crate::error::DomainResult;
use crate::types::{EventFullDto, EventId, UpdateEventAdminRequest};

/// Raw query of `GET /admin/events`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSearchQuery {
    pub users: Option<String>,
    pub states: Option<String>,
    pub categories: Option<String>,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_size")]
    pub size: usize,
}

impl AdminSearchQuery {
    pub fn into_params(self) -> DomainResult<AdminSearchParams> {
        Ok(AdminSearchParams {
            users: parse_list(self.users.as_deref(), "users")?,
            states: parse_list(self.states.as_deref(), "states")?,
            categories: parse_list(self.categories.as_deref(), "categories")?,
            range_start: parse_time(self.range_start.as_deref(), "rangeStart")?,
            range_end: parse_time(self.range_end.as_deref(), "rangeEnd")?,
            page: PageRequest::new(self.from, self.size),
        })
    }
}

/// GET /admin/events
pub async fn search_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminSearchQuery>,
) -> DomainResult<Json<Vec<EventFullDto>>> {
    let params = query.into_params()?;
    Ok(Json(state.catalog.search_admin(&params)?))
}

/// PATCH /admin/events/:eventId
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<EventId>,
    Json(body): Json<UpdateEventAdminRequest>,
) -> DomainResult<Json<EventFullDto>> {
    let outcome = state
        .lifecycle
        .apply_admin_edit(event_id, &body.patch, body.state_action)?;
    Ok(Json(state.catalog.full_view(outcome.event())?))
}
