//! Public endpoints; every call is recorded as a hit

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use super::{client_ip, default_size, parse_list, parse_time};
use crate::api::state::AppState;
use crate::catalog::{EventSort, PageRequest, PublicSearchParams};
use crate::error::{DomainError, DomainResult};
use crate::types::{EventFullDto, EventId, EventShortDto};

/// Raw query of `GET /events`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSearchQuery {
    pub text: Option<String>,
    pub categories: Option<String>,
    pub paid: Option<bool>,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
    #[serde(default)]
    pub only_available: bool,
    pub sort: Option<String>,
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_size")]
    pub size: usize,
}

impl PublicSearchQuery {
    pub fn into_params(self) -> DomainResult<PublicSearchParams> {
        let sort = match self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<EventSort>()
                    .map_err(|e| DomainError::validation("sort", e))?,
            ),
            None => None,
        };

        Ok(PublicSearchParams {
            text: self.text,
            categories: parse_list(self.categories.as_deref(), "categories")?,
            paid: self.paid,
            range_start: parse_time(self.range_start.as_deref(), "rangeStart")?,
            range_end: parse_time(self.range_end.as_deref(), "rangeEnd")?,
            only_available: self.only_available,
            sort,
            page: PageRequest::new(self.from, self.size),
        })
    }
}

/// GET /events
pub async fn search_events(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<PublicSearchQuery>,
) -> DomainResult<Json<Vec<EventShortDto>>> {
    let params = query.into_params()?;
    let ip = client_ip(&headers, peer.as_ref());
    Ok(Json(state.catalog.search_public(&params, &ip)?))
}

/// GET /events/:id
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(event_id): Path<EventId>,
) -> DomainResult<Json<EventFullDto>> {
    let ip = client_ip(&headers, peer.as_ref());
    Ok(Json(state.catalog.published_event(event_id, &ip)?))
}
