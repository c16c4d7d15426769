//! Statistics endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{parse_list, require_time};
use crate::api::state::AppState;
use crate::error::DomainResult;
use crate::types::{Hit, NewHit, ViewStats};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub uris: Option<String>,
    #[serde(default)]
    pub unique: bool,
}

/// POST /hit
pub async fn save_hit(
    State(state): State<Arc<AppState>>,
    Json(hit): Json<NewHit>,
) -> DomainResult<(StatusCode, Json<Hit>)> {
    let hit = state.recorder.save_hit(hit)?;
    Ok((StatusCode::CREATED, Json(hit)))
}

/// GET /stats?start=&end=&uris=&unique=
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> DomainResult<Json<Vec<ViewStats>>> {
    let start = require_time(query.start.as_deref(), "start")?;
    let end = require_time(query.end.as_deref(), "end")?;
    let uris: Vec<String> = parse_list(query.uris.as_deref(), "uris")?.unwrap_or_default();

    Ok(Json(state.aggregator.stats(start, end, &uris, query.unique)?))
}
