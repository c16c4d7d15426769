//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rest::{admin, private_events, public, requests, stats};
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Initiator
        .route(
            "/users/:user_id/events",
            post(private_events::create_event).get(private_events::list_events),
        )
        .route(
            "/users/:user_id/events/:event_id",
            get(private_events::get_event).patch(private_events::update_event),
        )
        .route(
            "/users/:user_id/events/:event_id/requests",
            get(private_events::list_event_requests).patch(private_events::moderate_requests),
        )
        // Participant
        .route(
            "/users/:user_id/requests",
            get(requests::list_requests).post(requests::join_event),
        )
        .route(
            "/users/:user_id/requests/:request_id/cancel",
            patch(requests::cancel_request),
        )
        // Administrator
        .route("/admin/events", get(admin::search_events))
        .route("/admin/events/:event_id", patch(admin::update_event))
        // Public
        .route("/events", get(public::search_events))
        .route("/events/:event_id", get(public::get_event))
        // Statistics
        .route("/hit", post(stats::save_hit))
        .route("/stats", get(stats::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
