//! HTTP API over the lifecycle, admission, catalog and statistics services

pub mod error;
pub mod http;
pub mod rest;
pub mod state;

pub use error::ApiError;
pub use http::create_router;
pub use state::AppState;
