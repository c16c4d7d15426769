//! HTTP rendering of domain errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Error body: `{"error": message, "code": CODE}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Status code for each error kind
pub fn status_of(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        match &self {
            DomainError::Storage(source) => {
                tracing::error!(error = %source, "storage failure");
            }
            DomainError::Conflict(message) => {
                tracing::warn!(%message, "request refused");
            }
            _ => {
                tracing::debug!(status = %status, error = %self, "client error");
            }
        }

        // Storage details stay in the log
        let message = match &self {
            DomainError::Storage(_) => "internal storage failure".to_string(),
            other => other.to_string(),
        };
        (status, Json(ApiError::new(message, self.code()))).into_response()
    }
}
