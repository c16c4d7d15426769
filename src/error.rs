//! Error taxonomy shared by the lifecycle, admission, statistics and catalog services

use thiserror::Error;

use crate::store::StoreError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Failures surfaced to callers.
///
/// `NotFound`, `Conflict` and `Validation` are caller-recoverable and never
/// retried here. `Storage` carries the store failure unmodified.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        DomainError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DomainError::Conflict(message.into())
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::Validation { .. } => "BAD_REQUEST",
            DomainError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}
