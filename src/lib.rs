//! Event Admission
//!
//! Event participation admission control with capacity-aware moderation,
//! plus page-view statistics that decorate event listings.
//!
//! # Features
//!
//! - **Event lifecycle**: drafts, initiator edits, administrator review
//! - **Admission**: join, cancel and bulk moderation that never overshoots
//!   an event's participant limit
//! - **Per-event locking**: decisions on one event are serialized, different
//!   events never contend
//! - **Statistics**: hit recording and view counts, unique by ip on request
//! - **Durability**: optional JSONL journal behind the in-memory store
//!
//! # Modules
//!
//! - `types`: Events, participation requests, hits and their DTOs
//! - `store`: `EntityStore` seam, in-memory tables and the journal
//! - `lifecycle`: event state machine and timing rules
//! - `admission`: request state machine and bulk moderation
//! - `stats`: hit recording and view counting
//! - `catalog`: owner, administrator and public event queries
//! - `api`: axum router over the services
//! - `config`: environment configuration
//! - `utils`: clocks, wire timestamps, atomic file writes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use event_admission::{AppConfig, AppState, InMemoryStore, SystemClock};
//!
//! let state = AppState::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(SystemClock),
//!     AppConfig::default(),
//! );
//! let router = event_admission::api::create_router(Arc::new(state));
//! ```

pub mod admission;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mapper;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use admission::{CapacityAdmissionEngine, EventLocks};
pub use api::AppState;
pub use catalog::EventCatalog;
pub use config::AppConfig;
pub use error::{DomainError, DomainResult};
pub use lifecycle::{EditOutcome, EventLifecycleManager};
pub use stats::{StatsRecorder, ViewCountAggregator};
pub use store::{EntityStore, InMemoryStore, Journal, StoreError};
pub use utils::{Clock, ManualClock, SystemClock};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
