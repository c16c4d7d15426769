//! REST endpoints
//!
//! - `/users/:userId/events...` - initiator's events and their requests
//! - `/users/:userId/requests...` - participant's own requests
//! - `/admin/events...` - review and search
//! - `/events...` - public listing and detail
//! - `/hit`, `/stats` - usage statistics
//!
//! List-valued query parameters are comma separated (`?states=PENDING,PUBLISHED`).
//! Timestamps use the `yyyy-MM-dd HH:mm:ss` layout.

pub mod admin;
pub mod private_events;
pub mod public;
pub mod requests;
pub mod stats;

use std::net::SocketAddr;
use std::str::FromStr;

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::catalog::{PageRequest, DEFAULT_PAGE_SIZE};
use crate::error::{DomainError, DomainResult};
use crate::utils::time::parse_wire;

/// Common `from`/`size` query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_size")]
    pub size: usize,
}

pub(crate) fn default_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl PaginationParams {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.from, self.size)
    }
}

/// Address recorded on hits: first `X-Forwarded-For` entry, else the peer, else `0.0.0.0`
pub fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "0.0.0.0".to_string())
}

/// Parse a comma-separated list; absent or blank means "no filter"
pub fn parse_list<T: FromStr>(raw: Option<&str>, field: &'static str) -> DomainResult<Option<Vec<T>>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse()
                .map_err(|_| DomainError::validation(field, format!("cannot parse {:?}", item)))
        })
        .collect::<DomainResult<Vec<T>>>()
        .map(Some)
}

/// Parse an optional wire timestamp
pub fn parse_time(raw: Option<&str>, field: &'static str) -> DomainResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => parse_wire(raw)
            .map(Some)
            .map_err(|e| DomainError::validation(field, format!("{:?}: {}", raw, e))),
        None => Ok(None),
    }
}

/// Parse a mandatory wire timestamp
pub fn require_time(raw: Option<&str>, field: &'static str) -> DomainResult<DateTime<Utc>> {
    parse_time(raw, field)?.ok_or_else(|| DomainError::validation(field, "is required"))
}
