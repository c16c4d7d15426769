//! Search parameters for event queries

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::types::{CategoryId, EventState, UserId};

/// Default page size of every listing
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// `from`/`size` paging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub from: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            from: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(from: usize, size: usize) -> Self {
        Self { from, size }
    }

    /// First item of the page; `from` is rounded down to a page boundary
    pub fn offset(&self) -> usize {
        self.from.checked_div(self.size).unwrap_or(0) * self.size
    }

    /// Cut `items` down to this page
    pub fn slice<T>(&self, items: Vec<T>) -> DomainResult<Vec<T>> {
        if self.size == 0 {
            return Err(DomainError::validation("size", "page size must be positive"));
        }
        Ok(items.into_iter().skip(self.offset()).take(self.size).collect())
    }
}

/// Ordering of public search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSort {
    EventDate,
    Views,
}

impl FromStr for EventSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EVENT_DATE" => Ok(EventSort::EventDate),
            "VIEWS" => Ok(EventSort::Views),
            other => Err(format!("unknown sort {}", other)),
        }
    }
}

/// Public search over published events
#[derive(Debug, Clone, Default)]
pub struct PublicSearchParams {
    /// Case-insensitive substring of annotation or description
    pub text: Option<String>,
    pub categories: Option<Vec<CategoryId>>,
    pub paid: Option<bool>,
    /// Exclusive; defaults to now
    pub range_start: Option<DateTime<Utc>>,
    /// Exclusive
    pub range_end: Option<DateTime<Utc>>,
    /// Only events that still have free places
    pub only_available: bool,
    pub sort: Option<EventSort>,
    pub page: PageRequest,
}

/// Administrator search over all events
#[derive(Debug, Clone, Default)]
pub struct AdminSearchParams {
    pub users: Option<Vec<UserId>>,
    pub states: Option<Vec<EventState>>,
    pub categories: Option<Vec<CategoryId>>,
    /// Inclusive
    pub range_start: Option<DateTime<Utc>>,
    /// Inclusive
    pub range_end: Option<DateTime<Utc>>,
    pub page: PageRequest,
}
