//! Usage statistics: hit recording and view counting

mod aggregator;
mod recorder;

use crate::types::EventId;

pub use aggregator::{ViewCountAggregator, PARALLEL_AGGREGATION_THRESHOLD};
pub use recorder::StatsRecorder;

/// Uri under which views of one event are recorded
pub fn event_uri(event_id: EventId) -> String {
    format!("/events/{}", event_id)
}

/// Uri of the public event listing
pub const EVENTS_URI: &str = "/events";
