//! Utility functions and helpers
//!
//! Clocks, the wire timestamp format and atomic file replacement.

pub mod atomic;
pub mod time;

pub use time::{format_wire, parse_wire, Clock, ManualClock, SystemClock, WIRE_FORMAT};
