//! iCalendar (RFC 5545) output.
//!
//! Events are rendered with the `icalendar` crate; the VTIMEZONE block for
//! the calendar's zone is derived from the tz database.

mod generate;
mod timezone;

pub use generate::{CONTENT_TYPE, synthesize};
