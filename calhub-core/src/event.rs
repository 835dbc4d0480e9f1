//! Event types.
//!
//! An [`Event`] is what the store hands back: every field is materialized,
//! including the server-assigned `id` and `modified` stamp. An
//! [`EventDraft`](crate::draft::EventDraft) is what clients submit.

use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

/// A persisted calendar event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    /// Commit time of the last create/update (DTSTAMP)
    pub modified: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub occurrence: Occurrence,
}

/// When an event happens.
///
/// Timed events are absolute instants and get rendered in the calendar's
/// time zone. All-day events are plain dates with an inclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    AllDay {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl Occurrence {
    pub fn is_all_day(&self) -> bool {
        matches!(self, Occurrence::AllDay { .. })
    }

    /// The end date as written to DTEND (iCalendar's exclusive end).
    /// Returns None for timed events.
    pub fn exclusive_end_date(&self) -> Option<NaiveDate> {
        match self {
            Occurrence::AllDay { end, .. } => end.checked_add_days(Days::new(1)),
            Occurrence::Timed { .. } => None,
        }
    }
}
