//! Decoding of submitted events.
//!
//! Clients send a JSON object:
//!
//! ```json
//! { "title": "Standup", "start": "2025-03-20T15:00:00Z", "end": "2025-03-20T15:15:00Z" }
//! { "title": "Holiday", "startDay": "2025-03-20", "endDay": "2025-03-21" }
//! ```
//!
//! Exactly one of the two pairs must be complete.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{CalHubError, CalHubResult};
use crate::event::{Event, Occurrence};

/// An event as submitted by a client, before the store assigns id and stamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    /// Client-supplied stamp; replaced with the commit time when stored
    pub modified: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub occurrence: Occurrence,
}

/// Wire shape of a submitted event
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraft {
    title: Option<String>,
    modified: Option<DateTime<Utc>>,
    description: Option<String>,
    location: Option<String>,
    url: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    start_day: Option<NaiveDate>,
    end_day: Option<NaiveDate>,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, occurrence: Occurrence) -> Self {
        EventDraft {
            title: title.into(),
            modified: Utc::now(),
            description: None,
            location: None,
            url: None,
            occurrence,
        }
    }

    /// Materialize the draft with server-assigned fields
    pub fn to_event(&self, id: Uuid, modified: DateTime<Utc>) -> Event {
        Event {
            id,
            title: self.title.clone(),
            modified,
            description: self.description.clone(),
            location: self.location.clone(),
            url: self.url.clone(),
            occurrence: self.occurrence,
        }
    }

    /// Decode a JSON request body
    pub fn from_json(body: &str) -> CalHubResult<Self> {
        let raw: RawDraft = serde_json::from_str(body)
            .map_err(|e| CalHubError::InvalidEvent(format!("invalid json: {e}")))?;
        raw.into_draft()
    }
}

impl RawDraft {
    fn into_draft(self) -> CalHubResult<EventDraft> {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CalHubError::InvalidEvent("missing title".into()))?;

        let occurrence = match (self.start, self.end, self.start_day, self.end_day) {
            (Some(_), Some(_), Some(_), Some(_)) => {
                return Err(CalHubError::InvalidEvent("ambiguous event".into()));
            }
            (Some(start), Some(end), _, _) => Occurrence::Timed { start, end },
            (_, _, Some(start), Some(end)) => Occurrence::AllDay { start, end },
            _ => return Err(CalHubError::InvalidEvent("missing start/end".into())),
        };

        Ok(EventDraft {
            title,
            modified: self.modified.unwrap_or_else(Utc::now),
            description: self.description,
            location: self.location,
            url: self.url,
            occurrence,
        })
    }
}
