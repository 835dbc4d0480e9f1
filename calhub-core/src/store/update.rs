//! Replacing existing events.

use rusqlite::params;
use uuid::Uuid;

use super::{EventStore, commit_time, occurrence_columns};
use crate::calendar::StoredCalendar;
use crate::draft::EventDraft;
use crate::error::{CalHubError, CalHubResult};
use crate::event::Event;

impl EventStore {
    /// Replace every field of an existing event and refresh its stamp.
    ///
    /// The event must live in exactly this calendar's partition, otherwise
    /// nothing is written and `EventNotFound` is returned.
    pub fn update(
        &self,
        calendar: StoredCalendar<'_>,
        id: Uuid,
        draft: &EventDraft,
    ) -> CalHubResult<Event> {
        let mut conn = self.lock()?;
        let event = draft.to_event(id, commit_time());
        let (start_date, start_time, end_date, end_time) = occurrence_columns(&event.occurrence);

        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE events SET
                title = ?1,
                modified = ?2,
                description = ?3,
                location = ?4,
                url = ?5,
                start_date = ?6,
                start_time = ?7,
                end_date = ?8,
                end_time = ?9
             WHERE cal = ?10 AND uid = ?11",
            params![
                event.title,
                event.modified,
                event.description,
                event.location,
                event.url,
                start_date,
                start_time,
                end_date,
                end_time,
                calendar.id(),
                event.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(CalHubError::EventNotFound(id));
        }
        tx.commit()?;

        tracing::debug!(calendar = calendar.id(), id = %event.id, "event updated");
        Ok(event)
    }
}
