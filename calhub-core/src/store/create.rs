//! Inserting new events.

use rusqlite::params;
use uuid::Uuid;

use super::{EventStore, commit_time, occurrence_columns};
use crate::calendar::StoredCalendar;
use crate::draft::EventDraft;
use crate::error::CalHubResult;
use crate::event::Event;

impl EventStore {
    /// Insert a draft into a stored calendar.
    ///
    /// Assigns a fresh id and stamps `modified` with the commit time.
    /// Returns the event exactly as persisted.
    pub fn insert(&self, calendar: StoredCalendar<'_>, draft: &EventDraft) -> CalHubResult<Event> {
        self.insert_with_id(calendar, Uuid::new_v4(), draft)
    }

    pub(crate) fn insert_with_id(
        &self,
        calendar: StoredCalendar<'_>,
        id: Uuid,
        draft: &EventDraft,
    ) -> CalHubResult<Event> {
        let mut conn = self.lock()?;
        let event = draft.to_event(id, commit_time());
        let (start_date, start_time, end_date, end_time) = occurrence_columns(&event.occurrence);

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO events (uid, cal, title, modified, description, location, url,
                                 start_date, start_time, end_date, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.id.to_string(),
                calendar.id(),
                event.title,
                event.modified,
                event.description,
                event.location,
                event.url,
                start_date,
                start_time,
                end_date,
                end_time,
            ],
        )?;
        tx.commit()?;

        tracing::debug!(calendar = calendar.id(), id = %event.id, "event inserted");
        Ok(event)
    }
}
