//! Removing events.

use rusqlite::params;
use uuid::Uuid;

use super::EventStore;
use super::list::{select_all, select_one};
use crate::calendar::StoredCalendar;
use crate::error::CalHubResult;
use crate::event::Event;

impl EventStore {
    /// Remove one event from a stored calendar and return it.
    /// An id that is not in this partition is a no-op returning `None`.
    pub fn delete(&self, calendar: StoredCalendar<'_>, id: Uuid) -> CalHubResult<Option<Event>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing = select_one(&tx, &[calendar.id()], id)?;
        if existing.is_some() {
            tx.execute(
                "DELETE FROM events WHERE cal = ?1 AND uid = ?2",
                params![calendar.id(), id.to_string()],
            )?;
        }
        tx.commit()?;

        if existing.is_some() {
            tracing::debug!(calendar = calendar.id(), %id, "event deleted");
        }
        Ok(existing)
    }

    /// Remove every event of a stored calendar, returning what was removed.
    pub fn clear(&self, calendar: StoredCalendar<'_>) -> CalHubResult<Vec<Event>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let removed = select_all(&tx, &[calendar.id()])?;
        tx.execute("DELETE FROM events WHERE cal = ?1", params![calendar.id()])?;
        tx.commit()?;

        tracing::debug!(calendar = calendar.id(), count = removed.len(), "calendar cleared");
        Ok(removed)
    }
}
