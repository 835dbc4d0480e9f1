//! Reading events from one or more partitions.

use rusqlite::{Connection, OptionalExtension, params_from_iter};
use uuid::Uuid;

use super::{EVENT_COLUMNS, EventRow, EventStore, placeholders};
use crate::calendar::ConfiguredCalendar;
use crate::error::CalHubResult;
use crate::event::Event;

impl EventStore {
    /// All events of the calendar's partitions, ordered by id.
    pub fn list(&self, calendar: &ConfiguredCalendar) -> CalHubResult<Vec<Event>> {
        let conn = self.lock()?;
        select_all(&conn, &calendar.stored_calendars())
    }

    /// One event, if it lives in one of the calendar's partitions.
    pub fn get(&self, calendar: &ConfiguredCalendar, id: Uuid) -> CalHubResult<Option<Event>> {
        let conn = self.lock()?;
        select_one(&conn, &calendar.stored_calendars(), id)
    }
}

pub(super) fn select_all(conn: &Connection, partitions: &[&str]) -> CalHubResult<Vec<Event>> {
    if partitions.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE cal IN ({}) ORDER BY uid ASC",
        placeholders(partitions.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(partitions), EventRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(EventRow::into_event).collect()
}

pub(super) fn select_one(
    conn: &Connection,
    partitions: &[&str],
    id: Uuid,
) -> CalHubResult<Option<Event>> {
    if partitions.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE uid = ? AND cal IN ({})",
        placeholders(partitions.len())
    );
    let uid = id.to_string();
    let params = std::iter::once(uid.as_str()).chain(partitions.iter().copied());

    let row = conn
        .query_row(&sql, params_from_iter(params), EventRow::from_row)
        .optional()?;

    row.map(EventRow::into_event).transpose()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use crate::calendar::ConfiguredCalendar;
    use crate::draft::EventDraft;
    use crate::event::Occurrence;
    use crate::store::EventStore;

    fn stored(id: &str) -> ConfiguredCalendar {
        ConfiguredCalendar::stored(id, "UTC", None, Some("open")).unwrap()
    }

    fn draft(title: &str) -> EventDraft {
        EventDraft::new(
            title,
            Occurrence::Timed {
                start: Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 3, 20, 16, 0, 0).unwrap(),
            },
        )
    }

    #[test]
    fn test_virtual_calendar_lists_union_in_id_order() {
        let store = EventStore::open_in_memory().unwrap();
        let a = stored("a");
        let b = stored("b");
        let c = stored("c");
        let team = ConfiguredCalendar::virtual_of("team", "UTC", ["a", "b"], Some("open")).unwrap();

        let mut expected = Vec::new();
        for (calendar, title) in [(&a, "a1"), (&b, "b1"), (&a, "a2"), (&b, "b2")] {
            expected.push(store.insert(calendar.as_stored().unwrap(), &draft(title)).unwrap());
        }
        let outsider = store.insert(c.as_stored().unwrap(), &draft("c1")).unwrap();
        expected.sort_by_key(|e| e.id);

        let listed = store.list(&team).unwrap();
        assert_eq!(listed, expected);
        assert!(!listed.iter().any(|e| e.id == outsider.id));
    }

    #[test]
    fn test_list_orders_by_id_not_insertion() {
        let store = EventStore::open_in_memory().unwrap();
        let calendar = stored("work");
        let e1 = Uuid::parse_str("10000000-0000-4000-8000-000000000000").unwrap();
        let e2 = Uuid::parse_str("20000000-0000-4000-8000-000000000000").unwrap();
        let e3 = Uuid::parse_str("30000000-0000-4000-8000-000000000000").unwrap();

        for id in [e2, e1, e3] {
            store
                .insert_with_id(calendar.as_stored().unwrap(), id, &draft("x"))
                .unwrap();
        }

        let ids: Vec<_> = store.list(&calendar).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![e1, e2, e3]);
    }

    #[test]
    fn test_get_is_restricted_to_partitions() {
        let store = EventStore::open_in_memory().unwrap();
        let a = stored("a");
        let b = stored("b");
        let only_b = ConfiguredCalendar::virtual_of("only-b", "UTC", ["b"], Some("open")).unwrap();
        let both = ConfiguredCalendar::virtual_of("both", "UTC", ["a", "b"], Some("open")).unwrap();

        let event = store.insert(a.as_stored().unwrap(), &draft("private")).unwrap();

        assert_eq!(store.get(&a, event.id).unwrap(), Some(event.clone()));
        assert_eq!(store.get(&both, event.id).unwrap(), Some(event.clone()));
        assert_eq!(store.get(&b, event.id).unwrap(), None);
        assert_eq!(store.get(&only_b, event.id).unwrap(), None);
        assert_eq!(store.get(&a, Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_virtual_calendar_without_sources_is_empty() {
        let store = EventStore::open_in_memory().unwrap();
        let a = stored("a");
        store.insert(a.as_stored().unwrap(), &draft("x")).unwrap();

        let empty =
            ConfiguredCalendar::virtual_of("none", "UTC", Vec::<String>::new(), None).unwrap();
        assert!(store.list(&empty).unwrap().is_empty());
        assert_eq!(store.get(&empty, Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn test_all_day_round_trips() {
        let store = EventStore::open_in_memory().unwrap();
        let calendar = stored("work");
        let occurrence = Occurrence::AllDay {
            start: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        };

        let inserted = store
            .insert(calendar.as_stored().unwrap(), &EventDraft::new("Trip", occurrence))
            .unwrap();
        let loaded = store.get(&calendar, inserted.id).unwrap().unwrap();

        assert_eq!(loaded.occurrence, occurrence);
    }
}
