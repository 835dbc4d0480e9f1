//! SQLite-backed event storage.
//!
//! All events live in one `events` table. The `cal` column is the partition
//! key: the id of the stored calendar an event belongs to. Reads take the set
//! of partitions a (possibly virtual) calendar resolves to; writes take a
//! single [`StoredCalendar`](crate::calendar::StoredCalendar).
//!
//! The store owns a single connection behind a mutex that is held for the
//! whole of every call, so operations execute one at a time. Every mutation
//! runs in its own transaction; an error drops the transaction, which rolls
//! it back.

mod create;
mod delete;
mod list;
mod update;

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveTime, SubsecRound, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{CalHubError, CalHubResult};
use crate::event::{Event, Occurrence};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS events (
        uid TEXT PRIMARY KEY,
        cal TEXT NOT NULL,
        title TEXT NOT NULL,
        modified TEXT NOT NULL,
        description TEXT,
        location TEXT,
        url TEXT,
        start_date TEXT NOT NULL,
        start_time TEXT,
        end_date TEXT NOT NULL,
        end_time TEXT,
        CHECK ((start_time IS NULL) = (end_time IS NULL))
    );
    CREATE INDEX IF NOT EXISTS events_cal ON events (cal);
";

/// Columns read back into an [`Event`], in [`EventRow::from_row`] order
const EVENT_COLUMNS: &str =
    "uid, title, modified, description, location, url, start_date, start_time, end_date, end_time";

pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    /// Open the configured database and make sure the events table exists.
    pub fn open(config: &DatabaseConfig) -> CalHubResult<Self> {
        let conn = Connection::open(&config.path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> CalHubResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> CalHubResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(EventStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> CalHubResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CalHubError::LockPoisoned)
    }

    #[cfg(test)]
    fn table_exists(&self, table_name: &str) -> bool {
        let Ok(conn) = self.lock() else {
            return false;
        };
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table_name],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false)
    }
}

/// Commit time for a mutation, at the precision the table keeps
fn commit_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// The date/time column quadruple for an occurrence.
/// Timed events are split in UTC; all-day events leave both times NULL.
fn occurrence_columns(
    occurrence: &Occurrence,
) -> (NaiveDate, Option<NaiveTime>, NaiveDate, Option<NaiveTime>) {
    match occurrence {
        Occurrence::Timed { start, end } => (
            start.date_naive(),
            Some(start.time()),
            end.date_naive(),
            Some(end.time()),
        ),
        Occurrence::AllDay { start, end } => (*start, None, *end, None),
    }
}

/// Raw column values of one row
struct EventRow {
    uid: String,
    title: String,
    modified: DateTime<Utc>,
    description: Option<String>,
    location: Option<String>,
    url: Option<String>,
    start_date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_date: NaiveDate,
    end_time: Option<NaiveTime>,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EventRow {
            uid: row.get(0)?,
            title: row.get(1)?,
            modified: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            url: row.get(5)?,
            start_date: row.get(6)?,
            start_time: row.get(7)?,
            end_date: row.get(8)?,
            end_time: row.get(9)?,
        })
    }

    fn into_event(self) -> CalHubResult<Event> {
        let id = Uuid::parse_str(&self.uid)
            .map_err(|e| CalHubError::CorruptRow(format!("uid '{}': {e}", self.uid)))?;

        let occurrence = match (self.start_time, self.end_time) {
            (Some(start_time), Some(end_time)) => Occurrence::Timed {
                start: self.start_date.and_time(start_time).and_utc(),
                end: self.end_date.and_time(end_time).and_utc(),
            },
            (None, None) => Occurrence::AllDay {
                start: self.start_date,
                end: self.end_date,
            },
            _ => {
                return Err(CalHubError::CorruptRow(format!(
                    "event {id} has only one of start_time/end_time"
                )));
            }
        };

        Ok(Event {
            id,
            title: self.title,
            modified: self.modified,
            description: self.description,
            location: self.location,
            url: self.url,
            occurrence,
        })
    }
}

/// `?, ?, ?` for an IN list
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
