//! Configured calendars.
//!
//! A calendar is either *stored* (it owns a partition of the events table,
//! keyed by its own id) or *virtual* (a read-only union of stored calendars).

mod registry;

pub use registry::CalendarRegistry;

use std::collections::BTreeSet;
use std::fmt;

use chrono_tz::Tz;

use crate::auth::{Action, Policy};
use crate::error::{CalHubError, CalHubResult};

pub const DEFAULT_TIMEZONE: &str = "UTC";

static NEVER: Policy = Policy::Never;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredCalendar {
    pub id: String,
    pub timezone: Tz,
    read_policy: Policy,
    write_policy: Policy,
    pub kind: CalendarKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarKind {
    Stored,
    /// Sorted, deduplicated ids of the stored calendars in the union
    Virtual { sources: Vec<String> },
}

impl ConfiguredCalendar {
    /// A calendar backed by its own partition.
    ///
    /// Writes default to "never"; reads default to the write policy.
    pub fn stored(
        id: &str,
        timezone: &str,
        login_read: Option<&str>,
        login_write: Option<&str>,
    ) -> CalHubResult<Self> {
        let write_policy = Policy::parse(login_write.unwrap_or(Policy::NEVER));
        let read_policy = login_read.map(Policy::parse).unwrap_or_else(|| write_policy.clone());

        Ok(ConfiguredCalendar {
            id: id.to_string(),
            timezone: parse_timezone(timezone)?,
            read_policy,
            write_policy,
            kind: CalendarKind::Stored,
        })
    }

    /// A read-only union of other stored calendars. Reads default to "never".
    pub fn virtual_of<I, S>(
        id: &str,
        timezone: &str,
        sources: I,
        login_read: Option<&str>,
    ) -> CalHubResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources: BTreeSet<String> = sources.into_iter().map(Into::into).collect();

        Ok(ConfiguredCalendar {
            id: id.to_string(),
            timezone: parse_timezone(timezone)?,
            read_policy: Policy::parse(login_read.unwrap_or(Policy::NEVER)),
            write_policy: Policy::Never,
            kind: CalendarKind::Virtual {
                sources: sources.into_iter().collect(),
            },
        })
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, CalendarKind::Virtual { .. })
    }

    /// The physical partitions this calendar reads from.
    pub fn stored_calendars(&self) -> Vec<&str> {
        match &self.kind {
            CalendarKind::Stored => vec![self.id.as_str()],
            CalendarKind::Virtual { sources } => sources.iter().map(String::as_str).collect(),
        }
    }

    /// Policy that guards `action` on this calendar.
    pub fn policy(&self, action: Action) -> &Policy {
        match (&self.kind, action) {
            (CalendarKind::Virtual { .. }, Action::Write) => &NEVER,
            (_, Action::Read) => &self.read_policy,
            (_, Action::Write) => &self.write_policy,
        }
    }

    /// Writable view of this calendar, if it is a stored one.
    pub fn as_stored(&self) -> Option<StoredCalendar<'_>> {
        match self.kind {
            CalendarKind::Stored => Some(StoredCalendar(self)),
            CalendarKind::Virtual { .. } => None,
        }
    }
}

impl fmt::Display for ConfiguredCalendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A calendar known to be stored, and therefore writable.
///
/// Only [`ConfiguredCalendar::as_stored`] hands these out, so a virtual
/// calendar can never reach the store's mutating operations.
#[derive(Debug, Clone, Copy)]
pub struct StoredCalendar<'a>(&'a ConfiguredCalendar);

impl<'a> StoredCalendar<'a> {
    /// Partition key of this calendar
    pub fn id(&self) -> &'a str {
        &self.0.id
    }
}

fn parse_timezone(name: &str) -> CalHubResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CalHubError::UnknownTimezone(name.to_string()))
}
