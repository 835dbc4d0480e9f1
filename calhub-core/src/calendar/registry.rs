//! The validated set of configured calendars.

use std::collections::HashMap;

use crate::calendar::{CalendarKind, ConfiguredCalendar};
use crate::error::{CalHubError, CalHubResult};

/// Calendars by id, built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CalendarRegistry {
    calendars: HashMap<String, ConfiguredCalendar>,
}

impl CalendarRegistry {
    /// Build the registry, rejecting duplicate ids and virtual calendars whose
    /// sources are unknown or are themselves virtual.
    pub fn build(calendars: impl IntoIterator<Item = ConfiguredCalendar>) -> CalHubResult<Self> {
        let mut by_id = HashMap::new();
        for calendar in calendars {
            if by_id.contains_key(&calendar.id) {
                return Err(CalHubError::DuplicateCalendar(calendar.id));
            }
            by_id.insert(calendar.id.clone(), calendar);
        }

        for calendar in by_id.values() {
            for source in calendar.stored_calendars() {
                match by_id.get(source).map(|c| &c.kind) {
                    None => {
                        return Err(CalHubError::UnknownCalendarReference(source.to_string()));
                    }
                    Some(CalendarKind::Virtual { .. }) => {
                        return Err(CalHubError::VirtualCalendarReference(source.to_string()));
                    }
                    Some(CalendarKind::Stored) => {}
                }
            }
        }

        Ok(CalendarRegistry { calendars: by_id })
    }

    pub fn resolve(&self, id: &str) -> Option<&ConfiguredCalendar> {
        self.calendars.get(id)
    }

    /// All calendars, sorted by id
    pub fn calendars(&self) -> Vec<&ConfiguredCalendar> {
        let mut calendars: Vec<_> = self.calendars.values().collect();
        calendars.sort_by(|a, b| a.id.cmp(&b.id));
        calendars
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }
}
