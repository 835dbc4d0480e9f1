//! Error types for calhub.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in calhub operations.
#[derive(Error, Debug)]
pub enum CalHubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Time zone not available for iCal use: {0}")]
    UnknownTimezone(String),

    #[error("Duplicate calendar: {0}")]
    DuplicateCalendar(String),

    #[error("Invalid calendar reference in config file: {0}")]
    UnknownCalendarReference(String),

    #[error("Reference to virtual calendar in config file: {0}")]
    VirtualCalendarReference(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Calendar '{0}' does not accept writes")]
    NotWritable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt event row: {0}")]
    CorruptRow(String),

    #[error("Event store lock poisoned")]
    LockPoisoned,
}

/// Result type alias for calhub operations.
pub type CalHubResult<T> = Result<T, CalHubError>;
