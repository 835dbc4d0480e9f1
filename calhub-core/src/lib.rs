//! Core library for calhub.
//!
//! This crate holds everything except the HTTP surface:
//! - `calendar`: configured calendars and the registry that validates them
//! - `auth`: the per-calendar, per-action authentication gate
//! - `store`: the SQLite event store
//! - `ics`: iCalendar synthesis
//! - `config`: loading and resolving the configuration file

pub mod auth;
pub mod calendar;
pub mod config;
pub mod draft;
pub mod error;
pub mod event;
pub mod ics;
pub mod store;

pub use auth::{Action, Credentials, Decision, Gate, Policy};
pub use calendar::{CalendarKind, CalendarRegistry, ConfiguredCalendar, StoredCalendar};
pub use config::{AppConfig, DatabaseConfig, Settings};
pub use draft::EventDraft;
pub use error::{CalHubError, CalHubResult};
pub use event::{Event, Occurrence};
pub use store::EventStore;
