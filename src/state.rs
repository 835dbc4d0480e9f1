use std::sync::Arc;

use calhub_core::{AppConfig, CalendarRegistry, EventStore, Gate};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CalendarRegistry>,
    pub gate: Arc<Gate>,
    pub store: Arc<EventStore>,
    /// Target of `GET /`
    pub redirect: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, store: EventStore) -> Self {
        AppState {
            registry: Arc::new(config.registry),
            gate: Arc::new(config.gate),
            store: Arc::new(store),
            redirect: config.redirect,
        }
    }
}
