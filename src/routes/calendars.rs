//! Calendar and event endpoints
//!
//! Every endpoint answers with an iCalendar document. Reads take the
//! calendar's read policy, everything else its write policy.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};
use calhub_core::{
    Action, CalHubError, CalHubResult, ConfiguredCalendar, Credentials, Event, EventDraft,
    EventStore, StoredCalendar, ics,
};
use uuid::Uuid;

use crate::credentials::RequestCredentials;
use crate::routes::AppError;
use crate::state::AppState;

const EVENT_ID_HEADER: HeaderName = HeaderName::from_static("x-eventid");

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{calendar}",
            get(list_events).put(create_event).delete(clear_events),
        )
        .route(
            "/{calendar}/{uid}",
            get(get_event).patch(update_event).delete(delete_event),
        )
}

/// GET /{calendar} - All events of a calendar
async fn list_events(
    State(state): State<AppState>,
    Path(calendar_id): Path<String>,
    RequestCredentials(credentials): RequestCredentials,
) -> Result<Response, AppError> {
    let calendar = authorize(&state, &calendar_id, Action::Read, &credentials)?;

    let target = calendar.clone();
    let events = with_store(&state, move |store| store.list(&target)).await?;

    document(calendar, events).await
}

/// GET /{calendar}/{uid} - A single event
async fn get_event(
    State(state): State<AppState>,
    Path((calendar_id, uid)): Path<(String, String)>,
    RequestCredentials(credentials): RequestCredentials,
) -> Result<Response, AppError> {
    let calendar = authorize(&state, &calendar_id, Action::Read, &credentials)?;
    let id = event_id(&uid)?;

    let target = calendar.clone();
    let event = with_store(&state, move |store| store.get(&target, id))
        .await?
        .ok_or(AppError::NotFound)?;

    document(calendar, vec![event]).await
}

/// PUT /{calendar} - Create an event
async fn create_event(
    State(state): State<AppState>,
    Path(calendar_id): Path<String>,
    RequestCredentials(credentials): RequestCredentials,
    body: String,
) -> Result<Response, AppError> {
    let calendar = authorize(&state, &calendar_id, Action::Write, &credentials)?;
    writable(&calendar)?;
    let draft = decode_draft(&body)?;

    let target = calendar.clone();
    let event = with_store(&state, move |store| store.insert(writable(&target)?, &draft)).await?;

    let id = event.id.to_string();
    let mut response = document(calendar, vec![event]).await?;
    let value = HeaderValue::from_str(&id).map_err(|e| AppError::Internal(e.into()))?;
    response.headers_mut().insert(EVENT_ID_HEADER, value);
    Ok(response)
}

/// PATCH /{calendar}/{uid} - Replace an event
async fn update_event(
    State(state): State<AppState>,
    Path((calendar_id, uid)): Path<(String, String)>,
    RequestCredentials(credentials): RequestCredentials,
    body: String,
) -> Result<Response, AppError> {
    let calendar = authorize(&state, &calendar_id, Action::Write, &credentials)?;
    let id = event_id(&uid)?;
    writable(&calendar)?;
    let draft = decode_draft(&body)?;

    let target = calendar.clone();
    let event =
        with_store(&state, move |store| store.update(writable(&target)?, id, &draft)).await?;

    document(calendar, vec![event]).await
}

/// DELETE /{calendar} - Remove every event of a calendar
async fn clear_events(
    State(state): State<AppState>,
    Path(calendar_id): Path<String>,
    RequestCredentials(credentials): RequestCredentials,
) -> Result<Response, AppError> {
    let calendar = authorize(&state, &calendar_id, Action::Write, &credentials)?;
    writable(&calendar)?;

    let target = calendar.clone();
    let removed = with_store(&state, move |store| store.clear(writable(&target)?)).await?;

    document(calendar, removed).await
}

/// DELETE /{calendar}/{uid} - Remove one event
async fn delete_event(
    State(state): State<AppState>,
    Path((calendar_id, uid)): Path<(String, String)>,
    RequestCredentials(credentials): RequestCredentials,
) -> Result<Response, AppError> {
    let calendar = authorize(&state, &calendar_id, Action::Write, &credentials)?;
    let id = event_id(&uid)?;
    writable(&calendar)?;

    let target = calendar.clone();
    let removed = with_store(&state, move |store| store.delete(writable(&target)?, id))
        .await?
        .ok_or(AppError::NotFound)?;

    document(calendar, vec![removed]).await
}

/// Resolve a calendar and check the login for `action`.
fn authorize(
    state: &AppState,
    calendar_id: &str,
    action: Action,
    credentials: &Credentials,
) -> Result<ConfiguredCalendar, AppError> {
    let calendar = state
        .registry
        .resolve(calendar_id)
        .ok_or_else(|| CalHubError::CalendarNotFound(calendar_id.to_string()))?;

    if !state.gate.evaluate(calendar, action, credentials).is_allowed() {
        return Err(AppError::Unauthorized);
    }
    Ok(calendar.clone())
}

fn writable(calendar: &ConfiguredCalendar) -> CalHubResult<StoredCalendar<'_>> {
    calendar
        .as_stored()
        .ok_or_else(|| CalHubError::NotWritable(calendar.id.clone()))
}

/// Malformed ids can never match an event
fn event_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

fn decode_draft(body: &str) -> Result<EventDraft, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("No content".into()));
    }
    Ok(EventDraft::from_json(body)?)
}

/// Run a store operation on the blocking pool.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    F: FnOnce(&EventStore) -> CalHubResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    Ok(tokio::task::spawn_blocking(move || op(&store)).await??)
}

/// Render the events as a response on the blocking pool.
async fn document(calendar: ConfiguredCalendar, events: Vec<Event>) -> Result<Response, AppError> {
    let body = tokio::task::spawn_blocking(move || ics::synthesize(&calendar, &events)).await?;
    Ok(([(header::CONTENT_TYPE, ics::CONTENT_TYPE)], body).into_response())
}
