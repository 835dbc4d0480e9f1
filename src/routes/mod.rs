pub mod calendars;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use calhub_core::CalHubError;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application: every route, with trailing slashes trimmed.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let router = Router::new()
        .route("/", get(root))
        .merge(calendars::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// GET / - Redirect to the configured landing page
async fn root(State(state): State<AppState>) -> Response {
    match state.redirect {
        Some(target) => (StatusCode::FOUND, [(header::LOCATION, target)]).into_response(),
        None => AppError::NotFound.into_response(),
    }
}

/// Request failures, mapped onto plain-text responses
#[derive(Debug)]
pub enum AppError {
    /// Unknown calendar or login denied; the two are indistinguishable
    Unauthorized,
    NotFound,
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=login")],
                "Unauthorized",
            )
                .into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error").into_response()
            }
        }
    }
}

impl From<CalHubError> for AppError {
    fn from(err: CalHubError) -> Self {
        match err {
            CalHubError::CalendarNotFound(_) => AppError::Unauthorized,
            CalHubError::EventNotFound(_) => AppError::NotFound,
            CalHubError::InvalidEvent(_) | CalHubError::NotWritable(_) => {
                AppError::BadRequest(err.to_string())
            }
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use calhub_core::{EventStore, Settings};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state(redirect: Option<&str>) -> AppState {
        let mut toml = String::new();
        if let Some(target) = redirect {
            toml.push_str(&format!("redirect = \"{target}\"\n"));
        }
        toml.push_str("[database]\npath = \":memory:\"\n");
        let config = Settings::from_toml(&toml).unwrap().resolve().unwrap();
        AppState::new(config, EventStore::open_in_memory().unwrap())
    }

    async fn get(state: AppState, uri: &str) -> Response {
        app(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_redirects_when_configured() {
        let response = get(state(Some("https://example.org/")), "/").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "https://example.org/");
    }

    #[tokio::test]
    async fn test_root_without_redirect_is_not_found() {
        let response = get(state(None), "/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_calendar_is_unauthorized() {
        let response = get(state(None), "/nope").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=login"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Unauthorized");
    }

    #[test]
    fn test_error_mapping() {
        let status = |err: CalHubError| AppError::from(err).into_response().status();

        assert_eq!(
            status(CalHubError::CalendarNotFound("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(CalHubError::EventNotFound(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(CalHubError::InvalidEvent("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CalHubError::NotWritable("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CalHubError::LockPoisoned),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
