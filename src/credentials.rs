//! Login data carried by a request.
//!
//! Basic auth supplies user and password; the `pw` query parameter supplies
//! a token. Anything malformed is treated as absent.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use calhub_core::Credentials;

const TOKEN_PARAM: &str = "pw";

pub struct RequestCredentials(pub Credentials);

impl<S> FromRequestParts<S> for RequestCredentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let (user, password) = basic_auth(&parts.headers).unzip();
        Ok(RequestCredentials(Credentials {
            user,
            password,
            token: query_token(&parts.uri),
        }))
    }
}

fn basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn query_token(uri: &Uri) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove(TOKEN_PARAM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    async fn extract(request: Request<()>) -> Credentials {
        let (mut parts, _) = request.into_parts();
        let Ok(RequestCredentials(credentials)) =
            RequestCredentials::from_request_parts(&mut parts, &()).await;
        credentials
    }

    fn basic_header(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let request = Request::builder()
            .uri("/work")
            .header(AUTHORIZATION, basic_header("admin:s3:cret"))
            .body(())
            .unwrap();

        assert_eq!(extract(request).await, Credentials::basic("admin", "s3:cret"));
    }

    #[tokio::test]
    async fn test_scheme_is_case_insensitive() {
        let request = Request::builder()
            .uri("/work")
            .header(AUTHORIZATION, basic_header("admin:secret").replace("Basic", "BASIC"))
            .body(())
            .unwrap();

        assert_eq!(extract(request).await, Credentials::basic("admin", "secret"));
    }

    #[tokio::test]
    async fn test_query_token() {
        let request = Request::builder().uri("/work?pw=s3cret&x=1").body(()).unwrap();
        assert_eq!(extract(request).await, Credentials::token("s3cret"));
    }

    #[test]
    fn test_malformed_header_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!not-base64"));
        assert_eq!(basic_auth(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_str(&basic_header("nocolon")).unwrap());
        assert_eq!(basic_auth(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_auth(&headers), None);
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let request = Request::builder().uri("/work").body(()).unwrap();
        assert_eq!(extract(request).await, Credentials::default());
    }
}
