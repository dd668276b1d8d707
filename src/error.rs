// src/error.rs
// =============================================================================
// Errors produced at the relay boundary.
//
// Every relay failure ends the invocation with one JSON response. Each
// variant knows its HTTP status and a stable machine-readable code:
//
//   validation        -> 400 (missing_url, invalid_url, invalid_path, ...)
//   security-blocked  -> 400 (blocked_url)
//   wrong method      -> 405 (method_not_allowed)
//   misconfiguration  -> 500 (server_misconfigured)
//   upstream failure  -> 502 (upstream_error)
//   transport failure -> 504 (upstream_unreachable)
//
// The OAuth relays render `{error, error_description}` like GitHub's own
// OAuth errors; all other relays render `{error, message}`.
// =============================================================================

use crate::relay::cors::CorsPolicy;
use crate::safety::BlockReason;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing required 'url' query parameter")]
    MissingUrl,

    #[error("URL is not allowed: {0}")]
    Blocked(BlockReason),

    #[error("{0}")]
    InvalidUrl(String),

    #[error("{0}")]
    InvalidPath(String),

    #[error("client_id is not allowed")]
    InvalidClient,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Method {0} is not allowed")]
    MethodNotAllowed(Method),

    #[error("{0}")]
    Misconfigured(&'static str),

    #[error("Upstream responded with HTTP {}", .0.as_u16())]
    UpstreamStatus(StatusCode),

    #[error("Upstream request failed: {0}")]
    UpstreamFailed(String),

    #[error("Could not reach upstream: {0}")]
    Transport(String),
}

/// Shape of the JSON error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStyle {
    /// `{"error": ..., "message": ...}`
    Plain,
    /// `{"error": ..., "error_description": ...}`
    OAuth,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl
            | RelayError::Blocked(_)
            | RelayError::InvalidUrl(_)
            | RelayError::InvalidPath(_)
            | RelayError::InvalidClient
            | RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::UpstreamStatus(_) | RelayError::UpstreamFailed(_) => StatusCode::BAD_GATEWAY,
            RelayError::Transport(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayError::MissingUrl => "missing_url",
            RelayError::Blocked(_) => "blocked_url",
            RelayError::InvalidUrl(_) => "invalid_url",
            RelayError::InvalidPath(_) => "invalid_path",
            RelayError::InvalidClient => "invalid_client",
            RelayError::InvalidRequest(_) => "invalid_request",
            RelayError::MethodNotAllowed(_) => "method_not_allowed",
            RelayError::Misconfigured(_) => "server_misconfigured",
            RelayError::UpstreamStatus(_) | RelayError::UpstreamFailed(_) => "upstream_error",
            RelayError::Transport(_) => "upstream_unreachable",
        }
    }

    // Sorts a reqwest failure into upstream (502) or transport (504)
    //
    // DNS, connect, timeout and body-read failures are transport problems.
    // Redirect rejections and request-building errors are upstream errors.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_redirect() {
            RelayError::UpstreamFailed("redirect rejected".to_string())
        } else if err.is_builder() {
            RelayError::UpstreamFailed("could not build upstream request".to_string())
        } else if err.is_timeout() {
            RelayError::Transport("request timed out".to_string())
        } else if err.is_connect() {
            RelayError::Transport("connection failed".to_string())
        } else {
            RelayError::Transport(err.to_string())
        }
    }

    // Renders the error as a JSON response carrying the relay's CORS headers
    pub fn render(self, policy: &CorsPolicy, style: ErrorStyle) -> Response {
        let detail_key = match style {
            ErrorStyle::Plain => "message",
            ErrorStyle::OAuth => "error_description",
        };
        let mut body = Map::new();
        body.insert("error".to_string(), json!(self.code()));
        body.insert(detail_key.to_string(), json!(self.to_string()));
        let body = Value::Object(body);

        let mut response = policy.json(self.status(), &body);
        if matches!(self, RelayError::MethodNotAllowed(_)) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(policy.allow_methods));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::cors::PAGE_FETCH;

    #[test]
    fn test_status_and_code() {
        let err = RelayError::UpstreamStatus(StatusCode::NOT_FOUND);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "upstream_error");
        assert!(err.to_string().contains("404"));

        assert_eq!(RelayError::Transport("x".into()).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(RelayError::Misconfigured("x").code(), "server_misconfigured");
        assert_eq!(RelayError::Blocked(BlockReason::Scheme).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oauth_style_body() {
        let resp = RelayError::InvalidClient.render(&PAGE_FETCH, ErrorStyle::OAuth);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "invalid_client");
        assert!(body["error_description"].is_string());
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let resp = RelayError::MethodNotAllowed(Method::PUT).render(&PAGE_FETCH, ErrorStyle::Plain);
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ALLOW], PAGE_FETCH.allow_methods);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
