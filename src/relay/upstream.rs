// src/relay/upstream.rs
// =============================================================================
// Helpers for relays that forward a request and pass the answer through.
//
// The OAuth, gists and raw content relays are "pure forwards": whatever the
// upstream answers (status, content type, body) goes back to the caller
// unchanged, with the relay's CORS headers added. Only a failure to reach the
// upstream at all is turned into our own JSON error.
// =============================================================================

use crate::error::{ErrorStyle, RelayError};
use crate::relay::cors::CorsPolicy;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use tracing::error;

/// User-Agent sent to GitHub, which rejects requests without one.
pub const RELAY_USER_AGENT: &str = concat!("edge-relay/", env!("CARGO_PKG_VERSION"));

// Client settings for the GitHub relays
//
// No timeout is set: an upstream call runs until it finishes or the
// connection fails.
pub fn api_client_builder() -> ClientBuilder {
    Client::builder().user_agent(RELAY_USER_AGENT)
}

// Sends `request` and relays whatever comes back
pub async fn forward(request: RequestBuilder, policy: &CorsPolicy, style: ErrorStyle) -> Response {
    match request.send().await {
        Ok(response) => relay_response(response, policy, style).await,
        Err(e) => {
            error!(error = %e, "upstream request failed");
            RelayError::from_reqwest(&e).render(policy, style)
        }
    }
}

// Copies status, Content-Type and body of an upstream response
pub async fn relay_response(response: reqwest::Response, policy: &CorsPolicy, style: ErrorStyle) -> Response {
    let status = response.status();
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();

    match response.bytes().await {
        Ok(body) => {
            let mut headers = HeaderMap::new();
            if let Some(content_type) = content_type {
                headers.insert(header::CONTENT_TYPE, content_type);
            }
            policy.respond(status, headers, body)
        }
        Err(e) => {
            error!(error = %e, "reading upstream body failed");
            RelayError::from_reqwest(&e).render(policy, style)
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why read the whole body with .bytes()?
//    - Relayed bodies are small JSON documents or single files
//    - Buffering lets us turn a mid-body network error into a clean 504
//
// 2. Why clone the Content-Type header before reading the body?
//    - response.bytes() takes `response` by value
//    - After that call the headers are gone, so we copy what we need first
// -----------------------------------------------------------------------------
