// src/relay/oauth.rs
// =============================================================================
// GitHub OAuth device flow relays.
//
// POST /api/oauth/device-code
//   The caller's JSON body must carry our one allowlisted client_id. If it
//   does, the body is forwarded byte for byte to GitHub's device code
//   endpoint and GitHub's answer is relayed back.
//
// POST /api/oauth/access-token
//   The caller polls with its device_code. We add the server-held
//   client_secret to the JSON body and forward it to GitHub's token
//   endpoint. The secret only ever travels server -> GitHub; it is never
//   put into a response or a log line.
//
// Errors use GitHub's OAuth error shape: {error, error_description}.
// =============================================================================

use crate::config::{ClientSecret, OAUTH_CLIENT_ID};
use crate::error::{ErrorStyle, RelayError};
use crate::relay::cors::OAUTH;
use crate::relay::upstream::forward;
use crate::relay::AppState;
use axum::extract::State;
use axum::http::{header, Method};
use axum::response::Response;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

pub async fn device_code(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if let Some(early) = preflight_or_reject(&method) {
        return early;
    }

    // Parse only to inspect client_id; the original bytes are what we forward
    let payload = match parse_object(&body) {
        Ok(payload) => payload,
        Err(e) => return e.render(&OAUTH, ErrorStyle::OAuth),
    };
    // Unknown clients never reach GitHub
    if !is_allowed_client(&payload) {
        warn!("device code request with unknown client_id");
        return RelayError::InvalidClient.render(&OAUTH, ErrorStyle::OAuth);
    }

    let endpoint = match state.config.device_code_url() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!(error = %e, "device code endpoint misconfigured");
            return RelayError::Misconfigured("OAuth endpoint is misconfigured").render(&OAUTH, ErrorStyle::OAuth);
        }
    };

    info!("requesting device code");
    // GitHub answers form-encoded unless asked for JSON
    let request = state
        .api_client
        .post(endpoint)
        .header(header::ACCEPT, "application/json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body);
    forward(request, &OAUTH, ErrorStyle::OAuth).await
}

pub async fn access_token(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if let Some(early) = preflight_or_reject(&method) {
        return early;
    }

    // The secret is checked before the body is even parsed: a server
    // without one can never complete a token exchange, so every caller gets
    // the same server_misconfigured answer regardless of what they sent
    let Some(secret) = state.config.oauth_client_secret.as_ref() else {
        error!("access token requested but no OAuth client secret is configured");
        return RelayError::Misconfigured("OAuth client secret is not configured")
            .render(&OAUTH, ErrorStyle::OAuth);
    };

    let payload = match parse_object(&body) {
        Ok(payload) => payload,
        Err(e) => return e.render(&OAUTH, ErrorStyle::OAuth),
    };

    let endpoint = match state.config.access_token_url() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!(error = %e, "access token endpoint misconfigured");
            return RelayError::Misconfigured("OAuth endpoint is misconfigured").render(&OAUTH, ErrorStyle::OAuth);
        }
    };

    // Log the event only; the body now holds the secret
    info!("polling for access token");
    let request = state
        .api_client
        .post(endpoint)
        .header(header::ACCEPT, "application/json")
        .json(&Value::Object(inject_client_secret(payload, secret)));
    forward(request, &OAUTH, ErrorStyle::OAuth).await
}

// Adds (or overwrites) `client_secret` in an outgoing token request body
//
// A caller-supplied client_secret is replaced, never trusted.
pub fn inject_client_secret(mut payload: Map<String, Value>, secret: &ClientSecret) -> Map<String, Value> {
    payload.insert(
        "client_secret".to_string(),
        Value::String(secret.expose().to_string()),
    );
    payload
}

// Some(response) when the request ends here: OPTIONS or a non-POST method
fn preflight_or_reject(method: &Method) -> Option<Response> {
    if method == Method::OPTIONS {
        Some(OAUTH.preflight())
    } else if method != Method::POST {
        Some(RelayError::MethodNotAllowed(method.clone()).render(&OAUTH, ErrorStyle::OAuth))
    } else {
        None
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, RelayError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RelayError::InvalidRequest("body must be a JSON object".to_string())),
        Err(e) => Err(RelayError::InvalidRequest(format!("body is not valid JSON: {}", e))),
    }
}

// A missing or non-string client_id counts as a mismatch
fn is_allowed_client(payload: &Map<String, Value>) -> bool {
    payload.get("client_id").and_then(Value::as_str) == Some(OAUTH_CLIENT_ID)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does device_code forward `body` and not `payload`?
//    - `body` is the exact bytes the caller sent
//    - Re-serializing `payload` could reorder keys or change number formats;
//      the device code relay promises a byte-for-byte forward
//    - Bytes is reference counted, so passing it to reqwest copies nothing
//
// 2. What does `let Some(secret) = ... else { ... };` do?
//    - It is "let-else": bind the value when the pattern matches, otherwise
//      run the else block, which must leave the function (here: return)
//    - It keeps the happy path unindented compared to a match
//
// 3. Why is ClientSecret a separate type instead of a String?
//    - Its Debug output is redacted, so `{:?}` on the config never leaks it
//    - The only way to read it is the explicit .expose() call in
//      inject_client_secret, which makes every use easy to find
// -----------------------------------------------------------------------------
