// src/relay/cors.rs
// =============================================================================
// Cross-origin headers shared by every relay.
//
// The browser client calls the relays from another origin, so every response
// (success, error, preflight) needs Access-Control-Allow-Origin: *. Each
// relay also advertises its own allowed methods and request headers.
//
// A policy is a plain constant. Nothing mutates it at runtime; relays call
// `apply`, `preflight`, `json` or `respond` to build responses with it.
// =============================================================================

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

/// Preflight results may be cached by the browser for a day.
const MAX_AGE_SECS: &str = "86400";

/// CORS headers for one relay.
#[derive(Debug, Clone, Copy)]
pub struct CorsPolicy {
    pub allow_methods: &'static str,
    pub allow_headers: &'static str,
    /// Response headers the browser may read besides the safelisted ones
    pub expose_headers: Option<&'static str>,
}

pub const PAGE_FETCH: CorsPolicy = CorsPolicy {
    allow_methods: "GET, OPTIONS",
    allow_headers: "Content-Type",
    expose_headers: Some("X-Source-Charset, X-Source-Url"),
};

pub const OAUTH: CorsPolicy = CorsPolicy {
    allow_methods: "POST, OPTIONS",
    allow_headers: "Content-Type, Accept",
    expose_headers: None,
};

pub const GITHUB_API: CorsPolicy = CorsPolicy {
    allow_methods: "GET, POST, PATCH, DELETE, OPTIONS",
    allow_headers: "Authorization, Accept, Content-Type",
    expose_headers: None,
};

pub const RAW_CONTENT: CorsPolicy = CorsPolicy {
    allow_methods: "GET, OPTIONS",
    allow_headers: "Authorization",
    expose_headers: None,
};

impl CorsPolicy {
    // Writes this policy's headers into `headers`, replacing existing values
    pub fn apply(&self, headers: &mut HeaderMap) {
        // insert (not append): an upstream's own CORS headers must not survive
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(self.allow_methods),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(self.allow_headers),
        );
        // Without this the browser hides X-Source-* from page scripts
        if let Some(expose) = self.expose_headers {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(expose));
        }
    }

    // Builds a response with the given status, extra headers and body
    pub fn respond(&self, status: StatusCode, mut headers: HeaderMap, body: impl Into<Body>) -> Response {
        self.apply(&mut headers);
        let mut response = Response::new(body.into());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    // Empty answer to an OPTIONS preflight
    pub fn preflight(&self) -> Response {
        let mut headers = HeaderMap::new();
        // Lets the browser skip repeat preflights for the same relay
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
        self.respond(StatusCode::NO_CONTENT, headers, Body::empty())
    }

    // Serializes `value` as a JSON body
    pub fn json<T: Serialize>(&self, status: StatusCode, value: &T) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // serde_json only fails on maps with non-string keys; our bodies never have them
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.respond(status, headers, body)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is a CORS preflight?
//    - Before a cross-origin POST with a JSON body (or any request with an
//      Authorization header) the browser first sends OPTIONS
//    - Our answer lists what is allowed; only then does the real request go out
//
// 2. Why `&'static str` fields and `const` policies?
//    - The values never change, so they live in the binary itself
//    - HeaderValue::from_static accepts them without any allocation or check
//      at runtime
//
// 3. Why `impl Into<Body>` in respond?
//    - Callers pass String, Vec<u8>, Bytes or Body::empty() directly
// -----------------------------------------------------------------------------
