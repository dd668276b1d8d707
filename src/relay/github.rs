// src/relay/github.rs
// =============================================================================
// Scoped access to GitHub content.
//
// /api/github?path=/gists/...
//   Forwards to the GitHub REST API, but only for paths under /gists. This
//   is an allowlist, not a general proxy: anything else is refused before a
//   request leaves the server. Method, Authorization, Accept, Content-Type
//   and (for non-GET/HEAD) the body are passed along.
//
// /api/raw?url=...
//   GET-only relay for raw file content. The URL's origin must be exactly
//   one of the configured raw content origins.
//
// Both relays pass the upstream status, content type and body straight back.
// =============================================================================

use crate::error::{ErrorStyle, RelayError};
use crate::relay::cors::{GITHUB_API, RAW_CONTENT};
use crate::relay::upstream::forward;
use crate::relay::{query_param, AppState};
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::Response;
use bytes::Bytes;
use tracing::{info, warn};
use url::Url;

/// Only paths under this prefix reach the GitHub API.
pub const GISTS_PREFIX: &str = "/gists";

const GITHUB_JSON: &str = "application/vnd.github+json";

pub async fn gists_api(
    State(state): State<AppState>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return GITHUB_API.preflight();
    }

    // A missing path becomes "" and fails the prefix check below
    let path = query_param(raw_query.as_deref(), "path").unwrap_or_default();
    let target = match scoped_api_url(&state.config.github_api_base, &path) {
        Ok(target) => target,
        Err(e) => {
            warn!(path = %path, "rejected API path");
            return e.render(&GITHUB_API, ErrorStyle::Plain);
        }
    };

    info!(method = %method, path = target.path(), "forwarding GitHub API request");
    let mut request = state.api_client.request(method.clone(), target);
    // GitHub's recommended media type unless the caller picked one
    request = request.header(
        header::ACCEPT,
        headers
            .get(header::ACCEPT)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(GITHUB_JSON)),
    );
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        request = request.header(header::AUTHORIZATION, auth.clone());
    }
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        request = request.header(header::CONTENT_TYPE, content_type.clone());
    }
    // GET and HEAD carry no body upstream
    if method != Method::GET && method != Method::HEAD {
        request = request.body(body);
    }

    forward(request, &GITHUB_API, ErrorStyle::Plain).await
}

pub async fn raw_content(
    State(state): State<AppState>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Response {
    if method == Method::OPTIONS {
        return RAW_CONTENT.preflight();
    }
    if method != Method::GET {
        return RelayError::MethodNotAllowed(method).render(&RAW_CONTENT, ErrorStyle::Plain);
    }

    let raw_url = query_param(raw_query.as_deref(), "url").unwrap_or_default();
    let target = match allowed_raw_url(&raw_url, &state.config.raw_origins) {
        Ok(target) => target,
        Err(e) => {
            warn!(url = %raw_url, "rejected raw content URL");
            return e.render(&RAW_CONTENT, ErrorStyle::Plain);
        }
    };

    info!(path = target.path(), "fetching raw content");
    let mut request = state.api_client.get(target);
    // Private repositories need the caller's token
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        request = request.header(header::AUTHORIZATION, auth.clone());
    }

    forward(request, &RAW_CONTENT, ErrorStyle::Plain).await
}

// Builds the upstream URL for a scoped API path
//
// The path is appended to the API base and the result is parsed, which
// resolves any `..` or `%2e%2e` segments. The *resolved* path must still be
// under /gists and the host must not change, so traversal tricks like
// "/gists/../user" are refused.
pub fn scoped_api_url(base: &Url, path: &str) -> Result<Url, RelayError> {
    let invalid = || RelayError::InvalidPath(format!("path must start with {}", GISTS_PREFIX));

    // Cheap first pass on the raw text
    if !path.starts_with(GISTS_PREFIX) {
        return Err(invalid());
    }

    // String concatenation, not Url::join: join would treat a leading '/'
    // as "replace the base path" and drop a base like http://host/api/v3
    let base_path = base.path().trim_end_matches('/');
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    let target = Url::parse(&joined).map_err(|_| invalid())?;

    // Second pass on the parsed result, after dot segments are resolved.
    // "/gists/../user" passes the first check but resolves to "/user".
    let scoped_prefix = format!("{}{}", base_path, GISTS_PREFIX);
    if target.origin() != base.origin() || !target.path().starts_with(&scoped_prefix) {
        return Err(invalid());
    }
    Ok(target)
}

// Parses `raw` and checks its origin against the allowlist
//
// Comparing whole origins (scheme://host[:port]) rather than a host suffix
// means "raw.githubusercontent.com.evil.com" and plain http never match.
pub fn allowed_raw_url(raw: &str, origins: &[String]) -> Result<Url, RelayError> {
    let invalid = || RelayError::InvalidUrl("url must point at an allowed raw content host".to_string());

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    let origin = url.origin().ascii_serialization();
    if origins.iter().any(|allowed| allowed == &origin) {
        Ok(url)
    } else {
        Err(invalid())
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why check the path twice in scoped_api_url?
//    - The raw string can hide traversal: "/gists/../user", "/gists/%2e%2e/user"
//    - Url::parse normalizes both to "/user", so only the parsed path tells
//      us where the request would really go
//    - The first check just rejects obvious garbage early
//
// 2. What is a URL "origin"?
//    - The (scheme, host, port) triple, e.g. https://raw.githubusercontent.com
//    - url::Url::origin() gives it, ascii_serialization() turns it into text
//
// 3. Why does the raw relay only take GET?
//    - It reads files; there is nothing to create or change upstream
// -----------------------------------------------------------------------------
