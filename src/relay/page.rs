// src/relay/page.rs
// =============================================================================
// The page fetch relay: GET /api/fetch?url=...
//
// What happens for one request:
// 1. OPTIONS -> empty preflight answer, anything but GET -> 405
// 2. Read the `url` parameter, add http:// when it has no scheme
// 3. Run the SSRF guard; blocked URLs get 400 before any network traffic
// 4. GET the page with browser-like headers, following redirects (each
//    redirect target goes through the guard again)
// 5. Non-2xx upstream status -> 502, network failure -> 504
// 6. Resolve the charset, decode the body, answer 200 with UTF-8 HTML and
//    the X-Source-Charset / X-Source-Url diagnostic headers
//
// Rust concepts:
// - axum extractors (State, Method, RawQuery) pull data out of the request
// - reqwest redirect::Policy::custom lets us veto each redirect hop
// =============================================================================

use crate::charset;
use crate::error::{ErrorStyle, RelayError};
use crate::relay::cors::PAGE_FETCH;
use crate::relay::{query_param, AppState};
use crate::safety::{check_parsed, check_url, with_default_scheme, BlockReason, Verdict};
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;
use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, ClientBuilder};
use tracing::{info, warn};
use url::Url;

pub const SOURCE_CHARSET_HEADER: HeaderName = HeaderName::from_static("x-source-charset");
pub const SOURCE_URL_HEADER: HeaderName = HeaderName::from_static("x-source-url");

const MAX_REDIRECTS: usize = 10;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

// Client settings for page fetches
//
// Tests add `.resolve(...)` on top of this builder to point a public-looking
// hostname at a local stub server.
pub fn page_client_builder() -> ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );

    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .redirect(Policy::custom(guard_redirect))
}

// Decides whether to follow one redirect hop
fn guard_redirect(attempt: Attempt) -> reqwest::redirect::Action {
    if attempt.previous().len() >= MAX_REDIRECTS {
        return attempt.error("too many redirects");
    }
    match check_parsed(attempt.url()) {
        Verdict::Allowed => attempt.follow(),
        Verdict::Blocked(reason) => {
            warn!(target_url = %attempt.url(), %reason, "redirect target blocked");
            attempt.error(format!("redirect target blocked: {}", reason))
        }
    }
}

pub async fn fetch_page(
    State(state): State<AppState>,
    method: Method,
    RawQuery(raw_query): RawQuery,
) -> Response {
    if method == Method::OPTIONS {
        return PAGE_FETCH.preflight();
    }
    if method != Method::GET {
        return RelayError::MethodNotAllowed(method).render(&PAGE_FETCH, ErrorStyle::Plain);
    }

    match relay_page(&state.page_client, raw_query.as_deref()).await {
        Ok(response) => response,
        Err(e) => e.render(&PAGE_FETCH, ErrorStyle::Plain),
    }
}

async fn relay_page(client: &Client, raw_query: Option<&str>) -> Result<Response, RelayError> {
    let raw_url = query_param(raw_query, "url")
        .filter(|u| !u.trim().is_empty())
        .ok_or(RelayError::MissingUrl)?;

    let target = with_default_scheme(&raw_url);
    if let Verdict::Blocked(reason) = check_url(&target) {
        warn!(url = %target, %reason, "page fetch blocked");
        return Err(RelayError::Blocked(reason));
    }
    let target = Url::parse(&target).map_err(|_| RelayError::Blocked(BlockReason::Unparsable))?;

    info!(host = target.host_str().unwrap_or(""), "fetching page");
    let response = client.get(target).send().await.map_err(|e| {
        warn!(error = %e, "page fetch failed");
        RelayError::from_reqwest(&e)
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "upstream returned an error status");
        return Err(RelayError::UpstreamStatus(status));
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let body = response.bytes().await.map_err(|e| RelayError::from_reqwest(&e))?;

    let decoded = charset::decode_html(content_type.as_deref(), &body);
    if decoded.used_fallback {
        warn!(charset = %decoded.charset, "unsupported charset, decoded as utf-8");
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        SOURCE_CHARSET_HEADER,
        HeaderValue::from_str(&decoded.charset).unwrap_or_else(|_| HeaderValue::from_static("unknown")),
    );
    if let Ok(value) = HeaderValue::from_str(&final_url) {
        headers.insert(SOURCE_URL_HEADER, value);
    }

    Ok(PAGE_FETCH.respond(StatusCode::OK, headers, decoded.text))
}
