// src/server.rs
// =============================================================================
// Hosts the relays behind one axum HTTP server.
//
// Every relay route is registered with `any(...)`: the relay itself answers
// OPTIONS and rejects wrong methods, so those responses carry the relay's
// own CORS headers instead of axum's bare 405. Unknown paths get a JSON 404
// that also carries CORS headers.
// =============================================================================

use crate::config::RelayConfig;
use crate::relay::cors::PAGE_FETCH;
use crate::relay::{self, AppState};
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::Response;
use axum::routing::{any, get};
use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/api/fetch", any(relay::fetch_page))
        .route("/api/oauth/device-code", any(relay::device_code))
        .route("/api/oauth/access-token", any(relay::access_token))
        .route("/api/github", any(relay::gists_api))
        .route("/api/raw", any(relay::raw_content))
        .route("/healthz", get(healthz))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(middleware::map_response(ensure_allow_origin))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                // The URI path only; query strings may carry caller URLs
                info_span!("http", method = %req.method(), path = %req.uri().path())
            }),
        )
        .with_state(state)
}

async fn healthz() -> Response {
    PAGE_FETCH.json(StatusCode::OK, &json!({"status": "ok"}))
}

async fn not_found() -> Response {
    PAGE_FETCH.json(
        StatusCode::NOT_FOUND,
        &json!({"error": "not_found", "message": "No relay at this path"}),
    )
}

// Responses produced outside a relay (extractor rejections such as 413)
// still need Access-Control-Allow-Origin
async fn ensure_allow_origin(mut response: Response) -> Response {
    response
        .headers_mut()
        .entry(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .or_insert(HeaderValue::from_static("*"));
    response
}

// Runs the server until Ctrl-C
pub async fn serve(config: RelayConfig) -> Result<()> {
    let bind = config.bind;
    if config.oauth_client_secret.is_none() {
        info!("GITHUB_CLIENT_SECRET not set; access token relay will answer server_misconfigured");
    }

    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("edge-relay listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("edge-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::test_support::{call, config_for, json_body, state_for};
    use axum::body::Body;
    use axum::http::{Method, Request};

    fn state() -> AppState {
        state_for(config_for("127.0.0.1:9".parse().unwrap()))
    }

    #[tokio::test]
    async fn test_healthz() {
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let (status, headers, body) = call(state(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(json_body(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn test_every_relay_answers_preflight_with_cors() {
        for uri in [
            "/api/fetch",
            "/api/oauth/device-code",
            "/api/oauth/access-token",
            "/api/github",
            "/api/raw",
        ] {
            let request = Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, headers, body) = call(state(), request).await;
            assert_eq!(status, StatusCode::NO_CONTENT, "{}", uri);
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*", "{}", uri);
            assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS), "{}", uri);
            assert!(body.is_empty(), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_oversized_body_still_has_cors() {
        let mut config = config_for("127.0.0.1:9".parse().unwrap());
        config.max_body_bytes = 16;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/oauth/device-code")
            .body(Body::from(vec![b'x'; 1024]))
            .unwrap();
        let (status, headers, _) = call(state_for(config), request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::builder().uri("/api/nope").body(Body::empty()).unwrap();
        let (status, headers, body) = call(state(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(json_body(&body)["error"], "not_found");
    }
}
