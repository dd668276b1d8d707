// src/relay/mod.rs
// =============================================================================
// The relay endpoints.
//
// Submodules:
// - cors: CORS header policies shared by all responses
// - upstream: forwarding helpers for pass-through relays
// - page: fetches arbitrary pages and converts them to UTF-8
// - oauth: GitHub device-flow (device code + access token)
// - github: scoped gists API relay and raw content relay
//
// Each relay is an axum handler. Relays keep no state between requests;
// AppState only holds configuration and pooled HTTP clients.
// =============================================================================

pub mod cors;
mod github;
mod oauth;
mod page;
mod upstream;

pub use github::{gists_api, raw_content};
pub use oauth::{access_token, device_code};
pub use page::fetch_page;

use crate::config::RelayConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;

/// Read-only data every handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    /// Client with browser-like headers and a guarded redirect policy
    pub page_client: Client,
    /// Client for the GitHub API, OAuth and raw content upstreams
    pub api_client: Client,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let page_client = page::page_client_builder()
            .build()
            .context("Failed to create page fetch client")?;
        let api_client = upstream::api_client_builder()
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self::with_clients(config, page_client, api_client))
    }

    pub fn with_clients(config: RelayConfig, page_client: Client, api_client: Client) -> Self {
        Self {
            config: Arc::new(config),
            page_client,
            api_client,
        }
    }
}

// Reads one query parameter from a raw query string
//
// Decoding never fails; a missing query or parameter gives None.
pub(crate) fn query_param(raw_query: Option<&str>, name: &str) -> Option<String> {
    let raw_query = raw_query?;
    url::form_urlencoded::parse(raw_query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_decodes() {
        let raw = Some("url=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&x=2");
        assert_eq!(query_param(raw, "url").as_deref(), Some("https://example.com/a?b=1"));
        assert_eq!(query_param(raw, "x").as_deref(), Some("2"));
        assert_eq!(query_param(raw, "missing"), None);
        assert_eq!(query_param(None, "url"), None);
    }
}
