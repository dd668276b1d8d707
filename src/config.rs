// src/config.rs
// =============================================================================
// Runtime configuration for the relay server.
//
// Configuration is read once at startup (CLI flags with environment variable
// fallbacks, see cli.rs) and then handed to every relay explicitly. Nothing
// here changes after startup.
//
// The OAuth client secret is the only sensitive value. It is wrapped in
// ClientSecret so it can't end up in logs through Debug formatting.
// =============================================================================

use crate::cli::ServeArgs;
use anyhow::{Context, Result};
use std::fmt;
use std::net::SocketAddr;
use url::Url;

/// The one OAuth app allowed to use the device-flow relay.
pub const OAUTH_CLIENT_ID: &str = "Ov23liGm3rYHnfVxqKpD";

/// Origins the raw content relay may fetch from.
pub const RAW_ORIGINS: &[&str] = &[
    "https://raw.githubusercontent.com",
    "https://gist.githubusercontent.com",
];

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_OAUTH_BASE: &str = "https://github.com";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server-held OAuth client secret.
#[derive(Clone)]
pub struct ClientSecret(String);

impl ClientSecret {
    // Empty values count as "not configured"
    pub fn from_env_value(value: Option<String>) -> Option<Self> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(ClientSecret)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub oauth_client_secret: Option<ClientSecret>,
    pub github_api_base: Url,
    pub oauth_base: Url,
    pub raw_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl RelayConfig {
    // Builds the configuration from parsed `serve` arguments
    //
    // Fails if one of the upstream base URLs is not a valid absolute URL.
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        let github_api_base = Url::parse(&args.github_api)
            .with_context(|| format!("Invalid GitHub API base URL '{}'", args.github_api))?;
        let oauth_base = Url::parse(&args.oauth_base)
            .with_context(|| format!("Invalid OAuth base URL '{}'", args.oauth_base))?;

        Ok(Self {
            bind: args.bind,
            oauth_client_secret: ClientSecret::from_env_value(args.client_secret.clone()),
            github_api_base,
            oauth_base,
            raw_origins: RAW_ORIGINS.iter().map(|o| o.to_string()).collect(),
            max_body_bytes: args.max_body_bytes,
        })
    }

    // Device-code endpoint of the OAuth provider
    pub fn device_code_url(&self) -> Result<Url> {
        self.oauth_base
            .join("/login/device/code")
            .context("Could not build device code URL")
    }

    // Access-token endpoint of the OAuth provider
    pub fn access_token_url(&self) -> Result<Url> {
        self.oauth_base
            .join("/login/oauth/access_token")
            .context("Could not build access token URL")
    }
}
