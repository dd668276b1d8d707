// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - serve: run the relay HTTP server
// - check-url: run the SSRF guard on one URL and print the verdict
//
// Every `serve` flag can also come from an environment variable
// (#[arg(env = ...)]), which is how the OAuth client secret is normally
// provided in deployments.
// =============================================================================

use crate::config::{DEFAULT_GITHUB_API, DEFAULT_MAX_BODY_BYTES, DEFAULT_OAUTH_BASE};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(
    name = "edge-relay",
    version = "0.1.0",
    about = "Stateless HTTP relays for page fetching and GitHub access",
    long_about = "edge-relay fronts arbitrary web pages, the GitHub OAuth device flow and a \
                  scoped part of the GitHub API for browser clients that cannot make those \
                  calls themselves."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay server
    ///
    /// Example: GITHUB_CLIENT_SECRET=... edge-relay serve --bind 0.0.0.0:8787
    Serve(ServeArgs),

    /// Check whether the page relay would be allowed to fetch a URL
    ///
    /// Example: edge-relay check-url http://192.168.1.1
    CheckUrl {
        /// URL to check (http:// is assumed when no scheme is given)
        url: String,

        /// Output the verdict as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "EDGE_RELAY_BIND", default_value = "127.0.0.1:8787")]
    pub bind: SocketAddr,

    /// OAuth client secret injected into access-token requests
    ///
    /// hide_env_values keeps the secret out of --help output
    #[arg(long, env = "GITHUB_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "EDGE_RELAY_GITHUB_API", default_value = DEFAULT_GITHUB_API)]
    pub github_api: String,

    /// Base URL of the GitHub OAuth endpoints
    #[arg(long, env = "EDGE_RELAY_OAUTH_BASE", default_value = DEFAULT_OAUTH_BASE)]
    pub oauth_base: String,

    /// Largest request body accepted from callers, in bytes
    #[arg(long, env = "EDGE_RELAY_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_url() {
        let cli = Cli::try_parse_from(["edge-relay", "check-url", "example.com", "--json"]).unwrap();
        match cli.command {
            Commands::CheckUrl { url, json } => {
                assert_eq!(url, "example.com");
                assert!(json);
            }
            _ => panic!("expected check-url"),
        }
    }

    #[test]
    fn test_parse_serve_bind() {
        let cli = Cli::try_parse_from(["edge-relay", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.bind.port(), 9000),
            _ => panic!("expected serve"),
        }
    }
}
