// src/main.rs
// =============================================================================
// This is the entry point of the relay service.
//
// What happens here:
// 1. Set up logging (tracing-subscriber, RUST_LOG overrides the default)
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = ok, 1 = URL blocked, 2 = error)
// =============================================================================

mod charset;   // src/charset/ - charset detection and decoding
mod cli;       // src/cli.rs - command-line parsing
mod config;    // src/config.rs - runtime configuration
mod error;     // src/error.rs - relay error responses
mod relay;     // src/relay/ - the relay endpoints
mod safety;    // src/safety/ - SSRF guard
mod server;    // src/server.rs - HTTP server hosting the relays

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::RelayConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = server stopped cleanly / URL is fetchable
//   Ok(1) = URL is blocked
//   Err = unexpected error
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = RelayConfig::from_args(&args)?;
            server::serve(config).await?;
            Ok(0)
        }
        Commands::CheckUrl { url, json } => handle_check_url(&url, json),
    }
}

// Handles the 'check-url' subcommand
fn handle_check_url(url: &str, json: bool) -> Result<i32> {
    let target = safety::with_default_scheme(url);
    let verdict = safety::check_url(&target);

    if json {
        let output = serde_json::json!({ "url": target, "result": verdict });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match verdict {
            safety::Verdict::Allowed => println!("✅ {} is fetchable", target),
            safety::Verdict::Blocked(reason) => println!("❌ {} is blocked: {}", target, reason),
        }
    }

    Ok(if verdict.is_allowed() { 0 } else { 1 })
}
