//! # tvmount - TV Installation Booking Server
//!
//! The main binary for the TV-installation marketplace.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) for the booking wizard, tracking
//!   pages, admin and installer dashboards
//! - CLI interface for administration
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     apps/tvmount (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │  Integrations    │    │
//! │  │  (clap)     │    │   (axum)    │    │  (reqwest)       │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │               │
//! │         └──────────────────┼────────────────────┘               │
//! │                            ▼                                    │
//! │                    ┌───────────────┐                            │
//! │                    │ tvmount-core  │                            │
//! │                    │ (THE ENGINE)  │                            │
//! │                    └───────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! tvmount server --host 0.0.0.0 --port 8080 --config tvmount.toml
//!
//! # CLI operations
//! tvmount status
//! tvmount bookings --status pending
//! tvmount installer-add --name "Sam Reyes" --email sam@example.com --phone "555 123 4567"
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tvmount::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // TVMOUNT_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TVMOUNT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tvmount=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ┌──────────────────────────────┐
  │  ▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄▄  │
  │  █                        █  │
  │  █        tvmount         █  │
  │  █                        █  │
  │  ▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀▀  │
  └──────────────┬┬──────────────┘

  TV Installation Booking v{}

  Book • Track • Install
"#,
        env!("CARGO_PKG_VERSION")
    );
}
