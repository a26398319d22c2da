//! # tvmount CLI Module
//!
//! This module implements the CLI interface for tvmount.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show booking statistics
//! - `catalog` - Print the price table
//! - `quote` - Price TV configurations from a JSON file
//! - `bookings` - List bookings
//! - `installer-add` - Register an installer and print their token
//! - `installer-token` - Print an installer's token again
//! - `export` - Dump bookings and installers to JSON
//! - `init` - Initialize a new database
//! - `compact` - Reclaim free space in the database file

mod commands;

use crate::config::{Config, Secrets};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tvmount_core::MarketError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tvmount - TV installation booking marketplace
///
/// Serves the booking wizard, tracking pages and installer dashboards, and
/// administers bookings from the command line.
#[derive(Parser, Debug)]
#[command(name = "tvmount")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the booking database
    #[arg(short = 'D', long, global = true, default_value = "tvmount.redb")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (lost on exit)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Public base URL for tracking links (overrides the config file)
        #[arg(long)]
        public_url: Option<String>,
    },

    /// Show booking statistics
    Status,

    /// Print the service catalog
    Catalog,

    /// Price TV configurations from a JSON file
    Quote {
        /// JSON file: a list of TVs, or an object with a "tvs" list
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List bookings, newest first
    Bookings {
        /// Only bookings in this status (pending, confirmed, assigned, ...)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of bookings to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Register an installer and print their access token
    InstallerAdd {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        /// Free-text description of where they work
        #[arg(long, default_value = "")]
        service_area: String,
    },

    /// Print the access token of an existing installer
    InstallerToken {
        /// Installer ID
        id: u64,
    },

    /// Export bookings and installers as JSON
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Reclaim free space in the redb database file
    Compact,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), MarketError> {
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        json_mode: cli.json_mode,
        config: Config::load(cli.config.as_deref())?,
        secrets: Secrets::from_env(),
    };

    if cli.verbose {
        tracing::info!(database = ?ctx.database, backend = %ctx.backend, "Context loaded");
    }

    match cli.command {
        Some(Commands::Server {
            host,
            port,
            public_url,
        }) => cmd_server(ctx, host, port, public_url).await,
        Some(Commands::Status) => cmd_status(&ctx),
        Some(Commands::Catalog) => cmd_catalog(&ctx),
        Some(Commands::Quote { file }) => cmd_quote(&ctx, &file),
        Some(Commands::Bookings { status, limit }) => {
            cmd_bookings(&ctx, status.as_deref(), limit)
        }
        Some(Commands::InstallerAdd {
            name,
            email,
            phone,
            service_area,
        }) => cmd_installer_add(&ctx, name, email, phone, service_area),
        Some(Commands::InstallerToken { id }) => cmd_installer_token(&ctx, id),
        Some(Commands::Export { output }) => cmd_export(&ctx, &output),
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Compact) => cmd_compact(&ctx),
        None => {
            // No subcommand - show status by default
            cmd_status(&ctx)
        }
    }
}
