//! Binary entry point for heritage-kg.
//!
//! This binary provides the CLI interface for the heritage knowledge-graph
//! service.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use heritage_kg::config::HeritageConfig;
use heritage_kg::observability::{self, ObservabilityConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// heritage-kg - Knowledge graph service for a cultural-heritage voice assistant.
#[derive(Parser)]
#[command(name = "heritage-kg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "HERITAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Serve {
        /// Bind host, overriding the configuration.
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding the configuration.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a question or mention and print the result as JSON.
    Resolve {
        /// The question, e.g. "张三是谁？".
        query: String,

        /// Treat the query as a bare mention and keep matches scoring at
        /// least this value.
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Import a JSON graph document into the configured store.
    Import {
        /// Path to the document.
        file: PathBuf,
    },

    /// Answer a message from the scripted response rules.
    Chat {
        /// The message.
        message: String,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match HeritageConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut observability_config = ObservabilityConfig::from_config(&config, cli.verbose);
    // Only the server exposes metrics.
    if !matches!(cli.command, Commands::Serve { .. }) {
        observability_config.metrics.enabled = false;
    }
    let metrics = match observability::init(&observability_config) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = match cli.command {
        Commands::Serve { host, port } => commands::cmd_serve(config, metrics, host, port).await,
        Commands::Resolve { query, threshold } => {
            commands::cmd_resolve(&config, &query, threshold)
        },
        Commands::Import { file } => commands::cmd_import(&config, &file),
        Commands::Chat { message } => commands::cmd_chat(&config, &message),
        Commands::Config { show } => commands::cmd_config(&config, show),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}
