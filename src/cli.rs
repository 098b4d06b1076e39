//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Conversational NFT analytics: ask about a collection in plain English
#[derive(Parser, Debug)]
#[command(name = "crunchbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CRUNCHBOT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CRUNCHBOT_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "CRUNCHBOT_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "CRUNCHBOT_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CRUNCHBOT_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,

    /// Show which endpoint and parameters a question routes to
    Route {
        /// The question
        #[arg(required = true)]
        query: String,
    },

    /// Answer one question end to end and print the response
    Ask {
        /// The question
        #[arg(required = true)]
        query: String,
    },

    /// List analytics endpoints and their sort keys
    Endpoints {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Output format for listings
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON
    Json,
    /// YAML
    Yaml,
}
