//! crunchbot library
//!
//! Conversational NFT analytics over the bitsCrunch collection API.
//!
//! # Features
//!
//! - **Intent routing**: an LLM maps a free-text question to one of eleven
//!   collection analytics endpoints plus query parameters
//! - **Normalization**: one table-driven normalizer per endpoint with
//!   `sort_by` allow-lists and defaults
//! - **Summaries**: a second LLM pass explains the payload and may pick two
//!   series for a chart
//! - **Chat history**: per-user sessions behind JWT auth
//!
//! Every stage runs in sequence under a single request deadline.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod store;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    }
    .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
