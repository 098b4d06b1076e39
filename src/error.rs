//! Error types for crunchbot

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for crunchbot
pub type Result<T> = std::result::Result<T, Error>;

/// crunchbot errors
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed caller input
    #[error("{0}")]
    Validation(String),

    /// The LLM produced output that could not be parsed as a routing decision
    #[error("Routing error: {message}")]
    Routing {
        /// What went wrong
        message: String,
        /// The raw LLM text, kept for diagnosis
        raw: String,
    },

    /// The router named an endpoint outside the known set
    #[error("Unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    /// Analytics provider returned a non-success status
    #[error("Error {status}: {body}")]
    Gateway {
        /// Upstream HTTP status code
        status: u16,
        /// Upstream response body
        body: String,
    },

    /// LLM transport or response-shape failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// A deadline expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a routing error that keeps the raw LLM text
    pub fn routing(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Routing {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// HTTP status code this error maps to
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnsupportedEndpoint(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
