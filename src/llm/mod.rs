//! Text completion capability used by the routing and summarizing stages.
//!
//! The pipeline only needs `complete(messages) -> text`; the hosted model
//! behind it is interchangeable. [`GeminiClient`] is the production
//! implementation.

mod gemini;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use gemini::GeminiClient;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A hosted model that turns a message list into a single text completion.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Run one completion
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Name shown in logs
    fn model_name(&self) -> &str;
}
