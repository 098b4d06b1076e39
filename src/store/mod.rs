//! Chat history persistence.
//!
//! Sessions are owned by a user and messages by a session; neither has a
//! lifecycle outside its parent. The [`ConversationStore`] trait abstracts
//! the backend. [`MemoryStore`] keeps everything in a `DashMap` and can
//! mirror it to a JSON snapshot file.
//!
//! ```
//! use crunchbot::store::{ChatMessage, ChatRole, ConversationStore, MemoryStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let first = ChatMessage {
//!     role: ChatRole::User,
//!     content: "Show me BAYC sales trends".into(),
//!     time: "10:42".into(),
//!     graph: None,
//! };
//! let id = store.create_session("user-1", "BAYC Sales Trends", first).await?;
//! assert_eq!(store.list_sessions("user-1").await?[0].id, id);
//! # Ok::<(), crunchbot::Error>(())
//! # }).unwrap();
//! ```

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::pipeline::GraphSpec;

pub use memory::MemoryStore;

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The human
    User,
    /// The assistant
    Bot,
}

/// One message in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: ChatRole,
    /// Message text
    pub content: String,
    /// Client-supplied display time
    pub time: String,
    /// Chart attached to a bot answer
    #[serde(default)]
    pub graph: Option<GraphSpec>,
}

/// A conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Session id
    #[serde(rename = "_id")]
    pub id: String,
    /// Title shown in the session list
    pub heading: String,
    /// Creation time
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Messages in order
    pub messages: Vec<ChatMessage>,
}

/// Session list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id
    #[serde(rename = "_id")]
    pub id: String,
    /// Title
    pub heading: String,
    /// Creation time
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Number of messages
    #[serde(rename = "messageCount")]
    pub message_count: usize,
}

impl From<&ChatSession> for SessionSummary {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            heading: session.heading.clone(),
            created_at: session.created_at,
            message_count: session.messages.len(),
        }
    }
}

/// Storage backend for per-user chat history.
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// request handler.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Start a session whose first message is `first`. Returns the new id.
    async fn create_session(&self, user_id: &str, heading: &str, first: ChatMessage)
    -> Result<String>;

    /// Append to an existing session. Unknown sessions are `Error::NotFound`.
    async fn append_message(
        &self,
        user_id: &str,
        session_id: &str,
        message: ChatMessage,
    ) -> Result<()>;

    /// All sessions for a user, oldest first
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>>;

    /// One session with its messages. Unknown sessions are `Error::NotFound`.
    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<ChatSession>;
}
