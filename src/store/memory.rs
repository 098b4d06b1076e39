//! In-memory conversation store with an optional JSON snapshot

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ChatMessage, ChatSession, ConversationStore, SessionSummary};
use crate::{Error, Result};

/// `DashMap` of user id to that user's sessions.
///
/// When a snapshot path is set, the whole map is rewritten on every
/// mutation, and the in-memory copy only changes once that write succeeds.
/// Mutations are serialized by `write_lock`.
pub struct MemoryStore {
    users: DashMap<String, Vec<ChatSession>>,
    snapshot: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    /// Empty, memory-only store
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            snapshot: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Store mirrored to `path`, loading it first if it exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let users: DashMap<String, Vec<ChatSession>> = if tokio::fs::try_exists(&path).await? {
            let bytes = tokio::fs::read(&path).await?;
            let loaded: HashMap<String, Vec<ChatSession>> = serde_json::from_slice(&bytes)?;
            let sessions: usize = loaded.values().map(Vec::len).sum();
            info!(path = %path.display(), users = loaded.len(), sessions, "Loaded chat history");
            loaded.into_iter().collect()
        } else {
            debug!(path = %path.display(), "No chat history snapshot yet");
            DashMap::new()
        };

        Ok(Self {
            users,
            snapshot: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    /// Replace `user_id`'s sessions, writing the snapshot first.
    ///
    /// Callers hold `write_lock` across their read-modify-write.
    async fn commit(&self, user_id: &str, sessions: Vec<ChatSession>) -> Result<()> {
        if let Some(path) = &self.snapshot {
            let mut copy: HashMap<String, Vec<ChatSession>> = self
                .users
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect();
            copy.insert(user_id.to_string(), sessions.clone());
            write_snapshot(path, &copy).await?;
        }
        self.users.insert(user_id.to_string(), sessions);
        Ok(())
    }

    fn sessions_of(&self, user_id: &str) -> Vec<ChatSession> {
        self.users
            .get(user_id)
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }
}

async fn write_snapshot(path: &Path, users: &HashMap<String, Vec<ChatSession>>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(users)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn session_not_found() -> Error {
    Error::NotFound("Session not found".to_string())
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_session(
        &self,
        user_id: &str,
        heading: &str,
        first: ChatMessage,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let session = ChatSession {
            id: id.clone(),
            heading: heading.to_string(),
            created_at: Utc::now(),
            messages: vec![first],
        };

        let _guard = self.write_lock.lock().await;
        let mut sessions = self.sessions_of(user_id);
        sessions.push(session);
        self.commit(user_id, sessions).await?;

        debug!(user = %user_id, session = %id, "Created chat session");
        Ok(id)
    }

    async fn append_message(
        &self,
        user_id: &str,
        session_id: &str,
        message: ChatMessage,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.sessions_of(user_id);
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(session_not_found)?;
        session.messages.push(message);
        self.commit(user_id, sessions).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        Ok(self
            .users
            .get(user_id)
            .map(|sessions| sessions.iter().map(SessionSummary::from).collect())
            .unwrap_or_default())
    }

    async fn get_session(&self, user_id: &str, session_id: &str) -> Result<ChatSession> {
        self.users
            .get(user_id)
            .and_then(|sessions| sessions.iter().find(|s| s.id == session_id).cloned())
            .ok_or_else(session_not_found)
    }
}
