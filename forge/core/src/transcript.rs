//! Conversation Transcript
//!
//! The append-only chat history for one user, plus the persistence boundary.
//!
//! # Persistence
//!
//! After every mutation the controller hands the store the most recent
//! `max_messages` entries. Loading returns what was stored, or a single
//! greeting when nothing readable is there. A corrupt file is logged and
//! treated as empty; it never stops the conversation from starting.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::messages::{ChatMessage, MessageId, MessageKind};

/// Errors from a transcript store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file could not be read or written
    #[error("transcript I/O error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The transcript could not be encoded
    #[error("transcript encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the transcript lives between sessions
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Previously persisted messages, or a greeting when there are none
    async fn load(&self) -> Vec<ChatMessage>;

    /// Replace the persisted messages
    ///
    /// # Errors
    ///
    /// Returns an error if the messages cannot be written.
    async fn save(&self, messages: &[ChatMessage]) -> Result<(), StoreError>;
}

/// JSON array on disk
#[derive(Clone, Debug)]
pub struct JsonTranscriptStore {
    path: PathBuf,
}

impl JsonTranscriptStore {
    /// Store at `path`; parent directories are created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File backing this store
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptStore for JsonTranscriptStore {
    async fn load(&self) -> Vec<ChatMessage> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Could not read transcript");
                }
                return vec![ChatMessage::greeting()];
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&content) {
            Ok(messages) if !messages.is_empty() => {
                tracing::debug!(path = %self.path.display(), count = messages.len(), "Loaded transcript");
                messages
            }
            Ok(_) => vec![ChatMessage::greeting()],
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Transcript is unreadable, starting fresh");
                vec![ChatMessage::greeting()]
            }
        }
    }

    async fn save(&self, messages: &[ChatMessage]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let json = serde_json::to_string_pretty(messages)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// In-memory store for tests and headless use
#[derive(Debug, Default)]
pub struct MemoryTranscriptStore {
    saved: Mutex<Option<Vec<ChatMessage>>>,
}

impl MemoryTranscriptStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved messages
    #[must_use]
    pub fn saved(&self) -> Option<Vec<ChatMessage>> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn load(&self) -> Vec<ChatMessage> {
        match self.saved.lock().as_ref() {
            Some(messages) if !messages.is_empty() => messages.clone(),
            _ => vec![ChatMessage::greeting()],
        }
    }

    async fn save(&self, messages: &[ChatMessage]) -> Result<(), StoreError> {
        *self.saved.lock() = Some(messages.to_vec());
        Ok(())
    }
}

/// Append-only chat history
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    /// Messages kept when persisting (0 = unlimited)
    max_persisted: usize,
}

impl Transcript {
    /// Start from previously loaded messages
    #[must_use]
    pub fn from_messages(messages: Vec<ChatMessage>, max_persisted: usize) -> Self {
        Self {
            messages,
            max_persisted,
        }
    }

    /// Append a message and return its ID
    pub fn push(&mut self, message: ChatMessage) -> MessageId {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// All messages, oldest first
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Messages of a given kind
    pub fn of_kind(&self, kind: MessageKind) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    /// The tail that gets persisted
    #[must_use]
    pub fn persisted_view(&self) -> &[ChatMessage] {
        if self.max_persisted == 0 {
            return &self.messages;
        }
        let start = self.messages.len().saturating_sub(self.max_persisted);
        &self.messages[start..]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::messages::GREETING;

    #[tokio::test]
    async fn test_missing_file_loads_greeting() {
        let dir = tempdir().unwrap();
        let store = JsonTranscriptStore::new(dir.path().join("none.json"));
        let messages = store.load().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::System);
        assert_eq!(messages[0].content, GREETING);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_greeting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        std::fs::write(&path, "{ not json").unwrap();

        let messages = JsonTranscriptStore::new(&path).load().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, GREETING);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = JsonTranscriptStore::new(dir.path().join("nested").join("t.json"));
        let messages = vec![ChatMessage::user("Build a shop"), ChatMessage::error("boom")];

        store.save(&messages).await.unwrap();
        assert_eq!(store.load().await, messages);
    }

    #[test]
    fn test_persisted_view_is_capped() {
        let mut transcript = Transcript::from_messages(Vec::new(), 3);
        for i in 0..5 {
            transcript.push(ChatMessage::user(format!("Message {i}")));
        }

        let contents: Vec<_> = transcript
            .persisted_view()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["Message 2", "Message 3", "Message 4"]);
        assert_eq!(transcript.len(), 5);
    }

    #[test]
    fn test_unlimited_view() {
        let mut transcript = Transcript::from_messages(vec![ChatMessage::greeting()], 0);
        transcript.push(ChatMessage::user("hi"));
        assert_eq!(transcript.persisted_view().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryTranscriptStore::new();
        assert_eq!(store.load().await[0].content, GREETING);
        store.save(&[ChatMessage::user("x")]).await.unwrap();
        assert_eq!(store.load().await[0].content, "x");
    }
}
