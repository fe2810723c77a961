//! Chat Messages
//!
//! The transcript is a list of [`ChatMessage`]s. Messages are immutable once
//! appended; their metadata summarises what the classifier and orchestrator
//! found, for display only. Nothing in a message feeds back into later runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{CodeArtifact, DesignPattern};

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    ///
    /// Combines a timestamp with an atomic counter so IDs stay unique across
    /// restarts when the transcript is reloaded.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let count = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{}_{count}", Utc::now().timestamp_millis()))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// User input
    User,
    /// The generation pipeline
    Ai,
}

/// What a message carries, as a rendering hint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Run summary with narration
    Analysis,
    /// One generated file
    Code,
    /// Plain conversation
    #[default]
    Normal,
    /// A failed run
    Error,
    /// Greeting and housekeeping
    System,
}

/// Summary data attached to pipeline messages
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageMetadata {
    /// Files committed by the run (or 1 for a code message)
    pub files_generated: usize,
    /// Path of the file a code message describes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Language of the file a code message describes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Technologies mentioned in the response
    pub technologies: Vec<String>,
    /// Line estimate from the raw response
    pub estimated_lines: usize,
    /// Design patterns detected across artifacts
    pub patterns: Vec<String>,
    /// Architecture labels attached to the run
    pub architecture: Vec<String>,
}

/// One transcript entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub sender: Sender,
    /// Message content
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Rendering hint
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Pipeline summary, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Greeting shown when no transcript has been persisted
pub const GREETING: &str = "Hi! Describe the project you want to build and I'll generate the code for it, file by file.";

impl ChatMessage {
    /// Create a new message
    pub fn new(sender: Sender, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
            kind,
            metadata: None,
        }
    }

    /// A user submission
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, MessageKind::Normal, content)
    }

    /// A failed run, described in plain language
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Sender::Ai, MessageKind::Error, content)
    }

    /// The default greeting
    #[must_use]
    pub fn greeting() -> Self {
        Self::new(Sender::Ai, MessageKind::System, GREETING)
    }

    /// A committed artifact
    #[must_use]
    pub fn code(artifact: &CodeArtifact) -> Self {
        let content = format!(
            "```{}\n{}\n```",
            artifact.language, artifact.raw_code
        );
        Self::new(Sender::Ai, MessageKind::Code, content).with_metadata(MessageMetadata {
            files_generated: 1,
            file_path: Some(artifact.file_path.clone()),
            language: Some(artifact.language.clone()),
            patterns: pattern_names(&artifact.patterns),
            estimated_lines: artifact.line_count(),
            ..MessageMetadata::default()
        })
    }

    /// Attach metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Display names for a pattern list
#[must_use]
pub fn pattern_names(patterns: &[DesignPattern]) -> Vec<String> {
    patterns.iter().map(|p| p.name().to_string()).collect()
}
