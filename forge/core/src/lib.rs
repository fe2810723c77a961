//! Forge Core - Headless Code Generation Pipeline
//!
//! This crate turns a natural-language project request into a set of named,
//! classified code files. It sends the request to a generation backend,
//! reports staged progress while it waits, splits the answer into artifacts
//! and reveals each one with a paced "live typing" effect. Every step can be
//! cancelled mid-flight.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Surfaces                                │
//! │           ┌─────────┐                 ┌──────────────────┐       │
//! │           │   CLI   │                 │  Tests/Headless  │       │
//! │           └────┬────┘                 └────────┬─────────┘       │
//! │                └──────────────┬────────────────┘                 │
//! │                    submit (up) / ForgeEvent (down)               │
//! └───────────────────────────────┼──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                          FORGE CORE                              │
//! │  ┌────────────────────────────┴───────────────────────────────┐  │
//! │  │                 ConversationController                     │  │
//! │  │  ┌──────────────┐  ┌────────────┐  ┌────────────────────┐  │  │
//! │  │  │ Orchestrator │─►│ Classifier │─►│  StreamRenderer    │  │  │
//! │  │  │ (retry/stage)│  │ (heuristic)│  │  (paced reveal)    │  │  │
//! │  │  └──────┬───────┘  └────────────┘  └────────────────────┘  │  │
//! │  │         │            CancellationToken threads all three    │  │
//! │  └─────────┼──────────────────────────────────────────────────┘  │
//! │            ▼                                                     │
//! │   GenerationBackend          FileSink · LogSink · TranscriptStore │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ConversationController`]: Owns the transcript and drives each run
//! - [`RequestOrchestrator`]: Retrying, cancellable backend call with stages
//! - [`CodeArtifact`]: One classified code block, destined to become a file
//! - [`StreamRenderer`]: Chunked reveal of one artifact
//! - [`CancellationToken`]: Cooperative cancellation for one run
//! - [`ForgeEvent`]: Everything a surface needs to draw a run
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use forge_core::{
//!     backend::HttpBackend, controller::event_channel, Collaborators,
//!     ConversationController, DirectorySink, JsonTranscriptStore, TracingLogSink,
//! };
//!
//! let config = forge_core::load_config()?;
//! let backend = Arc::new(HttpBackend::from_settings(&config.backend)?);
//! let collaborators = Collaborators {
//!     store: Arc::new(JsonTranscriptStore::new("transcript.json")),
//!     files: Arc::new(DirectorySink::new(&config.output_dir)),
//!     log: Arc::new(TracingLogSink),
//! };
//! let (tx, mut rx) = event_channel();
//! let mut controller =
//!     ConversationController::from_config(&config, backend, collaborators, tx).await;
//!
//! controller.submit("Build a todo app with React").await;
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Generation backend abstraction and the HTTP client
//! - [`cancel`]: Cancellation token
//! - [`classifier`]: Code block extraction and heuristics
//! - [`config`]: TOML configuration with environment overrides
//! - [`controller`]: Conversation controller
//! - [`events`]: Events from the controller to surfaces
//! - [`messages`]: Transcript messages
//! - [`orchestrator`]: Request orchestration with retry and stages
//! - [`renderer`]: Live-typing renderer
//! - [`sinks`]: File and log collaborators
//! - [`stages`]: Stage catalog and tracker
//! - [`transcript`]: Transcript and its persistence

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod cancel;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod events;
pub mod messages;
pub mod orchestrator;
pub mod renderer;
pub mod sinks;
pub mod stages;
pub mod transcript;

// Re-exports for convenience
pub use backend::{
    BackendError, GenerationBackend, GenerationOptions, GenerationRequest, GenerationResponse,
    HttpBackend, TransportError,
};
pub use cancel::CancellationToken;
pub use classifier::{Category, CodeArtifact, Complexity, DesignPattern};
pub use controller::{Collaborators, ConversationController, RunCanceller};
pub use events::{ForgeEvent, RunId, RunOutcome};
pub use messages::{ChatMessage, MessageId, MessageKind, MessageMetadata, Sender};
pub use orchestrator::{
    ArtifactSet, GenerationMetadata, OrchestratorConfig, OrchestratorError, RequestOrchestrator,
};
pub use renderer::{LiveCodingState, RendererConfig, RevealOutcome, StreamRenderer};
pub use sinks::{
    DirectorySink, FileSink, LogLevel, LogSink, NullFileSink, SinkError, TracingLogSink,
};
pub use stages::{GenerationStage, StageProgress, StageTracker, STAGES};
pub use transcript::{
    JsonTranscriptStore, MemoryTranscriptStore, StoreError, Transcript, TranscriptStore,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, ForgeConfig,
};
