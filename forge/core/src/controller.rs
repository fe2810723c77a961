//! Conversation Controller
//!
//! Owns the transcript and wires a submission through the pipeline:
//!
//! ```text
//! submit ──► orchestrator ──► (for each artifact) renderer ──► file sink
//!                │                        │                      │
//!                └──── Stage ─────────────┴── LiveCoding ────────┴── Message / ArtifactCommitted
//! ```
//!
//! The controller is thin. It holds at most one live
//! [`CancellationToken`]; starting a run cancels whatever token was current
//! before. The token is reachable from other tasks through a [`RunCanceller`],
//! which is how a Ctrl-C handler stops a run in progress.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::backend::GenerationBackend;
use crate::cancel::CancellationToken;
use crate::classifier::{CodeArtifact, DesignPattern};
use crate::config::ForgeConfig;
use crate::events::{ForgeEvent, RunId, RunOutcome};
use crate::messages::{pattern_names, ChatMessage, MessageKind, MessageMetadata, Sender};
use crate::orchestrator::{
    ArtifactSet, OrchestratorConfig, OrchestratorError, RequestOrchestrator,
};
use crate::renderer::{RendererConfig, RevealOutcome, StreamRenderer};
use crate::sinks::{FileSink, LogLevel, LogSink};
use crate::transcript::{Transcript, TranscriptStore};

/// Capacity of the controller's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Create a channel sized for controller events
#[must_use]
pub fn event_channel() -> (mpsc::Sender<ForgeEvent>, mpsc::Receiver<ForgeEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Shared handle to the current run's token
#[derive(Clone, Debug, Default)]
pub struct RunCanceller {
    current: Arc<Mutex<Option<(RunId, CancellationToken)>>>,
}

impl RunCanceller {
    /// Cancel the current run, if any. Returns whether a live run was cancelled.
    pub fn cancel(&self) -> bool {
        match self.current.lock().as_ref() {
            Some((run_id, token)) if !token.is_cancelled() => {
                tracing::debug!(%run_id, "Cancelling run");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Whether a run is in progress and not cancelled
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|(_, token)| !token.is_cancelled())
    }

    /// Cancel the previous token and make a fresh one current for `run_id`
    fn replace(&self, run_id: RunId) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.current.lock().replace((run_id, token.clone())) {
            previous.cancel();
        }
        token
    }

    /// Forget the token of `run_id` once that run has ended
    fn clear(&self, run_id: RunId) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|(id, _)| *id == run_id) {
            *current = None;
        }
    }
}

/// Where a run's side effects go
#[derive(Clone)]
pub struct Collaborators {
    /// Persisted transcript
    pub store: Arc<dyn TranscriptStore>,
    /// Committed artifacts
    pub files: Arc<dyn FileSink>,
    /// Status lines
    pub log: Arc<dyn LogSink>,
}

/// Drives conversation turns for one user
pub struct ConversationController<B: GenerationBackend> {
    /// Request pipeline
    orchestrator: RequestOrchestrator<B>,
    /// Live-typing reveal
    renderer: StreamRenderer,
    /// Append-only history
    transcript: Transcript,
    /// Side effects
    collaborators: Collaborators,
    /// Channel to the surface
    tx: mpsc::Sender<ForgeEvent>,
    /// Current run's token
    canceller: RunCanceller,
    /// Most recently started run
    last_run: RunId,
}

impl<B: GenerationBackend> ConversationController<B> {
    /// Create a controller, loading the transcript from the store
    pub async fn new(
        orchestrator: RequestOrchestrator<B>,
        renderer: StreamRenderer,
        collaborators: Collaborators,
        max_persisted: usize,
        tx: mpsc::Sender<ForgeEvent>,
    ) -> Self {
        let loaded = collaborators.store.load().await;
        let transcript = Transcript::from_messages(loaded, max_persisted);
        tracing::debug!(messages = transcript.len(), "Loaded conversation");

        Self {
            orchestrator,
            renderer,
            transcript,
            collaborators,
            tx,
            canceller: RunCanceller::default(),
            last_run: RunId(0),
        }
    }

    /// Create a controller with every setting taken from `config`
    pub async fn from_config(
        config: &ForgeConfig,
        backend: Arc<B>,
        collaborators: Collaborators,
        tx: mpsc::Sender<ForgeEvent>,
    ) -> Self {
        Self::new(
            RequestOrchestrator::new(backend, OrchestratorConfig::from(config)),
            StreamRenderer::new(RendererConfig::from(&config.render)),
            collaborators,
            config.transcript.max_messages,
            tx,
        )
        .await
    }

    /// The conversation so far
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Handle for cancelling from another task
    pub fn cancel_handle(&self) -> RunCanceller {
        self.canceller.clone()
    }

    /// Cancel the current run, if any
    pub fn cancel(&self) -> bool {
        self.canceller.cancel()
    }

    /// Run a prompt supplied at startup, exactly as if the user had typed it
    pub async fn auto_start(&mut self, prompt: &str) -> RunOutcome {
        tracing::info!("Auto-starting with initial prompt");
        self.submit(prompt).await
    }

    /// Handle one user submission end to end
    ///
    /// Empty input is rejected without touching the transcript. Any other
    /// input is appended as a user message before the run starts and stays
    /// there whatever happens next.
    pub async fn submit(&mut self, text: &str) -> RunOutcome {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring empty submission");
            return RunOutcome::Rejected;
        }

        self.last_run = self.last_run.next();
        let run_id = self.last_run;
        let token = self.canceller.replace(run_id);
        tracing::info!(%run_id, "Run started");

        self.send(ForgeEvent::RunStarted {
            run_id,
            prompt: text.to_string(),
        })
        .await;
        self.append(ChatMessage::user(text)).await;

        let outcome = self.execute(run_id, text, &token).await;
        self.canceller.clear(run_id);

        self.send(ForgeEvent::RunFinished {
            run_id,
            outcome: outcome.clone(),
        })
        .await;
        outcome
    }

    async fn execute(&mut self, run_id: RunId, text: &str, token: &CancellationToken) -> RunOutcome {
        let tx = self.tx.clone();
        let result = self
            .orchestrator
            .run(text, token, |progress| {
                forward(&tx, ForgeEvent::Stage { run_id, progress });
            })
            .await;

        match result {
            Ok(set) => self.commit(run_id, set, token).await,
            Err(OrchestratorError::Cancelled) => self.cancelled(run_id, 0),
            Err(err) => {
                let error = err.to_string();
                tracing::error!(%run_id, error = %error, "Run failed");
                self.collaborators.log.log(LogLevel::Error, &error);
                self.append(ChatMessage::error(error.clone())).await;
                RunOutcome::Failed { error }
            }
        }
    }

    /// Reveal and commit each artifact, then append the run summary
    async fn commit(&mut self, run_id: RunId, set: ArtifactSet, token: &CancellationToken) -> RunOutcome {
        let mut committed = 0;

        for artifact in &set.artifacts {
            if token.is_cancelled() {
                return self.cancelled(run_id, committed);
            }

            let tx = self.tx.clone();
            let outcome = self
                .renderer
                .reveal(artifact, token, |state| {
                    forward(
                        &tx,
                        ForgeEvent::LiveCoding {
                            run_id,
                            state: state.clone(),
                        },
                    );
                })
                .await;

            if let RevealOutcome::Cancelled(_) = outcome {
                return self.cancelled(run_id, committed);
            }

            if let Err(e) = self
                .collaborators
                .files
                .write(&artifact.file_path, &artifact.raw_code, &artifact.language)
                .await
            {
                tracing::warn!(file = %artifact.file_path, error = %e, "Failed to write generated file");
            }
            self.append(ChatMessage::code(artifact)).await;
            self.send(ForgeEvent::ArtifactCommitted {
                run_id,
                artifact: artifact.clone(),
            })
            .await;
            committed += 1;
        }

        if token.is_cancelled() {
            return self.cancelled(run_id, committed);
        }

        self.append(summary_message(&set)).await;
        self.collaborators.log.log(
            LogLevel::Success,
            &format!("Generated {committed} file(s) in {} attempt(s)", set.attempts),
        );
        tracing::info!(%run_id, files = committed, "Run completed");
        RunOutcome::Completed { artifacts: committed }
    }

    fn cancelled(&self, run_id: RunId, committed: usize) -> RunOutcome {
        tracing::info!(%run_id, committed, "Run cancelled");
        self.collaborators.log.log(LogLevel::Info, "Generation cancelled");
        RunOutcome::Cancelled { committed }
    }

    /// Append, persist, and announce one message
    async fn append(&mut self, message: ChatMessage) {
        self.transcript.push(message.clone());
        if let Err(e) = self
            .collaborators
            .store
            .save(self.transcript.persisted_view())
            .await
        {
            tracing::warn!(error = %e, "Failed to persist transcript");
        }
        self.send(ForgeEvent::Message { message }).await;
    }

    /// Send a lifecycle event to the surface
    async fn send(&self, event: ForgeEvent) {
        if let Err(e) = self.tx.send(event).await {
            tracing::warn!("Failed to send event to surface: {}", e);
        }
    }
}

/// Best-effort delivery for high-frequency updates
fn forward(tx: &mpsc::Sender<ForgeEvent>, event: ForgeEvent) {
    if let Err(e) = tx.try_send(event) {
        tracing::trace!("Dropped progress event: {}", e);
    }
}

/// Closing message for a successful run
fn summary_message(set: &ArtifactSet) -> ChatMessage {
    let narration = set.narration.trim();

    if set.artifacts.is_empty() {
        let content = if narration.is_empty() {
            "The response did not contain any text or code."
        } else {
            narration
        };
        return ChatMessage::new(Sender::Ai, MessageKind::Normal, content);
    }

    let content = if narration.is_empty() {
        format!("Generated {} file(s).", set.artifacts.len())
    } else {
        narration.to_string()
    };

    ChatMessage::new(Sender::Ai, MessageKind::Analysis, content).with_metadata(MessageMetadata {
        files_generated: set.artifacts.len(),
        technologies: set.metadata.technologies.clone(),
        estimated_lines: set.metadata.estimated_lines,
        patterns: pattern_names(&run_patterns(&set.artifacts)),
        architecture: set.metadata.architecture.clone(),
        ..MessageMetadata::default()
    })
}

/// Patterns found in any artifact, in catalog order
fn run_patterns(artifacts: &[CodeArtifact]) -> Vec<DesignPattern> {
    DesignPattern::ALL
        .into_iter()
        .filter(|pattern| artifacts.iter().any(|a| a.patterns.contains(pattern)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::parse;
    use crate::orchestrator::GenerationMetadata;

    fn set(raw: &str) -> ArtifactSet {
        ArtifactSet {
            raw_response: raw.to_string(),
            narration: crate::classifier::narration(raw),
            artifacts: parse(raw),
            metadata: GenerationMetadata::from_response(raw),
            attempts: 1,
        }
    }

    #[test]
    fn test_canceller_replaces_and_cancels_previous() {
        let canceller = RunCanceller::default();
        assert!(!canceller.cancel());

        let first = canceller.replace(RunId(1));
        assert!(canceller.is_running());
        let second = canceller.replace(RunId(2));
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        assert!(canceller.cancel());
        assert!(second.is_cancelled());
        assert!(!canceller.cancel());
    }

    #[test]
    fn test_clear_ignores_stale_tokens() {
        let canceller = RunCanceller::default();
        canceller.replace(RunId(1));
        canceller.replace(RunId(2));

        canceller.clear(RunId(1));
        assert!(canceller.is_running());
        canceller.clear(RunId(2));
        assert!(!canceller.is_running());
    }

    #[test]
    fn test_summary_for_artifacts() {
        let raw = "Here is a Repository in Python.\n```python\nclass UserRepository:\n    pass\n```";
        let message = summary_message(&set(raw));

        assert_eq!(message.kind, MessageKind::Analysis);
        assert_eq!(message.content, "Here is a Repository in Python.");
        let metadata = message.metadata.unwrap();
        assert_eq!(metadata.files_generated, 1);
        assert_eq!(metadata.technologies, vec!["Python"]);
        assert_eq!(metadata.patterns, vec!["Repository"]);
        assert_eq!(metadata.estimated_lines, 2);
    }

    #[test]
    fn test_summary_without_code() {
        let message = summary_message(&set("Just some thoughts."));
        assert_eq!(message.kind, MessageKind::Normal);
        assert_eq!(message.content, "Just some thoughts.");
        assert!(message.metadata.is_none());
    }
}
