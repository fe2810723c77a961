//! Live-Typing Renderer
//!
//! Reveals one artifact a few characters at a time so the user watches the
//! file being "typed". The renderer owns the [`LiveCodingState`] for the
//! artifact it is revealing and hands a reference to the caller after every
//! step; there is no shared global state.
//!
//! The token is checked before every batch. A cancelled reveal stops where it
//! is, marks the state inactive, and returns normally: cancellation is not an
//! error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::classifier::{CodeArtifact, Complexity, DesignPattern};
use crate::config::RenderSettings;

/// Snapshot of the artifact currently being revealed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCodingState {
    /// File name shown in the editor header
    pub file_name: String,
    /// Revealed prefix of the code
    pub content: String,
    /// Whether a reveal is suspended between batches for this artifact
    pub is_active: bool,
    /// Fence language
    pub language: String,
    /// Revealed share of the code (0-100)
    pub progress: u8,
    /// Complexity of the artifact
    pub complexity: Complexity,
    /// Patterns of the artifact
    pub patterns: Vec<DesignPattern>,
}

impl LiveCodingState {
    fn start(artifact: &CodeArtifact) -> Self {
        Self {
            file_name: artifact.file_path.clone(),
            content: String::with_capacity(artifact.raw_code.len()),
            is_active: true,
            language: artifact.language.clone(),
            progress: 0,
            complexity: artifact.complexity,
            patterns: artifact.patterns.clone(),
        }
    }
}

/// How a reveal ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Every character was revealed
    Completed(LiveCodingState),
    /// The token was cancelled first; `content` holds what was revealed
    Cancelled(LiveCodingState),
}

impl RevealOutcome {
    /// Final state, inactive in both cases
    #[must_use]
    pub fn state(&self) -> &LiveCodingState {
        match self {
            Self::Completed(state) | Self::Cancelled(state) => state,
        }
    }

    /// Whether the reveal finished
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Pacing for the reveal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Characters revealed per batch
    pub chunk_size: usize,
    /// Pause between batches
    pub chunk_delay: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chunk_size: 15,
            chunk_delay: Duration::from_millis(20),
        }
    }
}

impl From<&RenderSettings> for RendererConfig {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size.max(1),
            chunk_delay: Duration::from_millis(settings.chunk_delay_ms),
        }
    }
}

/// Reveal progress as a whole percentage, capped at 100
#[must_use]
pub fn reveal_progress(revealed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    // Rounded integer division, done in u128 so huge inputs cannot overflow.
    let percent = (revealed as u128 * 200 + total as u128) / (total as u128 * 2);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Paced, cancellable reveal of one artifact at a time
#[derive(Clone, Debug, Default)]
pub struct StreamRenderer {
    config: RendererConfig,
}

impl StreamRenderer {
    /// Create a renderer with the given pacing
    #[must_use]
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config: RendererConfig {
                chunk_size: config.chunk_size.max(1),
                ..config
            },
        }
    }

    /// Pacing in use
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Reveal `artifact`, calling `on_update` after every batch
    ///
    /// Every update reveals more than the one before, and the last update
    /// always has `is_active == false`. A cancelled reveal ends with one
    /// inactive update repeating the prefix revealed so far.
    pub async fn reveal<F>(
        &self,
        artifact: &CodeArtifact,
        token: &CancellationToken,
        mut on_update: F,
    ) -> RevealOutcome
    where
        F: FnMut(&LiveCodingState),
    {
        let chars: Vec<char> = artifact.raw_code.chars().collect();
        let total = chars.len();
        let mut state = LiveCodingState::start(artifact);
        let mut revealed = 0;

        tracing::debug!(
            file = %artifact.file_path,
            chars = total,
            chunk_size = self.config.chunk_size,
            "Starting reveal"
        );

        if token.is_cancelled() {
            return Self::halt(state, revealed, &mut on_update);
        }

        let mut batches = chars.chunks(self.config.chunk_size).peekable();
        while let Some(batch) = batches.next() {
            state.content.extend(batch);
            revealed += batch.len();
            state.progress = reveal_progress(revealed, total);
            if batches.peek().is_none() {
                break;
            }
            on_update(&state);

            if !token.sleep(self.config.chunk_delay).await {
                return Self::halt(state, revealed, &mut on_update);
            }
        }

        // The last batch and an empty artifact both finish here.
        state.progress = 100;
        state.is_active = false;
        on_update(&state);

        tracing::debug!(file = %artifact.file_path, "Reveal complete");
        RevealOutcome::Completed(state)
    }

    fn halt<F>(mut state: LiveCodingState, revealed: usize, on_update: &mut F) -> RevealOutcome
    where
        F: FnMut(&LiveCodingState),
    {
        state.is_active = false;
        on_update(&state);
        tracing::debug!(file = %state.file_name, revealed, "Reveal cancelled");
        RevealOutcome::Cancelled(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::parse;

    fn artifact(code: &str) -> CodeArtifact {
        parse(&format!("```js\n{code}\n```")).remove(0)
    }

    fn fast() -> StreamRenderer {
        StreamRenderer::new(RendererConfig {
            chunk_size: 15,
            chunk_delay: Duration::from_millis(10),
        })
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(reveal_progress(0, 40), 0);
        assert_eq!(reveal_progress(15, 40), 38);
        assert_eq!(reveal_progress(1, 200), 1);
        assert_eq!(reveal_progress(1, 400), 0);
        assert_eq!(reveal_progress(40, 40), 100);
        assert_eq!(reveal_progress(50, 40), 100);
        assert_eq!(reveal_progress(0, 0), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_reveal() {
        let code = "a".repeat(40);
        let artifact = artifact(&code);
        let token = CancellationToken::new();
        let mut updates = Vec::new();

        let outcome = fast()
            .reveal(&artifact, &token, |s| updates.push(s.clone()))
            .await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.state().content, code);
        assert_eq!(outcome.state().progress, 100);
        assert!(!outcome.state().is_active);

        let lengths: Vec<_> = updates.iter().map(|s| s.content.len()).collect();
        assert_eq!(lengths, vec![15, 30, 40]);
        let active: Vec<_> = updates.iter().map(|s| s.is_active).collect();
        assert_eq!(active, vec![true, true, false]);
        let progress: Vec<_> = updates.iter().map(|s| s.progress).collect();
        assert_eq!(progress, vec![38, 75, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let artifact = artifact("const x = 1;");
        let token = CancellationToken::new();
        token.cancel();
        let mut updates = Vec::new();

        let outcome = fast()
            .reveal(&artifact, &token, |s| updates.push(s.clone()))
            .await;

        assert!(!outcome.is_completed());
        assert_eq!(outcome.state().content, "");
        assert!(!outcome.state().is_active);
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_artifact() {
        let artifact = artifact("");
        let mut updates = Vec::new();

        let outcome = fast()
            .reveal(&artifact, &CancellationToken::new(), |s| updates.push(s.clone()))
            .await;
        assert!(outcome.is_completed());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].progress, 100);
        assert!(!updates[0].is_active);

        let token = CancellationToken::new();
        token.cancel();
        let outcome = fast().reveal(&artifact, &token, |_| {}).await;
        assert!(!outcome.is_completed());
        assert!(!outcome.state().is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_reveal_stops_within_a_batch() {
        let artifact = artifact(&"b".repeat(100));
        let token = CancellationToken::new();
        let canceller = token.clone();
        let mut seen = 0;

        let outcome = fast()
            .reveal(&artifact, &token, |s| {
                seen += 1;
                if s.content.len() == 30 {
                    canceller.cancel();
                }
            })
            .await;

        match outcome {
            RevealOutcome::Cancelled(state) => {
                assert_eq!(state.content.len(), 30);
                assert!(!state.is_active);
                assert!(state.progress < 100);
            }
            RevealOutcome::Completed(_) => panic!("reveal should have been cancelled"),
        }
        assert_eq!(seen, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multibyte_characters_are_not_split() {
        let code = "é".repeat(20);
        let artifact = artifact(&code);
        let token = CancellationToken::new();
        let mut lengths = Vec::new();

        fast()
            .reveal(&artifact, &token, |s| lengths.push(s.content.chars().count()))
            .await;

        assert_eq!(lengths, vec![15, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_batches() {
        let artifact = artifact(&"c".repeat(45));
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();

        fast().reveal(&artifact, &token, |_| {}).await;

        // Three batches, two pauses.
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[test]
    fn test_config_from_settings() {
        let settings = RenderSettings {
            chunk_size: 0,
            chunk_delay_ms: 5,
            stage_timing: true,
        };
        let config = RendererConfig::from(&settings);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.chunk_delay, Duration::from_millis(5));
    }
}
