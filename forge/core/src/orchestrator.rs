//! Request Orchestrator
//!
//! Drives one generation run from user text to an [`ArtifactSet`]:
//!
//! 1. Validate the input and wrap it in the production directive.
//! 2. Call the backend, retrying transport failures with a linear backoff.
//! 3. While the call is in flight, walk the stage catalog on a timer.
//! 4. Derive response metadata and classify the response.
//!
//! The cancellation token is checked before every attempt, raced against the
//! in-flight request and every backoff delay, and checked again before
//! classification. A cancelled run returns [`OrchestratorError::Cancelled`]
//! without issuing another attempt.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::backend::{
    BackendError, GenerationBackend, GenerationOptions, GenerationRequest, GenerationResponse,
    TransportError,
};
use crate::cancel::CancellationToken;
use crate::classifier::{self, CodeArtifact};
use crate::config::{ForgeConfig, RetrySettings};
use crate::stages::{StageProgress, StageTracker};

/// Instruction block prepended to every request
pub const PRODUCTION_DIRECTIVE: &str = "\
You are a senior software engineer. Generate complete, production-grade code for the request below.
- Organise the project into clearly named files, one fenced code block per file, each tagged with its language.
- Apply appropriate design patterns (Factory, Strategy, Observer, Repository, ...) and name them in the code.
- Include unit tests for the core logic.
- Validate inputs, handle errors explicitly and follow secure defaults.
- Document public APIs and explain the architecture briefly before the code.";

/// Architecture labels attached to every successful run
pub const ARCHITECTURE_LABELS: [&str; 5] = [
    "Clean Architecture",
    "SOLID Principles",
    "Design Patterns",
    "Test-Driven Development",
    "Security First",
];

/// Products and frameworks recognised in responses, in reporting order
pub const TECHNOLOGY_VOCABULARY: [&str; 28] = [
    "React",
    "Vue",
    "Angular",
    "Svelte",
    "Next.js",
    "Node.js",
    "Express",
    "TypeScript",
    "JavaScript",
    "Python",
    "Django",
    "Flask",
    "FastAPI",
    "Spring",
    "Java",
    "Go",
    "Rust",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Redis",
    "GraphQL",
    "Docker",
    "Kubernetes",
    "AWS",
    "Tailwind",
    "Prisma",
    "Jest",
];

static TECHNOLOGY_MATCHERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    TECHNOLOGY_VOCABULARY
        .iter()
        .map(|name| {
            let pattern = format!("(?i){}", regex::escape(name));
            let matcher = Regex::new(&pattern)
                .unwrap_or_else(|e| panic!("invalid technology pattern for {name}: {e}"));
            (*name, matcher)
        })
        .collect()
});

static ANY_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```[^\n]*\n([\s\S]*?)```").unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
});

/// Why a run produced no artifacts
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Empty or whitespace-only input; no request was made
    #[error("Please describe what you want to build.")]
    Validation,

    /// The token was cancelled
    #[error("Generation cancelled")]
    Cancelled,

    /// Every attempt failed with a transport error
    #[error("Generation failed after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last: TransportError,
    },

    /// The backend answered with an unusable body
    #[error("The backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Metadata derived from the raw response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// Fixed architecture labels
    pub architecture: Vec<String>,
    /// Technologies mentioned, in vocabulary order
    pub technologies: Vec<String>,
    /// Sum of fenced block line counts in the raw text
    pub estimated_lines: usize,
}

impl GenerationMetadata {
    /// Derive metadata from the raw response text
    #[must_use]
    pub fn from_response(raw: &str) -> Self {
        Self {
            architecture: ARCHITECTURE_LABELS.iter().map(ToString::to_string).collect(),
            technologies: detect_technologies(raw),
            estimated_lines: estimate_lines(raw),
        }
    }
}

/// Result of a successful run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactSet {
    /// Response text as returned by the backend
    pub raw_response: String,
    /// Prose with the code removed
    pub narration: String,
    /// Classified code blocks, in document order
    pub artifacts: Vec<CodeArtifact>,
    /// Derived metadata
    pub metadata: GenerationMetadata,
    /// Backend attempts used
    pub attempts: u32,
}

/// Technologies mentioned anywhere in `raw`, de-duplicated, vocabulary order
///
/// Names match as literal substrings ignoring case, so "ReactJS" counts as
/// React and "javascript" counts as both Java and JavaScript.
#[must_use]
pub fn detect_technologies(raw: &str) -> Vec<String> {
    TECHNOLOGY_MATCHERS
        .iter()
        .filter(|(_, matcher)| matcher.is_match(raw))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Sum of line counts of every fenced block in `raw`; empty blocks count 0
///
/// Computed independently of the classifier, so it can differ from the sum of
/// artifact line counts (untrimmed bodies, looser fence matching).
#[must_use]
pub fn estimate_lines(raw: &str) -> usize {
    ANY_FENCE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .filter(|body| !body.as_str().trim().is_empty())
        .map(|body| body.as_str().trim_end_matches('\n').split('\n').count())
        .sum()
}

/// Wrap user text in the production directive
#[must_use]
pub fn build_prompt(user_text: &str) -> String {
    format!("{PRODUCTION_DIRECTIVE}\n\nProject request:\n{}", user_text.trim())
}

/// Settings for one orchestrator
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Options sent with each request
    pub options: GenerationOptions,
    /// Attempt limit and backoff unit
    pub retry: RetrySettings,
    /// Whether stages advance on their timer while waiting
    pub stage_timing: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            options: GenerationOptions::default(),
            retry: RetrySettings::default(),
            stage_timing: true,
        }
    }
}

impl From<&ForgeConfig> for OrchestratorConfig {
    fn from(config: &ForgeConfig) -> Self {
        Self {
            options: config.backend.options(),
            retry: config.retry.clone(),
            stage_timing: config.render.stage_timing,
        }
    }
}

/// Drives generation runs against one backend
pub struct RequestOrchestrator<B: GenerationBackend> {
    backend: Arc<B>,
    config: OrchestratorConfig,
}

impl<B: GenerationBackend> RequestOrchestrator<B> {
    /// Create an orchestrator
    pub fn new(backend: Arc<B>, config: OrchestratorConfig) -> Self {
        Self { backend, config }
    }

    /// The backend in use
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Run one generation
    ///
    /// `on_progress` receives stage updates in catalog order with
    /// non-decreasing progress; the final 100% update is sent only when the
    /// response is accepted.
    ///
    /// # Errors
    ///
    /// See [`OrchestratorError`].
    pub async fn run<F>(
        &self,
        user_text: &str,
        token: &CancellationToken,
        mut on_progress: F,
    ) -> Result<ArtifactSet, OrchestratorError>
    where
        F: FnMut(StageProgress),
    {
        if user_text.trim().is_empty() {
            return Err(OrchestratorError::Validation);
        }
        if token.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let request = GenerationRequest::new(build_prompt(user_text), self.config.options.clone());
        let mut stages = StageTracker::new();
        on_progress(stages.report());

        let (response, attempts) = self
            .request_with_retry(&request, token, &mut stages, &mut on_progress)
            .await?;

        if token.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let metadata = GenerationMetadata::from_response(&response.response);
        let artifacts = classifier::parse(&response.response);
        let narration = classifier::narration(&response.response);

        on_progress(stages.finish());
        tracing::info!(
            attempts,
            artifacts = artifacts.len(),
            estimated_lines = metadata.estimated_lines,
            technologies = ?metadata.technologies,
            "Generation succeeded"
        );

        Ok(ArtifactSet {
            raw_response: response.response,
            narration,
            artifacts,
            metadata,
            attempts,
        })
    }

    async fn request_with_retry<F>(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
        stages: &mut StageTracker,
        on_progress: &mut F,
    ) -> Result<(GenerationResponse, u32), OrchestratorError>
    where
        F: FnMut(StageProgress),
    {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if token.is_cancelled() {
                tracing::info!(attempt, "Cancelled before sending request");
                return Err(OrchestratorError::Cancelled);
            }

            tracing::debug!(attempt, max_attempts, backend = self.backend.name(), "Sending request");
            let result = self.attempt(request, token, stages, on_progress).await?;

            if token.is_cancelled() {
                tracing::info!(attempt, "Cancelled after request returned");
                return Err(OrchestratorError::Cancelled);
            }

            let err = match result {
                Ok(response) => return Ok((response, attempt)),
                Err(BackendError::InvalidResponse(reason)) => {
                    tracing::error!(attempt, %reason, "Backend returned an invalid response");
                    return Err(OrchestratorError::InvalidResponse(reason));
                }
                Err(BackendError::Transport(err)) => err,
            };

            if attempt >= max_attempts {
                tracing::error!(attempts = attempt, error = %err, "Giving up after retries");
                return Err(OrchestratorError::MaxRetriesExceeded {
                    attempts: attempt,
                    last: err,
                });
            }

            let backoff = self.config.retry.delay_after(attempt);
            tracing::warn!(
                attempt,
                error = %err,
                retry_in_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                "Request failed, retrying"
            );
            if !token.sleep(backoff).await {
                tracing::info!(attempt, "Cancelled during retry backoff");
                return Err(OrchestratorError::Cancelled);
            }
        }
    }

    /// One backend call, with stage timers running while it is in flight
    async fn attempt<F>(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
        stages: &mut StageTracker,
        on_progress: &mut F,
    ) -> Result<Result<GenerationResponse, BackendError>, OrchestratorError>
    where
        F: FnMut(StageProgress),
    {
        let call = self.backend.generate(request);
        tokio::pin!(call);

        let mut next_stage = Instant::now() + stages.current().estimated_duration;
        loop {
            let timed = self.config.stage_timing && stages.can_advance();
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(OrchestratorError::Cancelled),
                result = &mut call => return Ok(result),
                () = tokio::time::sleep_until(next_stage), if timed => {
                    if let Some(report) = stages.advance() {
                        tracing::debug!(stage = %report.stage_name, progress = report.progress, "Stage advanced");
                        next_stage = Instant::now() + stages.current().estimated_duration;
                        on_progress(report);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_prompt_wraps_user_text() {
        let prompt = build_prompt("  Build a todo app  ");
        assert!(prompt.starts_with(PRODUCTION_DIRECTIVE));
        assert!(prompt.ends_with("Project request:\nBuild a todo app"));
    }

    #[test]
    fn test_detect_technologies_vocabulary_order() {
        let raw = "We use docker and REACT with postgresql. React again. Also Express.";
        assert_eq!(
            detect_technologies(raw),
            vec!["React", "Express", "PostgreSQL", "Docker"]
        );
    }

    #[test]
    fn test_detect_technologies_literal_substrings() {
        let raw = "Built with ReactJS, NodeJS and a Dockerfile";
        assert_eq!(detect_technologies(raw), vec!["React", "Docker"]);

        let raw = "we write javascript with next.js";
        assert_eq!(
            detect_technologies(raw),
            vec!["Next.js", "JavaScript", "Java"]
        );
    }

    #[test]
    fn test_estimate_lines_sums_all_fences() {
        let raw = "a\n```js\nline1\nline2\n```\ntext\n```\nonly\n```\n";
        assert_eq!(estimate_lines(raw), 3);
        assert_eq!(estimate_lines("no code here"), 0);
    }

    #[test]
    fn test_estimate_lines_skips_empty_fences() {
        assert_eq!(estimate_lines("```js\n```"), 0);
        assert_eq!(estimate_lines("```js\n\n  \n```\n```py\nx = 1\n```"), 1);
    }

    #[test]
    fn test_metadata_labels() {
        let metadata = GenerationMetadata::from_response("");
        assert_eq!(metadata.architecture.len(), ARCHITECTURE_LABELS.len());
        assert!(metadata.technologies.is_empty());
        assert_eq!(metadata.estimated_lines, 0);
    }
}
