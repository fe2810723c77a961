//! Generation Backend Traits
//!
//! The backend is an opaque request/response boundary: a prompt goes in, a
//! block of text comes back. The orchestrator only needs to know whether a
//! failure is worth retrying, which [`BackendError`] encodes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling options sent with every request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Backend-specific model identifier
    pub model: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
            model: "default".to_string(),
        }
    }
}

/// Request body for the generation endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Full prompt, directive included
    pub prompt: String,
    /// Sampling options
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Create a request with the given prompt and options
    pub fn new(prompt: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            prompt: prompt.into(),
            options,
        }
    }
}

/// Response body from the generation endpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text: prose and fenced code
    pub response: String,
    /// Whether the backend considers the request successful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Backend-supplied failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A failure to obtain a usable response
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be delivered or answered; worth retrying
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend answered with a body that cannot be used; not retried
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

/// Retryable delivery failures
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, timeout or other network failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// 2xx status but the body reports `success: false`
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// Generation backend trait
///
/// Implement this to plug in a different provider or a scripted test double.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send one request and wait for the complete response
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError>;
}
