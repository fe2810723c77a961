//! HTTP Backend Implementation
//!
//! Posts `{ prompt, options }` as JSON to a single generation endpoint and
//! expects `{ response, success?, error? }` back.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{
    BackendError, GenerationBackend, GenerationRequest, GenerationResponse, TransportError,
};
use crate::config::BackendSettings;

/// Generation backend reached over HTTP
#[derive(Clone, Debug)]
pub struct HttpBackend {
    /// Full URL of the generation endpoint
    endpoint: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for `endpoint` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// Create from the `[backend]` configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, TransportError> {
        Self::new(
            settings.endpoint.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// The configured endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Body as sent on the wire; `response` may be absent on failure
#[derive(Debug, Deserialize)]
struct ResponseBody {
    response: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret a status code and body text
///
/// Non-2xx and `success: false` are transport failures, whether or not the
/// body carries `response`. A 2xx body that does not decode, or that reports
/// success without `response`, is an invalid response.
pub(crate) fn interpret_response(
    status: u16,
    body: &str,
) -> Result<GenerationResponse, BackendError> {
    if !(200..300).contains(&status) {
        return Err(TransportError::Status {
            status,
            body: body.to_string(),
        }
        .into());
    }

    let parsed: ResponseBody =
        serde_json::from_str(body).map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

    if parsed.success == Some(false) {
        let reason = parsed
            .error
            .unwrap_or_else(|| "no error message provided".to_string());
        return Err(TransportError::Rejected(reason).into());
    }

    let Some(response) = parsed.response else {
        return Err(BackendError::InvalidResponse(
            "missing field `response`".to_string(),
        ));
    };

    Ok(GenerationResponse {
        response,
        success: parsed.success,
        error: parsed.error,
    })
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        tracing::debug!(
            status,
            bytes = body.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Backend responded"
        );

        interpret_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation() {
        let backend = HttpBackend::new("http://localhost:3000/api/generate", Duration::from_secs(5))
            .unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:3000/api/generate");
        assert_eq!(backend.name(), "HTTP");
    }

    #[test]
    fn test_from_settings() {
        let settings = BackendSettings {
            endpoint: "http://example.com/gen".to_string(),
            ..BackendSettings::default()
        };
        let backend = HttpBackend::from_settings(&settings).unwrap();
        assert_eq!(backend.endpoint(), "http://example.com/gen");
    }

    #[test]
    fn test_success_body() {
        let response = interpret_response(200, r#"{"response": "ok", "success": true}"#).unwrap();
        assert_eq!(response.response, "ok");
    }

    #[test]
    fn test_non_2xx_is_transport_error() {
        let err = interpret_response(502, "bad gateway").unwrap_err();
        assert!(matches!(
            err,
            BackendError::Transport(TransportError::Status { status: 502, .. })
        ));
    }

    #[test]
    fn test_reported_failure_is_transport_error() {
        let err =
            interpret_response(200, r#"{"response": "", "success": false, "error": "quota"}"#)
                .unwrap_err();
        match err {
            BackendError::Transport(TransportError::Rejected(reason)) => {
                assert_eq!(reason, "quota");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_without_response_field_keeps_backend_error() {
        let err = interpret_response(200, r#"{"success": false, "error": "quota exceeded"}"#)
            .unwrap_err();
        match err {
            BackendError::Transport(TransportError::Rejected(reason)) => {
                assert_eq!(reason, "quota exceeded");
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        assert!(matches!(
            interpret_response(200, r#"{"success": false}"#),
            Err(BackendError::Transport(TransportError::Rejected(_)))
        ));
    }

    #[test]
    fn test_malformed_body_is_invalid_response() {
        assert!(matches!(
            interpret_response(200, "<html>oops</html>"),
            Err(BackendError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, r#"{"text": "missing response field"}"#),
            Err(BackendError::InvalidResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, r#"{"success": true}"#),
            Err(BackendError::InvalidResponse(_))
        ));
    }
}
