//! HTTP transport for `models/{model}:generateContent`.

use crate::wire::{GenerateContentRequest, GenerateContentResponse};
use async_trait::async_trait;
use aura_core::RemoteError;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("missing API key")]
    MissingApiKey,
}

impl From<TransportError> for RemoteError {
    fn from(e: TransportError) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

/// Anything that can answer a `generateContent` call.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError>;
}

/// Authenticated client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TransportError::MissingApiKey);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            api_key,
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError> {
        let url = self.endpoint(model);
        tracing::debug!(%model, "sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%model, status = status.as_u16(), "generateContent rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        let client = GeminiClient::new("k", "https://example.test/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(matches!(
            GeminiClient::new("  ", DEFAULT_API_BASE, DEFAULT_TIMEOUT),
            Err(TransportError::MissingApiKey)
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = GeminiClient::new("secret-key", DEFAULT_API_BASE, DEFAULT_TIMEOUT).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("secret-key"));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message("  upstream down \n"), "upstream down");
    }

    #[test]
    fn test_transport_error_into_remote() {
        let err: RemoteError = TransportError::Status {
            status: 503,
            message: "overloaded".into(),
        }
        .into();
        assert_eq!(
            err,
            RemoteError::Transport("API returned 503: overloaded".into())
        );
    }
}
