//! # Generation client
//!
//! Sends an assembled [`Payload`] to a locally hosted text-generation service
//! and hands back the raw reply.
//!
//! [`OllamaClient`] speaks the Ollama `/api/generate` protocol:
//!
//! ```text
//! POST <endpoint>  {"model": "...", "prompt": "...", "stream": false}
//! 200              {"response": "...", ...}
//! ```
//!
//! Every call is a fresh request; nothing is cached and nothing is retried.
//! Retry policy belongs to the caller, which sees each failure as a typed
//! [`GenerationError`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

use crate::assembler::Payload;
use crate::error::GenerationError;

/// A text-generation backend.
pub trait Generator: Send + Sync {
    /// Return the full reply text for `payload`, unmodified.
    fn generate(
        &self,
        payload: &Payload,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Client for an Ollama-compatible generation endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    /// Build a client; `timeout` bounds each whole request.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::ServiceUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generator for OllamaClient {
    async fn generate(&self, payload: &Payload) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: payload.as_str(),
            stream: false,
        };
        debug!(
            "Sending {} byte prompt to {} (model {})",
            payload.len(),
            self.endpoint,
            self.model
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Generation request failed: {e}");
                GenerationError::ServiceUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            error!("Generation service returned {status}");
            return Err(GenerationError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::ServiceUnavailable(e.to_string())
            } else {
                GenerationError::MalformedResponse(e.to_string())
            }
        })?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        parsed.response.ok_or_else(|| {
            GenerationError::MalformedResponse("missing `response` field".to_string())
        })
    }
}
