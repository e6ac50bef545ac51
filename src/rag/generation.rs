//! Generation service client.
//!
//! Talks to an OpenAI/Mistral-compatible chat completions endpoint and folds
//! every result into a [`GenerationOutcome`] instead of an error.

use super::conversation::Turn;
use crate::config::GenerationSettings;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The model's answer text.
    Answer(String),
    /// Non-success status or transport failure, with the raw diagnostic.
    ServiceError(String),
    /// Success status, but the body lacked the answer field.
    MalformedResponse(String),
}

impl GenerationOutcome {
    /// Whether the service produced an answer.
    pub fn is_answer(&self) -> bool {
        matches!(self, GenerationOutcome::Answer(_))
    }

    /// Text shown to the user for this outcome.
    pub fn into_answer_text(self) -> String {
        match self {
            GenerationOutcome::Answer(text) => text,
            GenerationOutcome::ServiceError(detail) => {
                format!("Generation service error: {}", detail)
            }
            GenerationOutcome::MalformedResponse(detail) => {
                format!("Unexpected response from generation service: {}", detail)
            }
        }
    }
}

/// Turns an ordered message list into an answer.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Issue one request; never retries.
    async fn generate(&self, messages: &[Turn], temperature: f32) -> GenerationOutcome;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
}

/// Blocking-per-call HTTP client for the generation service.
pub struct HttpGenerator {
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    /// Create a client posting to `api_url`.
    pub fn new(http: reqwest::Client, api_url: &str, model: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Build the client from settings, reading the key from the environment.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = crate::openai::api_key_from_env(&settings.api_key_env)?;
        let http = crate::openai::create_http_client(Duration::from_secs(settings.timeout_secs))?;
        Ok(Self::new(http, &settings.api_url, &settings.model).with_api_key(api_key))
    }

    /// Use a different model for this client.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn generate(&self, messages: &[Turn], temperature: f32) -> GenerationOutcome {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let mut request = self.http.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Generation request failed: {}", e);
                return GenerationOutcome::ServiceError(e.to_string());
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read generation response body: {}", e);
                return GenerationOutcome::ServiceError(format!("HTTP {}: {}", status, e));
            }
        };

        let outcome = interpret_response(status, &text);
        debug!("Generation finished with status {}", status);
        outcome
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Classify a raw HTTP response.
pub fn interpret_response(status: StatusCode, body: &str) -> GenerationOutcome {
    if !status.is_success() {
        return GenerationOutcome::ServiceError(format!("HTTP {}: {}", status, body));
    }

    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            return GenerationOutcome::MalformedResponse(format!("body is not valid JSON ({})", e))
        }
    };

    match json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(content) => GenerationOutcome::Answer(content.to_string()),
        None => GenerationOutcome::MalformedResponse(format!(
            "missing choices[0].message.content in {}",
            body
        )),
    }
}
