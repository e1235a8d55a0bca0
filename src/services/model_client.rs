//! Client for the external generation API (Gemini-style `generateContent`).
//!
//! This is a pure I/O adapter: it sends assembled prompt parts and returns the
//! model's raw text unmodified. No parsing or repair happens here - the
//! normalizer's heuristics depend on seeing exactly what the model sent,
//! including any markdown fencing. No retries either; retry policy belongs to
//! callers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model API unavailable: {0}")]
    Unavailable(String),

    #[error("model API returned no text content")]
    EmptyResponse,
}

/// One part of a prompt: the assembled instruction text, or an inline
/// base64 attachment with its MIME type.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text(String),
    Inline { mime_type: String, data: String },
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Generation backends the estimate pipeline can drive. `ModelClient` is
/// the production implementation; tests substitute canned ones.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// The configured model id, used as the estimate's dataSource tag.
    fn model_name(&self) -> &str;

    /// Send prompt parts to the model and return the raw response text.
    async fn generate(&self, parts: &[PromptPart]) -> Result<String, ModelError>;
}

/// Client for the generation API.
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ModelClient {
    /// Create a new model API client.
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, model = model, "Model client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    // The key travels in a header, never the URL: reqwest errors echo the
    // request URL, and those strings end up in logs.
    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    async fn generate_text(&self, parts: &[PromptPart]) -> Result<String, ModelError> {
        let request_parts: Vec<RequestPart<'_>> = parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => RequestPart {
                    text: Some(text.as_str()),
                    inline_data: None,
                },
                PromptPart::Inline { mime_type, data } => RequestPart {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.as_str(),
                        data: data.as_str(),
                    }),
                },
            })
            .collect();

        let body = GenerateRequest {
            contents: [RequestContent {
                parts: request_parts,
            }],
        };

        debug!(model = %self.model, parts = parts.len(), "Model API request");

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Model API request failed");
                ModelError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "Model API error");
            return Err(ModelError::Unavailable(format!("HTTP {status}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to decode model API envelope");
            ModelError::Unavailable(e.to_string())
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or(ModelError::EmptyResponse)
    }

    /// Check model API reachability (used by the health endpoint and the
    /// startup probe).
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .get(self.models_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Model API probe failed")?
            .error_for_status()
            .context("Model API unhealthy")?;

        Ok(())
    }
}

#[async_trait]
impl TextModel for ModelClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[PromptPart]) -> Result<String, ModelError> {
        self.generate_text(parts).await
    }
}
