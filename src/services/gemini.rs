//! Gemini text generation client.

use super::backend::{ServiceError, TextService, status_error};
use super::http_client;
use crate::config::{ConfigError, TextConfig};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SERVICE: &str = "gemini";

/// Blocking client for `models/*:generateContent`.
pub struct GeminiText {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// A model advertised by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl GeminiText {
    pub fn new(api_key: impl Into<String>, config: &TextConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout())?,
            api_key: api_key.into(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Models visible to this API key.
    pub fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        let url = format!("{}/models", self.endpoint);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response));
        }
        let list: ModelList = response
            .json()
            .map_err(|e| ServiceError::invalid(SERVICE, e.to_string()))?;
        Ok(list.models)
    }
}

impl TextService for GeminiText {
    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting text");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| ServiceError::invalid(SERVICE, e.to_string()))?;
        extract_text(body)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: GenerateResponse) -> Result<String, ServiceError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ServiceError::invalid(SERVICE, "response contained no text"));
    }
    Ok(text)
}

impl std::fmt::Debug for GeminiText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiText")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
