//! OpenAI Images client.

use super::backend::{ImageService, ServiceError, status_error};
use super::http_client;
use crate::config::{ConfigError, ImagesConfig};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SERVICE: &str = "openai";

/// Blocking client for `POST /images/generations`.
pub struct OpenAiImages {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    model: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

impl OpenAiImages {
    pub fn new(api_key: impl Into<String>, config: &ImagesConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout())?,
            api_key: api_key.into(),
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            size: config.size().to_string(),
        })
    }
}

impl ImageService for OpenAiImages {
    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/images/generations", self.endpoint);
        debug!(model = %self.model, size = %self.size, "requesting illustration");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "size": self.size,
                "n": 1,
            }))
            .send()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response));
        }

        let body: ImagesResponse = response
            .json()
            .map_err(|e| ServiceError::invalid(SERVICE, e.to_string()))?;
        extract_image(body)
    }
}

fn extract_image(body: ImagesResponse) -> Result<String, ServiceError> {
    body.data
        .into_iter()
        .next()
        .and_then(|d| d.b64_json)
        .filter(|b64| !b64.is_empty())
        .ok_or_else(|| ServiceError::invalid(SERVICE, "response contained no image data"))
}

impl std::fmt::Debug for OpenAiImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImages")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
