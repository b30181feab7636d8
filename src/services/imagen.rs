//! Imagen client, an alternative illustration provider on the Gemini API key.

use super::backend::{ImageService, ServiceError, status_error};
use super::http_client;
use crate::config::{ConfigError, ImagesConfig};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SERVICE: &str = "imagen";

/// Blocking client for `models/imagen-*:predict`.
pub struct ImagenImages {
    client: reqwest::blocking::Client,
    api_key: String,
    endpoint: String,
    model: String,
    size: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

impl ImagenImages {
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

impl ImageService for ImagenImages {
    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/{}:predict", self.endpoint, self.model);
        debug!(model = %self.model, size = %self.size, "requesting illustration");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "instances": [{ "prompt": prompt }],
                "parameters": { "sampleCount": 1, "imageSize": self.size },
            }))
            .send()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response));
        }

        let body: PredictResponse = response
            .json()
            .map_err(|e| ServiceError::invalid(SERVICE, e.to_string()))?;
        extract_image(body)
    }
}

fn extract_image(body: PredictResponse) -> Result<String, ServiceError> {
    body.predictions
        .into_iter()
        .next()
        .and_then(|p| p.bytes_base64_encoded)
        .filter(|b64| !b64.is_empty())
        .ok_or_else(|| ServiceError::invalid(SERVICE, "response contained no image data"))
}

impl std::fmt::Debug for ImagenImages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagenImages")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
