//! Hosted generation services.
//!
//! | Concern | Service | Client |
//! |---|---|---|
//! | Narrative text | Gemini `generateContent` | [`GeminiText`] |
//! | Illustrations | OpenAI Images | [`OpenAiImages`] |
//! | Illustrations (alternative) | Imagen `predict` | [`ImagenImages`] |
//!
//! The module is split into:
//! - **Backend**: [`TextService`] / [`ImageService`] traits + [`ServiceError`]
//! - **Clients**: one blocking `reqwest` client per provider

pub mod backend;
pub mod gemini;
pub mod imagen;
pub mod openai;

pub use backend::{ImageService, ServiceError, TextService};
pub use gemini::GeminiText;
pub use imagen::ImagenImages;
pub use openai::OpenAiImages;

use crate::config::{AppConfig, ConfigError, Credentials, ImageProvider};

/// Image client selected by `[images] provider`.
pub enum Illustrator {
    OpenAi(OpenAiImages),
    Imagen(ImagenImages),
}

impl Illustrator {
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self, ConfigError> {
        Ok(match config.images.provider {
            ImageProvider::OpenAi => {
                let key = credentials.require_openai()?;
                Illustrator::OpenAi(OpenAiImages::new(key, &config.images)?)
            }
            ImageProvider::Imagen => {
                let key = credentials.require_gemini()?;
                Illustrator::Imagen(ImagenImages::new(key, &config.images)?)
            }
        })
    }
}

impl ImageService for Illustrator {
    fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        match self {
            Illustrator::OpenAi(client) => client.generate(prompt),
            Illustrator::Imagen(client) => client.generate(prompt),
        }
    }
}

/// Build a blocking HTTP client with a request timeout.
pub(crate) fn http_client(
    timeout: std::time::Duration,
) -> Result<reqwest::blocking::Client, ConfigError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Validation(format!("cannot build HTTP client: {e}")))
}
