//! Service traits and shared error type.
//!
//! The pipeline only talks to [`TextService`] and [`ImageService`]; the HTTP
//! clients in [`gemini`](super::gemini), [`openai`](super::openai) and
//! [`imagen`](super::imagen) are the production implementations. Every call
//! is a single attempt bounded by the client's timeout.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} request timed out")]
    Timeout { service: &'static str },
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },
    #[error("{service} returned an unusable response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    /// Classify a transport error, keeping timeouts distinct.
    pub(crate) fn from_reqwest(service: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ServiceError::Timeout { service }
        } else {
            ServiceError::Http { service, source }
        }
    }

    pub(crate) fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::InvalidResponse {
            service,
            message: message.into(),
        }
    }
}

/// Hosted text generation: prompt in, generated text out.
pub trait TextService: Sync {
    fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Hosted image generation: styled scene description in, base64 image out.
pub trait ImageService: Sync {
    fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Turn a non-success HTTP response into [`ServiceError::Status`].
///
/// Providers wrap their messages as `{"error": {"message": "…"}}`; the raw
/// body is used when it isn't shaped like that.
pub(crate) fn status_error(
    service: &'static str,
    response: reqwest::blocking::Response,
) -> ServiceError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .unwrap_or_else(|_| "unknown error".to_string());
    ServiceError::Status {
        service,
        status,
        message: error_message(&body),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
