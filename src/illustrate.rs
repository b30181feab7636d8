//! Illustration resolution: scene description → image file on disk.
//!
//! The resolver is the only place that pays for image generation. Every
//! description is keyed by [`content_key`] of its trimmed text; a hit in the
//! [`CacheStore`] returns the existing file without touching the service.
//!
//! On a miss the description is wrapped in the fixed picture-book style
//! ([`styled_prompt`]), sent to the [`ImageService`] once, decoded from base64
//! and verified as an image before anything is written. Payloads in formats
//! other than PNG are re-encoded so every cached file is a real PNG.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheStore, content_key};
use crate::services::{ImageService, ServiceError};

/// Prepended to every description before it is sent to the image service.
pub const STYLE_PREAMBLE: &str = "Children's picture book illustration. \
Soft watercolor style. Simple shapes. Pastel colors. No text. Kid-safe.";

#[derive(Error, Debug)]
pub enum IllustrationError {
    #[error("illustration failed for \"{description}\": {source}")]
    Service {
        description: String,
        #[source]
        source: ServiceError,
    },
    #[error("illustration for \"{description}\" could not be decoded: {message}")]
    Decode {
        description: String,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether a resolved illustration came from the cache or the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    Cached,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub status: ResolveStatus,
}

/// The exact prompt sent for a description.
pub fn styled_prompt(description: &str) -> String {
    format!("{STYLE_PREAMBLE} Scene to illustrate: {}", description.trim())
}

pub struct IllustrationResolver<'a, S: ImageService + ?Sized> {
    service: &'a S,
    store: &'a CacheStore,
    read_cache: bool,
}

impl<'a, S: ImageService + ?Sized> IllustrationResolver<'a, S> {
    pub fn new(service: &'a S, store: &'a CacheStore) -> Self {
        Self {
            service,
            store,
            read_cache: true,
        }
    }

    /// Always call the service, overwriting whatever the cache holds.
    pub fn without_cache_reads(mut self) -> Self {
        self.read_cache = false;
        self
    }

    /// Path of the illustration for `description`, generating it if needed.
    pub fn resolve(&self, description: &str) -> Result<Resolved, IllustrationError> {
        let description = description.trim();
        let key = content_key(description);

        if self.read_cache
            && let Some(path) = self.store.get(&key)
        {
            debug!(key = %key, "illustration cache hit");
            return Ok(Resolved {
                path,
                status: ResolveStatus::Cached,
            });
        }

        info!(key = %key, "generating illustration");
        let payload = self
            .service
            .generate(&styled_prompt(description))
            .map_err(|source| IllustrationError::Service {
                description: description.to_string(),
                source,
            })?;

        let png = decode_payload(&payload).map_err(|message| IllustrationError::Decode {
            description: description.to_string(),
            message,
        })?;
        let path = self.store.put(&key, &png)?;

        Ok(Resolved {
            path,
            status: ResolveStatus::Generated,
        })
    }
}

/// Base64 → verified PNG bytes.
fn decode_payload(payload: &str) -> Result<Vec<u8>, String> {
    let compact: String = payload.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64: {e}"))?;
    if bytes.is_empty() {
        return Err("empty image payload".into());
    }

    let format = image::guess_format(&bytes).map_err(|e| e.to_string())?;
    let img = image::load_from_memory_with_format(&bytes, format).map_err(|e| e.to_string())?;
    if format == ImageFormat::Png {
        return Ok(bytes);
    }

    debug!(?format, "re-encoding illustration as PNG");
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::tests::MockImages;
    use crate::test_helpers::{jpeg_bytes, png_base64};
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> CacheStore {
        CacheStore::new(tmp.path().join("generated_images"))
    }

    #[test]
    fn styled_prompt_wraps_description() {
        let prompt = styled_prompt("  A whale singing  ");
        assert!(prompt.starts_with("Children's picture book illustration."));
        assert!(prompt.contains("Soft watercolor style."));
        assert!(prompt.ends_with("Scene to illustrate: A whale singing"));
    }

    #[test]
    fn miss_generates_and_stores_png() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning(png_base64(4, 4));
        let resolver = IllustrationResolver::new(&service, &store);

        let resolved = resolver.resolve("A whale singing").unwrap();
        assert_eq!(resolved.status, ResolveStatus::Generated);
        assert_eq!(
            resolved.path,
            store.path_for(&content_key("A whale singing"))
        );
        assert!(std::fs::metadata(&resolved.path).unwrap().len() > 0);
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn second_resolve_is_a_cache_hit() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning(png_base64(4, 4));
        let resolver = IllustrationResolver::new(&service, &store);

        let first = resolver.resolve("A whale singing").unwrap();
        let second = resolver.resolve("  A whale singing ").unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(second.status, ResolveStatus::Cached);
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn without_cache_reads_always_calls_service() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning(png_base64(4, 4));

        IllustrationResolver::new(&service, &store)
            .resolve("A whale singing")
            .unwrap();
        let again = IllustrationResolver::new(&service, &store)
            .without_cache_reads()
            .resolve("A whale singing")
            .unwrap();
        assert_eq!(again.status, ResolveStatus::Generated);
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn zero_byte_entry_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.path_for(&content_key("A fox")), b"").unwrap();

        let service = MockImages::returning(png_base64(4, 4));
        let resolved = IllustrationResolver::new(&service, &store)
            .resolve("A fox")
            .unwrap();
        assert_eq!(resolved.status, ResolveStatus::Generated);
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn service_failure_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning(png_base64(4, 4)).failing_on("dragon");

        let err = IllustrationResolver::new(&service, &store)
            .resolve("A dragon")
            .unwrap_err();
        assert!(matches!(err, IllustrationError::Service { .. }));
        assert!(store.get(&content_key("A dragon")).is_none());
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning(STANDARD.encode(b"definitely not an image"));

        let err = IllustrationResolver::new(&service, &store)
            .resolve("A cloud")
            .unwrap_err();
        assert!(matches!(err, IllustrationError::Decode { .. }));
        assert!(store.get(&content_key("A cloud")).is_none());
    }

    #[test]
    fn invalid_base64_is_a_decode_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning("%%% not base64 %%%");

        let err = IllustrationResolver::new(&service, &store)
            .resolve("A cloud")
            .unwrap_err();
        assert!(err.to_string().contains("invalid base64"));
    }

    #[test]
    fn jpeg_payload_is_stored_as_png() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let service = MockImages::returning(STANDARD.encode(jpeg_bytes(6, 4)));

        let resolved = IllustrationResolver::new(&service, &store)
            .resolve("A moon")
            .unwrap();
        let bytes = std::fs::read(&resolved.path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }
}
