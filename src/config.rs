//! Application configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by an optional `config.toml` in the root directory; credentials
//! never live in the file and are read from the environment.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [text]
//! model = "models/gemini-flash-latest"
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! timeout_secs = 60
//!
//! [images]
//! provider = "openai"        # or "imagen"
//! # model, endpoint and size default per provider
//! timeout_secs = 120
//!
//! [storage]
//! images_dir = "generated_images"
//! library_file = "library.json"
//!
//! [export]
//! page_width = 612.0         # points (US Letter)
//! page_height = 792.0
//! margin = 48.0
//! image_height = 420.0       # height of the illustration region
//! font = "Helvetica"         # one of the PDF standard fonts
//! font_size = 16.0
//! line_height = 22.0
//! wrap_width = 58            # characters per line
//! jpeg_quality = 85
//!
//! [processing]
//! max_processes = 4          # parallel illustration requests (omit for auto)
//! ```
//!
//! ## Credentials
//!
//! | Variable | Used for |
//! |---|---|
//! | `GEMINI_API_KEY` | text generation, Imagen illustrations |
//! | `OPENAI_API_KEY` | OpenAI illustrations |
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "config.toml";
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("{0} is not set; export it before generating a book")]
    MissingCredential(&'static str),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub text: TextConfig,
    pub images: ImagesConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text.timeout_secs == 0 || self.images.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if self.text.model.trim().is_empty() {
            return Err(ConfigError::Validation("text.model must not be empty".into()));
        }
        let e = &self.export;
        if e.page_width <= 0.0 || e.page_height <= 0.0 {
            return Err(ConfigError::Validation(
                "export page size must be positive".into(),
            ));
        }
        if e.margin < 0.0 || e.margin * 2.0 >= e.page_width.min(e.page_height) {
            return Err(ConfigError::Validation(
                "export.margin leaves no room on the page".into(),
            ));
        }
        if e.image_height <= 0.0 || e.image_height + e.margin * 2.0 >= e.page_height {
            return Err(ConfigError::Validation(
                "export.image_height leaves no room for text".into(),
            ));
        }
        if e.font_size <= 0.0 || e.line_height <= 0.0 {
            return Err(ConfigError::Validation(
                "export.font_size and export.line_height must be positive".into(),
            ));
        }
        if e.wrap_width == 0 {
            return Err(ConfigError::Validation(
                "export.wrap_width must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&e.jpeg_quality) {
            return Err(ConfigError::Validation(
                "export.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            model: "models/gemini-flash-latest".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

impl TextConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which hosted service draws the illustrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Imagen,
}

/// Illustration settings. `model`, `endpoint` and `size` default per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub provider: ImageProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            provider: ImageProvider::default(),
            model: None,
            endpoint: None,
            size: None,
            timeout_secs: 120,
        }
    }
}

impl ImagesConfig {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(match self.provider {
            ImageProvider::OpenAi => "gpt-image-1",
            ImageProvider::Imagen => "models/imagen-4.0-generate-001",
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(match self.provider {
            ImageProvider::OpenAi => "https://api.openai.com/v1",
            ImageProvider::Imagen => "https://generativelanguage.googleapis.com/v1beta",
        })
    }

    pub fn size(&self) -> &str {
        self.size.as_deref().unwrap_or(match self.provider {
            ImageProvider::OpenAi => "1024x1024",
            ImageProvider::Imagen => "1K",
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// On-disk locations, relative to the root directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub images_dir: PathBuf,
    pub library_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("generated_images"),
            library_file: PathBuf::from("library.json"),
        }
    }
}

impl StorageConfig {
    pub fn images_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.images_dir)
    }

    pub fn library_file(&self, root: &Path) -> PathBuf {
        root.join(&self.library_file)
    }
}

/// PDF layout settings. Lengths are in PDF points (1/72 inch).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    /// Height of the illustration region at the top of the page.
    pub image_height: f32,
    /// Preferred font; must be one of the PDF standard-14 fonts.
    pub font: String,
    pub font_size: f32,
    pub line_height: f32,
    /// Maximum characters per wrapped line.
    pub wrap_width: usize,
    pub jpeg_quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 48.0,
            image_height: 420.0,
            font: "Helvetica".to_string(),
            font_size: 16.0,
            line_height: 22.0,
            wrap_width: 58,
            jpeg_quality: 85,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of illustrations requested at once.
    /// When absent, defaults to the number of CPU cores.
    /// Requests spend their time waiting on the network, so values above the
    /// core count are honored up to [`MAX_PARALLEL_REQUESTS`].
    pub max_processes: Option<usize>,
}

/// Upper bound on concurrent illustration requests.
pub const MAX_PARALLEL_REQUESTS: usize = 16;

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `n`, clamped to `1..=MAX_PARALLEL_REQUESTS`
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    match config.max_processes {
        Some(n) => n.clamp(1, MAX_PARALLEL_REQUESTS),
        None => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}

/// API keys taken from the environment.
#[derive(Clone, Default)]
pub struct Credentials {
    pub gemini: Option<String>,
    pub openai: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        Self {
            gemini: read(GEMINI_KEY_VAR),
            openai: read(OPENAI_KEY_VAR),
        }
    }

    pub fn require_gemini(&self) -> Result<&str, ConfigError> {
        self.gemini
            .as_deref()
            .ok_or(ConfigError::MissingCredential(GEMINI_KEY_VAR))
    }

    pub fn require_openai(&self) -> Result<&str, ConfigError> {
        self.openai
            .as_deref()
            .ok_or(ConfigError::MissingCredential(OPENAI_KEY_VAR))
    }

    /// Check every key the configured providers need, before any request.
    pub fn check(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.require_gemini()?;
        if config.images.provider == ImageProvider::OpenAi {
            self.require_openai()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Credentials")
            .field("gemini", &mask(&self.gemini))
            .field("openai", &mask(&self.openai))
            .finish()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(root: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# bedtime-whys configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# API keys are read from the environment, never from this file:
#   GEMINI_API_KEY  text generation (and Imagen illustrations)
#   OPENAI_API_KEY  OpenAI illustrations

# ---------------------------------------------------------------------------
# Text generation
# ---------------------------------------------------------------------------
[text]
model = "models/gemini-flash-latest"
endpoint = "https://generativelanguage.googleapis.com/v1beta"
# A request that takes longer than this fails the book.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Illustrations
# ---------------------------------------------------------------------------
[images]
# "openai" (gpt-image-1, 1024x1024) or "imagen" (imagen-4.0, 1K).
provider = "openai"
# model = "gpt-image-1"
# endpoint = "https://api.openai.com/v1"
# size = "1024x1024"
timeout_secs = 120

# ---------------------------------------------------------------------------
# Storage (relative paths are resolved against --root)
# ---------------------------------------------------------------------------
[storage]
images_dir = "generated_images"
library_file = "library.json"

# ---------------------------------------------------------------------------
# PDF export (lengths in points, 72 per inch)
# ---------------------------------------------------------------------------
[export]
page_width = 612.0
page_height = 792.0
margin = 48.0
# Height of the illustration region at the top of each page.
image_height = 420.0
# Any PDF standard font: Helvetica, Times-Roman, Courier, and their
# Bold/Oblique/Italic variants. Anything else falls back to Helvetica.
font = "Helvetica"
font_size = 16.0
line_height = 22.0
# Characters per line before the narrative wraps.
wrap_width = 58
jpeg_quality = 85

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum illustrations requested in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# Illustration requests are network-bound, so values above the core count
# are fine (at most 16).
# max_processes = 4
"##
}
