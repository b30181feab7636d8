//! Shared types used across the pipeline, the library index and the renderers.
//!
//! [`Book`] and [`Page`] are serialized into the library index file, so their
//! field names are part of the on-disk format:
//!
//! ```json
//! [{"key": "…", "title": "…", "createdAt": "…",
//!   "pages": [{"text": "…", "illustrationDescription": "…", "imagePath": "…"}]}]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the explanation should feel.
///
/// Serialized by its display label, which is also what goes into the prompt
/// and the fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Tone {
    #[serde(rename = "Gentle & soothing")]
    Gentle,
    #[serde(rename = "Funny")]
    Funny,
    #[serde(rename = "Curious explorer")]
    Curious,
    #[serde(rename = "Simple & direct")]
    Direct,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Gentle, Tone::Funny, Tone::Curious, Tone::Direct];

    pub fn label(self) -> &'static str {
        match self {
            Tone::Gentle => "Gentle & soothing",
            Tone::Funny => "Funny",
            Tone::Curious => "Curious explorer",
            Tone::Direct => "Simple & direct",
        }
    }

    /// Reverse of [`Tone::label`], case-insensitive.
    pub fn from_label(label: &str) -> Option<Tone> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Child's age in years, within `[Age::MIN, Age::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Age(u8);

impl Age {
    pub const MIN: u8 = 3;
    pub const MAX: u8 = 10;

    pub fn new(years: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&years).then_some(Self(years))
    }

    pub fn years(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Age {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Age::new(value).ok_or_else(|| {
            format!(
                "age must be between {} and {}, got {value}",
                Age::MIN,
                Age::MAX
            )
        })
    }
}

impl From<Age> for u8 {
    fn from(age: Age) -> u8 {
        age.0
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of a storybook: a single idea plus its illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Cleaned, child-facing narrative.
    pub text: String,
    /// Scene description the illustration was generated from.
    pub illustration_description: String,
    /// Path of the cached illustration on disk.
    pub image_path: String,
}

/// A complete generated storybook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Fingerprint of the normalized (question, age, tone).
    pub key: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Age>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    pub pages: Vec<Page>,
}

/// Display title for a question: whitespace collapsed, first letter capitalized.
pub fn book_title(question: &str) -> String {
    let collapsed = question.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
