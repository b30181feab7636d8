//! Shared test utilities for the bedtime-whys test suite.
//!
//! Provides well-formed model responses, tiny encoded images, and builders for
//! books whose illustrations actually exist on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let raw = tagged_response(&[("The sky is big.", "A wide blue sky")]);
//! let pages = parse(&raw);
//!
//! let tmp = TempDir::new().unwrap();
//! let book = book_on_disk(tmp.path(), "abc123", 3);
//! assert_eq!(book.pages.len(), 3);
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

use crate::types::{Age, Book, Page, Tone};

// =========================================================================
// Model responses
// =========================================================================

/// One page in the tagged grammar.
pub fn tagged_page(text: &str, image: &str) -> String {
    format!("<PAGE>\n<TEXT>{text}</TEXT>\n<IMAGE>{image}</IMAGE>\n</PAGE>\n")
}

/// A full tagged response made of `(text, image)` pairs.
pub fn tagged_response(pages: &[(&str, &str)]) -> String {
    pages
        .iter()
        .map(|(text, image)| tagged_page(text, image))
        .collect()
}

// =========================================================================
// Encoded images
// =========================================================================

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 37 % 256) as u8, (y * 59 % 256) as u8, 180])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// PNG bytes of a small gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

/// JPEG bytes of a small gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

/// Base64 PNG, the shape image services return.
pub fn png_base64(width: u32, height: u32) -> String {
    STANDARD.encode(png_bytes(width, height))
}

// =========================================================================
// Books
// =========================================================================

/// A page whose illustration is written to `dir/<name>.png`.
pub fn page_on_disk(dir: &Path, name: &str, text: &str) -> Page {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{name}.png"));
    std::fs::write(&path, png_bytes(8, 6)).unwrap();
    Page {
        text: text.to_string(),
        illustration_description: format!("scene for {name}"),
        image_path: path.to_string_lossy().into_owned(),
    }
}

/// A book with `pages` illustrated pages stored under `dir`.
pub fn book_on_disk(dir: &Path, key: &str, pages: usize) -> Book {
    Book {
        key: key.to_string(),
        title: format!("Why {key}?"),
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 20, 15, 0).unwrap(),
        question: Some(format!("why {key}?")),
        age: Age::new(6),
        tone: Some(Tone::Gentle),
        pages: (1..=pages)
            .map(|n| page_on_disk(dir, &format!("{key}-{n}"), &format!("Page {n} of {key}.")))
            .collect(),
    }
}
