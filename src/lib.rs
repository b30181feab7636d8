//! # Bedtime Whys
//!
//! Illustrated picture-book answers to children's "why?" questions. A parent
//! types a question, picks the child's age and a tone, and gets back a short
//! storybook: a handful of pages, each one simple idea with a soft watercolor
//! illustration.
//!
//! # Architecture: One Pipeline, Two Caches
//!
//! ```text
//! question, age, tone
//!   │
//!   ├─ fingerprint ──► Library (library.json)        hit → done, no API calls
//!   │
//!   ├─ prompt ──► TextService ──► parse + clean ──► pages
//!   │
//!   └─ per page ──► IllustrationResolver ──► CacheStore (generated_images/)
//!                        │ miss
//!                        └─► ImageService
//! ```
//!
//! Generated text and images cost money and time, so both levels are cached:
//! whole books by the fingerprint of the request, single illustrations by the
//! content hash of their scene description. A repeated question makes no
//! external calls at all; a new question that reuses a scene pays only for the
//! scenes it has not seen.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`story`] | The pipeline: library lookup, generation, illustration, persistence |
//! | [`prompt`] | Text-generation prompt with the page grammar |
//! | [`parse`] | Page extraction from the generated text and narrative cleaning |
//! | [`services`] | Gemini text, OpenAI / Imagen illustrations behind two traits |
//! | [`illustrate`] | Scene description → cached PNG on disk |
//! | [`cache`] | Content-addressed artifact store and atomic writes |
//! | [`library`] | Saved books in `library.json`, self-healing on load |
//! | [`pager`] | Page-by-page navigation through one book |
//! | [`export`] | Multi-page PDF export |
//! | [`generate`] | Static HTML storybook rendered with Maud |
//! | [`config`] | `config.toml` loading, validation, and credentials |
//! | [`types`] | Shared types (`Book`, `Page`, `Age`, `Tone`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## All-or-Nothing Books
//!
//! A book is saved only when every page has an illustration. A half-drawn
//! book is worse at bedtime than an error message, and the illustrations that
//! did succeed stay cached, so a retry only pays for the missing ones.
//!
//! ## Blocking Clients on a Rayon Pool
//!
//! Every external call is a single blocking HTTP request with a timeout. Pages
//! are illustrated in parallel on the rayon pool (`[processing] max_processes`),
//! which keeps the code synchronous and the concurrency bounded without an
//! async runtime.
//!
//! ## Services Behind Traits
//!
//! The pipeline only sees [`services::TextService`] and
//! [`services::ImageService`]. Tests drive the whole pipeline with recording
//! mocks; swapping OpenAI for Imagen is a config change.

pub mod cache;
pub mod config;
pub mod export;
pub mod generate;
pub mod illustrate;
pub mod library;
pub mod output;
pub mod pager;
pub mod parse;
pub mod prompt;
pub mod services;
pub mod story;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
