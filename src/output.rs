//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity (book, page) leads with its positional index and its words;
//! fingerprints and file paths follow as indented context lines. That keeps
//! the output readable as a bedtime shelf while still letting users trace a
//! page back to the file on disk.
//!
//! # Output Format
//!
//! ## Ask
//!
//! ```text
//! Story written: 4 pages
//!     page 2/4: illustrated
//!     page 1/4: cached
//!     ...
//! Saved "Why is the sea salty?" (3f2a9c0d)
//! Cache: 1 cached, 3 generated (4 total)
//!
//! Why is the sea salty?
//! 001 The sea tastes salty because...
//!     Illustration: A child tasting sea water
//!     Image: generated_images/8c1d0e2f3a4b5c6d.png
//! ```
//!
//! ## Library
//!
//! ```text
//! 001 Why is the sea salty? (4 pages)
//!     Key: 3f2a9c0d  Age 6 · Curious explorer · Mar 1, 2026
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::config::{ProcessingConfig, effective_threads};
use crate::export::layout::wrap_text;
use crate::generate::RenderSummary;
use crate::illustrate::ResolveStatus;
use crate::pager::Reader;
use crate::services::gemini::ModelInfo;
use crate::story::{Source, StoryEvent, StoryOutcome};
use crate::types::Book;
use std::path::Path;

/// Characters of a fingerprint shown in listings; enough to select by prefix.
const SHORT_KEY: usize = 8;

/// Column width of the interactive reader.
const READER_WIDTH: usize = 64;

/// Lines of an unparseable response echoed back to the user.
const RAW_PREVIEW_LINES: usize = 40;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max).collect();
        format!("{}...", kept)
    }
}

fn short_key(key: &str) -> &str {
    key.get(..SHORT_KEY).unwrap_or(key)
}

fn pages_label(n: usize) -> String {
    if n == 1 {
        "1 page".to_string()
    } else {
        format!("{} pages", n)
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Ask
// ============================================================================

/// Format a single pipeline progress event as display lines.
pub fn format_story_event(event: &StoryEvent) -> Vec<String> {
    match event {
        StoryEvent::LibraryHit { title, pages } => {
            vec![format!("Found in library: {} ({})", title, pages_label(*pages))]
        }
        StoryEvent::TextGenerated { pages, dropped } => {
            let mut lines = vec![format!("Story written: {}", pages_label(*pages))];
            if *dropped > 0 {
                lines.push(format!("{}skipped {} empty page(s)", indent(1), dropped));
            }
            lines
        }
        StoryEvent::PageIllustrated {
            page,
            total,
            status,
        } => {
            let status = match status {
                ResolveStatus::Cached => "cached",
                ResolveStatus::Generated => "illustrated",
            };
            vec![format!("{}page {}/{}: {}", indent(1), page, total, status)]
        }
        StoryEvent::BookSaved { key, title } => {
            vec![format!("Saved \"{}\" ({})", title, short_key(key))]
        }
    }
}

/// Summary line after `ask` finishes.
pub fn format_outcome(outcome: &StoryOutcome) -> Vec<String> {
    match outcome.source {
        Source::Library => vec!["No new illustrations needed".to_string()],
        Source::Generated => vec![format!("Cache: {}", outcome.stats)],
    }
}

pub fn print_outcome(outcome: &StoryOutcome) {
    print_lines(format_outcome(outcome));
    println!();
    print_book(&outcome.book);
}

/// The text service's response when no pages could be read from it.
pub fn format_unparsed_response(raw: &str) -> Vec<String> {
    let mut lines = vec!["Story format error. Raw output below:".to_string()];
    let total = raw.lines().count();
    lines.extend(
        raw.lines()
            .take(RAW_PREVIEW_LINES)
            .map(|line| format!("{}{}", indent(1), line)),
    );
    if total > RAW_PREVIEW_LINES {
        lines.push(format!("{}... ({} more lines)", indent(1), total - RAW_PREVIEW_LINES));
    }
    lines
}

/// Writes to stderr, next to the error itself.
pub fn print_unparsed_response(raw: &str) {
    for line in format_unparsed_response(raw) {
        eprintln!("{}", line);
    }
}

/// Full listing of one book: every page with its illustration.
pub fn format_book(book: &Book) -> Vec<String> {
    let mut lines = vec![book.title.clone()];
    for (i, page) in book.pages.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), page.text));
        lines.push(format!(
            "{}Illustration: {}",
            indent(1),
            page.illustration_description
        ));
        lines.push(format!("{}Image: {}", indent(1), page.image_path));
    }
    lines
}

pub fn print_book(book: &Book) {
    print_lines(format_book(book));
}

// ============================================================================
// Library
// ============================================================================

/// Saved books, in the order `read`/`export` selectors count them.
pub fn format_library(books: &[Book]) -> Vec<String> {
    if books.is_empty() {
        return vec!["The library is empty. Run `ask` to make a book.".to_string()];
    }

    let mut lines = Vec::new();
    for (i, book) in books.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            truncate(&book.title, 60),
            pages_label(book.pages.len())
        ));

        let mut details = vec![format!("Key: {}", short_key(&book.key))];
        let mut request = Vec::new();
        if let Some(age) = book.age {
            request.push(format!("Age {}", age));
        }
        if let Some(tone) = book.tone {
            request.push(tone.label().to_string());
        }
        request.push(book.created_at.format("%b %-d, %Y").to_string());
        details.push(request.join(" · "));
        lines.push(format!("{}{}", indent(1), details.join("  ")));
    }
    lines
}

pub fn print_library(books: &[Book]) {
    print_lines(format_library(books));
}

// ============================================================================
// Read
// ============================================================================

/// The current page of an interactive reading session.
pub fn format_reader_page(reader: &Reader) -> Vec<String> {
    let book = reader.book();
    let mut lines = vec![
        format!("{} - {}", book.title, reader.position_label()),
        String::new(),
    ];
    if let Some(page) = reader.current() {
        lines.extend(
            wrap_text(&page.text, READER_WIDTH)
                .into_iter()
                .map(|l| format!("{}{}", indent(1), l)),
        );
        lines.push(String::new());
        lines.push(format!("{}Picture: {}", indent(1), page.image_path));
    }
    lines.push(String::new());
    lines.push(reader_controls(reader));
    lines
}

/// Key hints, leaving out moves that are not possible on this page.
fn reader_controls(reader: &Reader) -> String {
    let mut keys = Vec::new();
    if !reader.is_last() {
        keys.push("[n]ext");
    }
    if !reader.is_first() {
        keys.push("[p]revious");
    }
    keys.push("[q]uit");
    keys.join("  ")
}

pub fn print_reader_page(reader: &Reader) {
    print_lines(format_reader_page(reader));
}

// ============================================================================
// Export / render / models
// ============================================================================

pub fn format_export(book: &Book, path: &Path, bytes: usize) -> Vec<String> {
    vec![format!(
        "Exported \"{}\" ({}) \u{2192} {} ({} KB)",
        book.title,
        pages_label(book.pages.len()),
        path.display(),
        bytes.div_ceil(1024)
    )]
}

pub fn format_render_summary(summary: &RenderSummary, output: &Path) -> Vec<String> {
    vec![
        format!("Library \u{2192} {}", output.join("index.html").display()),
        format!(
            "Rendered {} book(s), {}",
            summary.books,
            pages_label(summary.pages)
        ),
    ]
}

/// Text models that can write stories (those supporting `generateContent`).
pub fn format_models(models: &[ModelInfo]) -> Vec<String> {
    let usable: Vec<&ModelInfo> = models
        .iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|g| g == "generateContent")
        })
        .collect();
    if usable.is_empty() {
        return vec!["No text models available for this key".to_string()];
    }
    usable.iter().map(|m| m.name.clone()).collect()
}

/// One line describing how many illustrations run at once.
pub fn format_parallelism(processing: &ProcessingConfig) -> String {
    format!(
        "Illustrating up to {} page(s) at once",
        effective_threads(processing)
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::types::{Age, Page, Tone};
    use chrono::{TimeZone, Utc};

    fn book() -> Book {
        Book {
            key: "3f2a9c0d1e4b5a67".into(),
            title: "Why is the sea salty?".into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap(),
            question: Some("why is the sea salty?".into()),
            age: Age::new(6),
            tone: Some(Tone::Curious),
            pages: vec![
                Page {
                    text: "The sea tastes salty.".into(),
                    illustration_description: "A child tasting sea water".into(),
                    image_path: "generated_images/aaaa.png".into(),
                },
                Page {
                    text: "Rivers carry salt.".into(),
                    illustration_description: "A river".into(),
                    image_path: "generated_images/bbbb.png".into(),
                },
            ],
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 40), "short");
    }

    #[test]
    fn short_key_handles_short_input() {
        assert_eq!(short_key("abc"), "abc");
        assert_eq!(short_key("3f2a9c0d1e4b5a67"), "3f2a9c0d");
    }

    // =========================================================================
    // Ask
    // =========================================================================

    #[test]
    fn page_events_are_indented() {
        let lines = format_story_event(&StoryEvent::PageIllustrated {
            page: 2,
            total: 4,
            status: ResolveStatus::Cached,
        });
        assert_eq!(lines, vec!["    page 2/4: cached"]);
    }

    #[test]
    fn text_event_mentions_dropped_pages() {
        let lines = format_story_event(&StoryEvent::TextGenerated {
            pages: 4,
            dropped: 1,
        });
        assert_eq!(lines[0], "Story written: 4 pages");
        assert_eq!(lines[1], "    skipped 1 empty page(s)");
    }

    #[test]
    fn outcome_shows_cache_stats() {
        let outcome = StoryOutcome {
            book: book(),
            source: Source::Generated,
            stats: CacheStats { hits: 1, misses: 1 },
        };
        assert_eq!(
            format_outcome(&outcome),
            vec!["Cache: 1 cached, 1 generated (2 total)"]
        );
    }

    #[test]
    fn unparsed_response_is_echoed() {
        let lines = format_unparsed_response("Once upon a time\nthe end");
        assert_eq!(
            lines,
            vec![
                "Story format error. Raw output below:",
                "    Once upon a time",
                "    the end",
            ]
        );
    }

    #[test]
    fn long_unparsed_response_is_cut() {
        let raw = (1..=50).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        let lines = format_unparsed_response(&raw);
        assert_eq!(lines.len(), 1 + RAW_PREVIEW_LINES + 1);
        assert_eq!(lines[RAW_PREVIEW_LINES], "    line 40");
        assert_eq!(lines.last().unwrap(), "    ... (10 more lines)");
    }

    #[test]
    fn book_lists_pages_with_context() {
        let lines = format_book(&book());
        assert_eq!(lines[0], "Why is the sea salty?");
        assert_eq!(lines[1], "001 The sea tastes salty.");
        assert_eq!(lines[2], "    Illustration: A child tasting sea water");
        assert_eq!(lines[3], "    Image: generated_images/aaaa.png");
        assert_eq!(lines[4], "002 Rivers carry salt.");
    }

    // =========================================================================
    // Library
    // =========================================================================

    #[test]
    fn library_entry_format() {
        let lines = format_library(&[book()]);
        assert_eq!(lines[0], "001 Why is the sea salty? (2 pages)");
        assert_eq!(
            lines[1],
            "    Key: 3f2a9c0d  Age 6 · Curious explorer · Mar 1, 2026"
        );
    }

    #[test]
    fn empty_library_message() {
        assert!(format_library(&[])[0].contains("empty"));
    }

    // =========================================================================
    // Read
    // =========================================================================

    #[test]
    fn reader_page_shows_position_and_controls() {
        let book = book();
        let mut reader = Reader::new(&book);
        let lines = format_reader_page(&reader);
        assert_eq!(lines[0], "Why is the sea salty? - Page 1 of 2");
        assert!(lines.contains(&"    The sea tastes salty.".to_string()));
        assert_eq!(lines.last().unwrap(), "[n]ext  [q]uit");

        reader.next();
        let lines = format_reader_page(&reader);
        assert_eq!(lines.last().unwrap(), "[p]revious  [q]uit");
    }

    // =========================================================================
    // Models
    // =========================================================================

    #[test]
    fn models_filtered_to_text_generation() {
        let models = vec![
            ModelInfo {
                name: "models/gemini-flash-latest".into(),
                supported_generation_methods: vec!["generateContent".into()],
            },
            ModelInfo {
                name: "models/text-embedding-004".into(),
                supported_generation_methods: vec!["embedContent".into()],
            },
        ];
        assert_eq!(format_models(&models), vec!["models/gemini-flash-latest"]);
    }
}
