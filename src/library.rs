//! Library index: the saved books, persisted as one JSON file.
//!
//! The file is a JSON array of [`Book`] records. It is read leniently and
//! written atomically: a corrupt or stale index never stops the app, it is
//! repaired on load.
//!
//! ## Self-healing
//!
//! [`Library::load`] drops, with a `warn` log for each:
//!
//! - records that fail to deserialize,
//! - books with no pages,
//! - books with an illustration that is missing or zero bytes on disk,
//! - duplicate fingerprints (the later record wins).
//!
//! If anything was dropped the cleaned list is written back so the next load
//! is clean. An unreadable file is treated as an empty library.
//!
//! ## Fingerprints
//!
//! A book is identified by [`fingerprint`] of its normalized question, age and
//! tone: asking the same question twice in different casing or spacing finds
//! the same book.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{content_key, write_atomic};
use crate::types::{Age, Book, Tone};

/// Lower-case the question and collapse its whitespace.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable identity of a (question, age, tone) request.
pub fn fingerprint(question: &str, age: Age, tone: Tone) -> String {
    let canonical = format!("{}\n{}\n{}", normalize_question(question), age, tone.label());
    content_key(&canonical).as_str().to_string()
}

#[derive(Debug, Clone)]
pub struct Library {
    path: PathBuf,
}

impl Library {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All valid books in stored order. Never fails; see the module docs.
    pub fn load(&self) -> Vec<Book> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "library unreadable; starting empty"
                );
                return Vec::new();
            }
        };

        let records: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "library is corrupt; resetting");
                self.rewrite(&[]);
                return Vec::new();
            }
        };

        let total = records.len();
        let books = prune(records);
        if books.len() != total {
            warn!(
                kept = books.len(),
                dropped = total - books.len(),
                "pruned invalid library records"
            );
            self.rewrite(&books);
        }
        books
    }

    /// Replace the stored library with `books`.
    pub fn save(&self, books: &[Book]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(books).map_err(io::Error::other)?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), books = books.len(), "library saved");
        Ok(())
    }

    /// Insert `book`, replacing any stored book with the same fingerprint.
    pub fn upsert(&self, book: Book) -> io::Result<()> {
        let mut books = self.load();
        match books.iter_mut().find(|b| b.key == book.key) {
            Some(existing) => *existing = book,
            None => books.push(book),
        }
        self.save(&books)
    }

    pub fn find_by_fingerprint(&self, key: &str) -> Option<Book> {
        self.load().into_iter().find(|b| b.key == key)
    }

    fn rewrite(&self, books: &[Book]) {
        if let Err(e) = self.save(books) {
            warn!(path = %self.path.display(), error = %e, "could not rewrite pruned library");
        }
    }
}

fn prune(records: Vec<serde_json::Value>) -> Vec<Book> {
    let mut books: Vec<Book> = Vec::with_capacity(records.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (i, record) in records.into_iter().enumerate() {
        let book: Book = match serde_json::from_value(record) {
            Ok(book) => book,
            Err(e) => {
                warn!(record = i, error = %e, "dropping unreadable library record");
                continue;
            }
        };
        if book.pages.is_empty() {
            warn!(key = %book.key, "dropping book with no pages");
            continue;
        }
        if let Some(page) = book.pages.iter().find(|p| !image_exists(&p.image_path)) {
            warn!(
                key = %book.key,
                image = %page.image_path,
                "dropping book with missing illustration"
            );
            continue;
        }
        match positions.get(&book.key) {
            Some(&at) => {
                warn!(key = %book.key, "duplicate library record; keeping the later one");
                books[at] = book;
            }
            None => {
                positions.insert(book.key.clone(), books.len());
                books.push(book);
            }
        }
    }
    books
}

fn image_exists(path: &str) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("the library is empty")]
    Empty,
    #[error("no book matches \"{0}\"")]
    NotFound(String),
    #[error("\"{0}\" matches {1} books; use more characters")]
    Ambiguous(String, usize),
}

/// Pick a book by 1-based position, full fingerprint, or unique prefix.
pub fn select<'a>(books: &'a [Book], selector: &str) -> Result<&'a Book, SelectError> {
    if books.is_empty() {
        return Err(SelectError::Empty);
    }
    let selector = selector.trim();

    if let Ok(n) = selector.parse::<usize>()
        && (1..=books.len()).contains(&n)
    {
        return Ok(&books[n - 1]);
    }
    if let Some(book) = books.iter().find(|b| b.key == selector) {
        return Ok(book);
    }
    if selector.is_empty() {
        return Err(SelectError::NotFound(selector.to_string()));
    }

    let matches: Vec<&Book> = books
        .iter()
        .filter(|b| b.key.starts_with(selector))
        .collect();
    match matches.as_slice() {
        [book] => Ok(*book),
        [] => Err(SelectError::NotFound(selector.to_string())),
        many => Err(SelectError::Ambiguous(selector.to_string(), many.len())),
    }
}
