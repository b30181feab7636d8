//! Page-by-page navigation through a single book.
//!
//! A [`Reader`] is owned by whoever is showing the book (the interactive
//! `read` loop, the HTML renderer). Moving past either end is a no-op, so the
//! index is always valid for a non-empty book.

use crate::types::{Book, Page};

#[derive(Debug, Clone)]
pub struct Reader<'a> {
    book: &'a Book,
    index: usize,
}

impl<'a> Reader<'a> {
    /// Start at the first page.
    pub fn new(book: &'a Book) -> Self {
        Self { book, index: 0 }
    }

    pub fn book(&self) -> &'a Book {
        self.book
    }

    /// `None` only for a book without pages.
    pub fn current(&self) -> Option<&'a Page> {
        self.book.pages.get(self.index)
    }

    /// Zero-based index of the current page.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.book.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.book.pages.is_empty()
    }

    /// Advance one page. Returns whether the position changed.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Go back one page. Returns whether the position changed.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Jump to a zero-based page; out-of-range targets are ignored.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.len() || index == self.index {
            return false;
        }
        self.index = index;
        true
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len()
    }

    /// "Page 2 of 4".
    pub fn position_label(&self) -> String {
        if self.is_empty() {
            return "No pages".to_string();
        }
        format!("Page {} of {}", self.index + 1, self.len())
    }
}
