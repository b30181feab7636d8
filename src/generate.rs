//! Static HTML storybook.
//!
//! Renders the saved library as a folder of plain HTML pages that can be
//! opened straight from disk.
//!
//! ## Generated Pages
//!
//! - **Library page** (`/index.html`): every saved book with its cover
//! - **Story pages** (`/{key}/{n}.html`): one illustrated page per book page,
//!   with previous/next links that are disabled at either end
//!
//! ## Output Structure
//!
//! ```text
//! storybook/
//! ├── index.html
//! └── 3f2a9c0d1e4b5a67/
//!     ├── 1.html
//!     ├── 2.html
//!     ├── 8c1d0e2f3a4b5c6d.png    # illustrations (copied)
//!     └── ...
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: pastel picture-book styles
//! - `static/nav.js`: arrow-key page turning
//!
//! Paging goes through [`Reader`], the same controller the terminal reader
//! uses, so both agree on where a book starts and ends.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::pager::Reader;
use crate::types::{Book, Page};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("illustration {} is missing", .0.display())]
    MissingImage(PathBuf),
}

const CSS: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/nav.js");

/// What [`render_site`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub books: usize,
    pub pages: usize,
}

/// Write the storybook for `books` into `output_dir`.
pub fn render_site(books: &[Book], output_dir: &Path) -> Result<RenderSummary, GenerateError> {
    fs::create_dir_all(output_dir)?;
    fs::write(
        output_dir.join("index.html"),
        render_index(books).into_string(),
    )?;

    let mut summary = RenderSummary::default();
    for book in books.iter().filter(|b| !b.pages.is_empty()) {
        let book_dir = output_dir.join(&book.key);
        fs::create_dir_all(&book_dir)?;
        for page in &book.pages {
            copy_image(page, &book_dir)?;
        }

        let mut reader = Reader::new(book);
        loop {
            let html = render_story_page(&reader);
            fs::write(
                book_dir.join(page_file(reader.index())),
                html.into_string(),
            )?;
            summary.pages += 1;
            if !reader.next() {
                break;
            }
        }
        debug!(key = %book.key, pages = reader.len(), "rendered book");
        summary.books += 1;
    }
    Ok(summary)
}

fn copy_image(page: &Page, book_dir: &Path) -> Result<(), GenerateError> {
    let src = Path::new(&page.image_path);
    let name = src
        .file_name()
        .ok_or_else(|| GenerateError::MissingImage(src.to_path_buf()))?;
    if !src.is_file() {
        return Err(GenerateError::MissingImage(src.to_path_buf()));
    }
    fs::copy(src, book_dir.join(name))?;
    Ok(())
}

/// `1.html` for the page at zero-based `index`.
fn page_file(index: usize) -> String {
    format!("{}.html", index + 1)
}

/// File name of a page's illustration inside the book directory.
fn image_file(page: &Page) -> String {
    Path::new(&page.image_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn site_header(home_href: &str) -> Markup {
    html! {
        header.site-header {
            a href=(home_href) { "Bedtime Whys" }
        }
    }
}

/// Renders the saved-library selector
fn render_index(books: &[Book]) -> Markup {
    let content = html! {
        (site_header("index.html"))
        h1 { "Our library" }
        @if books.is_empty() {
            p.empty { "No books yet. Ask a question to make the first one." }
        } @else {
            ul.library {
                @for book in books {
                    @if let Some(cover) = book.pages.first() {
                        li {
                            a href={ (book.key) "/1.html" } {
                                img src={ (book.key) "/" (image_file(cover)) } alt=(book.title);
                                span.book-title { (book.title) }
                                span.book-meta {
                                    (book.pages.len()) " pages · "
                                    (book.created_at.format("%b %-d, %Y").to_string())
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    base_document("Bedtime Whys", content)
}

/// Renders the current page of `reader`
fn render_story_page(reader: &Reader) -> Markup {
    let book = reader.book();
    let prev = (!reader.is_first()).then(|| page_file(reader.index() - 1));
    let next = (!reader.is_last()).then(|| page_file(reader.index() + 1));
    let title = format!("{} - {}", book.title, reader.position_label());

    let content = html! {
        (site_header("../index.html"))
        h1 { (book.title) }
        @if let Some(page) = reader.current() {
            main.story-page {
                figure.illustration {
                    img src=(image_file(page)) alt=(page.illustration_description);
                }
                p.story-text { (page.text) }
                nav.pager data-prev=[prev.as_deref()] data-next=[next.as_deref()] {
                    @match &prev {
                        Some(href) => a.prev href=(href) { "← Previous" },
                        None => span.prev.disabled { "← Previous" },
                    }
                    span.position { (reader.position_label()) }
                    @match &next {
                        Some(href) => a.next href=(href) { "Next →" },
                        None => span.next.disabled { "Next →" },
                    }
                }
            }
        }
        script { (PreEscaped(JS)) }
    };

    base_document(&title, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::book_on_disk;
    use tempfile::TempDir;

    #[test]
    fn base_document_includes_doctype() {
        let doc = base_document("T", html! { p { "test" } }).into_string();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>T</title>"));
    }

    #[test]
    fn index_lists_every_book() {
        let tmp = TempDir::new().unwrap();
        let books = vec![
            book_on_disk(tmp.path(), "aaa", 2),
            book_on_disk(tmp.path(), "bbb", 1),
        ];
        let html = render_index(&books).into_string();
        assert!(html.contains("href=\"aaa/1.html\""));
        assert!(html.contains("href=\"bbb/1.html\""));
        assert!(html.contains("Why aaa?"));
        assert!(html.contains("2 pages"));
    }

    #[test]
    fn index_for_empty_library() {
        let html = render_index(&[]).into_string();
        assert!(html.contains("No books yet"));
    }

    #[test]
    fn first_page_disables_previous() {
        let tmp = TempDir::new().unwrap();
        let book = book_on_disk(tmp.path(), "sky", 3);
        let html = render_story_page(&Reader::new(&book)).into_string();

        assert!(html.contains("Page 1 of 3"));
        assert!(html.contains("class=\"prev disabled\""));
        assert!(html.contains("href=\"2.html\""));
        assert!(!html.contains("data-prev"));
    }

    #[test]
    fn last_page_disables_next() {
        let tmp = TempDir::new().unwrap();
        let book = book_on_disk(tmp.path(), "sky", 3);
        let mut reader = Reader::new(&book);
        reader.next();
        reader.next();
        let html = render_story_page(&reader).into_string();

        assert!(html.contains("Page 3 of 3"));
        assert!(html.contains("class=\"next disabled\""));
        assert!(html.contains("href=\"2.html\""));
        assert!(html.contains("Page 3 of sky."));
    }

    #[test]
    fn story_text_is_escaped() {
        let tmp = TempDir::new().unwrap();
        let mut book = book_on_disk(tmp.path(), "esc", 1);
        book.pages[0].text = "<script>alert(1)</script>".into();
        let html = render_story_page(&Reader::new(&book)).into_string();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn render_site_writes_pages_and_images() {
        let tmp = TempDir::new().unwrap();
        let books = vec![book_on_disk(&tmp.path().join("images"), "moon", 2)];
        let out = tmp.path().join("site");

        let summary = render_site(&books, &out).unwrap();
        assert_eq!(summary, RenderSummary { books: 1, pages: 2 });
        assert!(out.join("index.html").exists());
        assert!(out.join("moon/1.html").exists());
        assert!(out.join("moon/2.html").exists());
        assert!(!out.join("moon/3.html").exists());
        assert!(out.join("moon/moon-1.png").exists());
    }

    #[test]
    fn render_site_fails_on_missing_image() {
        let tmp = TempDir::new().unwrap();
        let books = vec![book_on_disk(tmp.path(), "gone", 1)];
        fs::remove_file(&books[0].pages[0].image_path).unwrap();

        assert!(matches!(
            render_site(&books, &tmp.path().join("site")),
            Err(GenerateError::MissingImage(_))
        ));
    }
}
