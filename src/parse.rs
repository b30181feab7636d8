//! Response parsing: raw generated text → ordered page records.
//!
//! Two delimiter grammars are understood.
//!
//! **Tagged** (what [`prompt::build`](crate::prompt::build) asks for):
//!
//! ```text
//! <PAGE>
//! <TEXT>Salt comes from rocks.</TEXT>
//! <IMAGE>Rain washing over grey rocks</IMAGE>
//! </PAGE>
//! ```
//!
//! **Bracketed** (older prompts, still seen when a generator ignores the tags):
//!
//! ```text
//! Salt comes from rocks.
//! [Illustration idea: rain washing over grey rocks]
//! ```
//!
//! Markers are matched case-insensitively. The response is split on page
//! boundaries first and each chunk is parsed on its own, so one malformed page
//! is dropped without losing the rest. An empty result is not an error here;
//! the caller decides that a book with zero pages failed.

use regex::Regex;
use std::sync::LazyLock;

static PAGE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*page\s*>").expect("valid page regex"));
static PAGE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*/\s*page\s*>").expect("valid page close regex"));
static TEXT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*text\s*>(.*?)<\s*/\s*text\s*>").expect("valid text regex")
});
static IMAGE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*image\s*>(.*?)<\s*/\s*image\s*>").expect("valid image regex")
});
static BRACKETED_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(.*?)\[\s*illustration idea\s*:\s*(.*?)\]").expect("valid bracket regex")
});

/// Words that betray meta-commentary about the artwork. Whole words, with the
/// usual plural/verb endings.
static VISUAL_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(illustrat\w*|pictures?|images?|drawings?|shows|depicts)\b")
        .expect("valid denylist regex")
});

/// One page as extracted from the response, before cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub text: String,
    pub illustration: String,
}

/// Delimiter grammar of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Tagged,
    Bracketed,
}

/// Which grammar a response is written in. Any `<PAGE>` marker wins.
pub fn detect_grammar(raw: &str) -> Grammar {
    if PAGE_OPEN.is_match(raw) {
        Grammar::Tagged
    } else {
        Grammar::Bracketed
    }
}

/// Extract pages in order, dropping malformed ones.
pub fn parse(raw: &str) -> Vec<ParsedPage> {
    match detect_grammar(raw) {
        Grammar::Tagged => {
            let pages = parse_tagged(raw);
            if pages.is_empty() {
                parse_bracketed(raw)
            } else {
                pages
            }
        }
        Grammar::Bracketed => parse_bracketed(raw),
    }
}

/// Parse the `<PAGE><TEXT>…</TEXT><IMAGE>…</IMAGE></PAGE>` grammar.
pub fn parse_tagged(raw: &str) -> Vec<ParsedPage> {
    // Anything before the first <PAGE> is preamble, not a page.
    PAGE_OPEN
        .split(raw)
        .skip(1)
        .filter_map(|chunk| {
            let chunk = PAGE_CLOSE.split(chunk).next().unwrap_or(chunk);
            let text = single_block(&TEXT_BLOCK, chunk)?;
            let illustration = single_block(&IMAGE_BLOCK, chunk)?;
            page(text, illustration)
        })
        .collect()
}

/// Parse the `text [Illustration idea: …]` grammar.
pub fn parse_bracketed(raw: &str) -> Vec<ParsedPage> {
    BRACKETED_PAGE
        .captures_iter(raw)
        .filter_map(|caps| page(&caps[1], &caps[2]))
        .collect()
}

/// The captured body of `pattern` if it occurs exactly once in `chunk`.
fn single_block<'a>(pattern: &Regex, chunk: &'a str) -> Option<&'a str> {
    let mut matches = pattern.captures_iter(chunk);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    first.get(1).map(|m| m.as_str())
}

fn page(text: &str, illustration: &str) -> Option<ParsedPage> {
    let text = text.trim();
    let illustration = illustration.trim();
    if text.is_empty() || illustration.is_empty() {
        return None;
    }
    Some(ParsedPage {
        text: text.to_string(),
        illustration: illustration.to_string(),
    })
}

/// Remove lines that talk about the artwork and join the rest with spaces.
///
/// Applied to every narrative regardless of grammar: generators sometimes leak
/// "This picture shows…" into the child-facing text.
pub fn clean_narrative(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !VISUAL_VOCABULARY.is_match(line))
        .collect::<Vec<_>>()
        .join(" ")
}
