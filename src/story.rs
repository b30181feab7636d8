//! The storybook pipeline: question → saved, illustrated book.
//!
//! ```text
//! fingerprint ─► library hit? ──yes──► done (no external calls)
//!      │ no
//!      ▼
//! prompt::build ─► TextService ─► parse ─► clean_narrative
//!      ▼
//! IllustrationResolver (parallel, one per page) ─► Book ─► Library::upsert
//! ```
//!
//! A book is all-or-nothing: if any page cannot be illustrated the whole
//! request fails and the library is left exactly as it was. Illustrations that
//! did succeed stay in the cache, so retrying only pays for the missing ones.
//!
//! Progress is reported through an optional [`StoryEvent`] channel so the CLI
//! can print while illustrations are still being fetched.

use chrono::Utc;
use rayon::prelude::*;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheStats, CacheStore};
use crate::config::{AppConfig, ConfigError};
use crate::illustrate::{IllustrationError, IllustrationResolver, ResolveStatus, Resolved};
use crate::library::{Library, fingerprint};
use crate::parse::{clean_narrative, parse};
use crate::prompt;
use crate::services::{ImageService, ServiceError, TextService};
use crate::types::{Age, Book, Page, Tone, book_title};

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Text generation failed: {message}")]
    Generation {
        message: String,
        #[source]
        source: Option<ServiceError>,
    },
    #[error("Could not find any story pages in the generated text")]
    Parse { raw: String },
    #[error(transparent)]
    Illustration(#[from] IllustrationError),
    #[error("Could not save the book: {0}")]
    Library(#[from] std::io::Error),
}

impl From<ServiceError> for StoryError {
    fn from(source: ServiceError) -> Self {
        StoryError::Generation {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// What the parent asked for.
#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub question: String,
    pub age: Age,
    pub tone: Tone,
}

impl StoryRequest {
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.question, self.age, self.tone)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoryOptions {
    /// Ignore the saved book and cached illustrations; regenerate everything.
    pub refresh: bool,
}

/// Where generated artifacts live.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub store: CacheStore,
    pub library: Library,
}

impl Workspace {
    pub fn new(store: CacheStore, library: Library) -> Self {
        Self { store, library }
    }

    /// Storage locations from `[storage]`, resolved against `root`.
    ///
    /// `root` is made absolute first: saved books record their illustration
    /// paths, and those must stay valid from any working directory.
    pub fn from_config(root: &Path, config: &AppConfig) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self::new(
            CacheStore::new(config.storage.images_dir(&root)),
            Library::new(config.storage.library_file(&root)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Returned from the library without calling any service.
    Library,
    Generated,
}

#[derive(Debug, Clone)]
pub struct StoryOutcome {
    pub book: Book,
    pub source: Source,
    pub stats: CacheStats,
}

/// Progress of a single [`tell`] call.
#[derive(Debug, Clone)]
pub enum StoryEvent {
    LibraryHit {
        title: String,
        pages: usize,
    },
    TextGenerated {
        pages: usize,
        dropped: usize,
    },
    PageIllustrated {
        /// 1-based page number.
        page: usize,
        total: usize,
        status: ResolveStatus,
    },
    BookSaved {
        key: String,
        title: String,
    },
}

fn emit(events: &Option<Sender<StoryEvent>>, event: StoryEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Produce the book for `request`, from the library or freshly generated.
pub fn tell(
    text: &(impl TextService + ?Sized),
    images: &(impl ImageService + ?Sized),
    workspace: &Workspace,
    request: &StoryRequest,
    options: StoryOptions,
    events: Option<Sender<StoryEvent>>,
) -> Result<StoryOutcome, StoryError> {
    if request.question.trim().is_empty() {
        return Err(StoryError::InvalidRequest("the question must not be empty".into()));
    }

    let key = request.fingerprint();
    if !options.refresh
        && let Some(book) = workspace.library.find_by_fingerprint(&key)
    {
        info!(key = %key, "book found in library");
        emit(
            &events,
            StoryEvent::LibraryHit {
                title: book.title.clone(),
                pages: book.pages.len(),
            },
        );
        return Ok(StoryOutcome {
            book,
            source: Source::Library,
            stats: CacheStats::default(),
        });
    }

    let raw = text.generate(&prompt::build(&request.question, request.age, request.tone))?;
    if raw.trim().is_empty() {
        return Err(StoryError::Generation {
            message: "the text service returned an empty response".into(),
            source: None,
        });
    }

    let parsed = parse(&raw);
    let found = parsed.len();
    let drafts: Vec<(String, String)> = parsed
        .into_iter()
        .map(|p| (clean_narrative(&p.text), p.illustration))
        .filter(|(text, _)| !text.is_empty())
        .collect();
    if drafts.is_empty() {
        return Err(StoryError::Parse { raw });
    }
    debug!(found, kept = drafts.len(), "parsed story pages");
    emit(
        &events,
        StoryEvent::TextGenerated {
            pages: drafts.len(),
            dropped: found - drafts.len(),
        },
    );

    let resolver = IllustrationResolver::new(images, &workspace.store);
    let resolver = if options.refresh {
        resolver.without_cache_reads()
    } else {
        resolver
    };

    let total = drafts.len();
    let resolved = drafts
        .par_iter()
        .enumerate()
        .map(|(i, (_, illustration))| -> Result<Resolved, IllustrationError> {
            let resolved = resolver.resolve(illustration)?;
            emit(
                &events,
                StoryEvent::PageIllustrated {
                    page: i + 1,
                    total,
                    status: resolved.status,
                },
            );
            Ok(resolved)
        })
        .collect::<Result<Vec<_>, IllustrationError>>()?;

    let mut stats = CacheStats::default();
    let pages: Vec<Page> = drafts
        .into_iter()
        .zip(resolved)
        .map(|((text, illustration), resolved)| {
            match resolved.status {
                ResolveStatus::Cached => stats.hit(),
                ResolveStatus::Generated => stats.miss(),
            }
            Page {
                text,
                illustration_description: illustration.trim().to_string(),
                image_path: resolved.path.to_string_lossy().into_owned(),
            }
        })
        .collect();

    let book = Book {
        key: key.clone(),
        title: book_title(&request.question),
        created_at: Utc::now(),
        question: Some(request.question.trim().to_string()),
        age: Some(request.age),
        tone: Some(request.tone),
        pages,
    };
    workspace.library.upsert(book.clone())?;
    info!(key = %key, pages = book.pages.len(), %stats, "book saved");
    emit(
        &events,
        StoryEvent::BookSaved {
            key,
            title: book.title.clone(),
        },
    );

    Ok(StoryOutcome {
        book,
        source: Source::Generated,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::tests::{MockImages, MockText};
    use crate::test_helpers::{png_base64, tagged_response};
    use tempfile::TempDir;

    fn workspace(tmp: &TempDir) -> Workspace {
        Workspace::from_config(tmp.path(), &AppConfig::default())
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let ws = Workspace::from_config(Path::new("whys"), &AppConfig::default());
        let cwd = std::env::current_dir().unwrap();

        assert!(ws.store.dir().is_absolute());
        assert_eq!(ws.store.dir(), cwd.join("whys").join("generated_images"));
        assert_eq!(ws.library.path(), cwd.join("whys").join("library.json"));
    }

    fn request(question: &str) -> StoryRequest {
        StoryRequest {
            question: question.into(),
            age: Age::new(6).unwrap(),
            tone: Tone::Curious,
        }
    }

    fn ask(
        text: &MockText,
        images: &MockImages,
        ws: &Workspace,
        question: &str,
    ) -> Result<StoryOutcome, StoryError> {
        tell(text, images, ws, &request(question), StoryOptions::default(), None)
    }

    fn four_pages() -> String {
        tagged_response(&[
            ("The sea tastes salty.", "A child tasting sea water"),
            ("Rain falls on rocks.", "Rain on grey rocks"),
            ("Rivers carry salt.", "A river flowing to the sea"),
            ("The salt stays behind.", "Sun shining on the sea"),
        ])
    }

    #[test]
    fn generates_and_saves_a_book() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4));

        let outcome = tell(
            &text,
            &images,
            &ws,
            &request("why is the sea salty?"),
            StoryOptions::default(),
            None,
        )
        .unwrap();

        assert_eq!(outcome.source, Source::Generated);
        assert_eq!(outcome.book.pages.len(), 4);
        assert_eq!(outcome.book.title, "Why is the sea salty?");
        assert_eq!(outcome.book.pages[1].text, "Rain falls on rocks.");
        assert_eq!(outcome.stats.misses, 4);
        assert_eq!(images.calls(), 4);
        assert_eq!(ws.library.load(), vec![outcome.book]);
    }

    #[test]
    fn prompt_carries_age_and_tone() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4));
        tell(
            &text,
            &images,
            &workspace(&tmp),
            &request("why do owls hoot?"),
            StoryOptions::default(),
            None,
        )
        .unwrap();

        let prompts = text.prompts.lock().unwrap();
        assert!(prompts[0].contains("why do owls hoot?"));
        assert!(prompts[0].contains("Curious explorer"));
    }

    #[test]
    fn second_request_is_a_library_hit() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4));

        let first = ask(&text, &images, &ws, "Why is the sea salty?").unwrap();
        let second = ask(&text, &images, &ws, "  why is the SEA salty? ").unwrap();

        assert_eq!(second.source, Source::Library);
        assert_eq!(second.book, first.book);
        assert_eq!(text.calls(), 1);
        assert_eq!(images.calls(), 4);
    }

    #[test]
    fn refresh_regenerates_everything() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4));
        let req = request("why is the sea salty?");

        tell(&text, &images, &ws, &req, StoryOptions::default(), None).unwrap();
        let again = tell(&text, &images, &ws, &req, StoryOptions { refresh: true }, None).unwrap();

        assert_eq!(again.source, Source::Generated);
        assert_eq!(text.calls(), 2);
        assert_eq!(images.calls(), 8);
        assert_eq!(ws.library.load().len(), 1);
    }

    #[test]
    fn shared_illustrations_hit_the_cache() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        let images = MockImages::returning(png_base64(4, 4));

        let salty = MockText::replying(four_pages());
        ask(&salty, &images, &ws, "why is the sea salty?").unwrap();

        let waves = MockText::replying(tagged_response(&[
            ("Wind pushes water.", "Rain on grey rocks"),
            ("That makes waves.", "Big friendly waves"),
        ]));
        let outcome = ask(&waves, &images, &ws, "why are there waves?").unwrap();

        assert_eq!(outcome.stats.hits, 1);
        assert_eq!(outcome.stats.misses, 1);
        assert_eq!(images.calls(), 5);
    }

    #[test]
    fn one_failed_illustration_fails_the_book() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4)).failing_on("river");

        let err = ask(&text, &images, &ws, "why is the sea salty?").unwrap_err();
        assert!(matches!(err, StoryError::Illustration(_)));
        assert!(ws.library.load().is_empty());
    }

    #[test]
    fn failure_leaves_existing_library_untouched() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        let images = MockImages::returning(png_base64(4, 4)).failing_on("dragon");

        ask(&MockText::replying(four_pages()), &images, &ws, "why is the sea salty?").unwrap();
        let before = std::fs::read_to_string(ws.library.path()).unwrap();

        let dragon = MockText::replying(tagged_response(&[("Dragons are stories.", "A dragon")]));
        assert!(ask(&dragon, &images, &ws, "are dragons real?").is_err());
        assert_eq!(std::fs::read_to_string(ws.library.path()).unwrap(), before);
    }

    #[test]
    fn text_service_error_is_a_generation_error() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::failing("quota exceeded");
        let images = MockImages::returning(png_base64(4, 4));

        let err = ask(&text, &images, &workspace(&tmp), "why?").unwrap_err();
        assert!(matches!(err, StoryError::Generation { source: Some(_), .. }));
        assert_eq!(images.calls(), 0);
    }

    #[test]
    fn blank_text_is_a_generation_error() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::replying("  \n ");
        let images = MockImages::returning(png_base64(4, 4));

        let err = ask(&text, &images, &workspace(&tmp), "why?").unwrap_err();
        assert!(matches!(err, StoryError::Generation { source: None, .. }));
    }

    #[test]
    fn unparseable_text_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::replying("Once upon a time there was no structure at all.");
        let images = MockImages::returning(png_base64(4, 4));

        let err = ask(&text, &images, &workspace(&tmp), "why?").unwrap_err();
        match err {
            StoryError::Parse { raw } => assert!(raw.contains("Once upon a time")),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert_eq!(images.calls(), 0);
    }

    #[test]
    fn pages_with_only_visual_commentary_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::replying(tagged_response(&[
            ("This picture shows the moon.", "The moon"),
            ("The moon reflects sunlight.", "Sun lighting the moon"),
        ]));
        let images = MockImages::returning(png_base64(4, 4));

        let outcome = ask(&text, &images, &workspace(&tmp), "why does the moon glow?").unwrap();
        assert_eq!(outcome.book.pages.len(), 1);
        assert_eq!(outcome.book.pages[0].text, "The moon reflects sunlight.");
        assert_eq!(images.calls(), 1);
    }

    #[test]
    fn empty_question_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4));
        let err = ask(&text, &images, &workspace(&tmp), "   ").unwrap_err();
        assert!(matches!(err, StoryError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "Invalid request: the question must not be empty");
        assert_eq!(text.calls(), 0);
        assert_eq!(images.calls(), 0);
    }

    #[test]
    fn events_report_progress() {
        let tmp = TempDir::new().unwrap();
        let text = MockText::replying(four_pages());
        let images = MockImages::returning(png_base64(4, 4));
        let (tx, rx) = std::sync::mpsc::channel();

        tell(
            &text,
            &images,
            &workspace(&tmp),
            &request("why is the sea salty?"),
            StoryOptions::default(),
            Some(tx),
        )
        .unwrap();
        let events: Vec<StoryEvent> = rx.into_iter().collect();

        assert!(matches!(events[0], StoryEvent::TextGenerated { pages: 4, dropped: 0 }));
        let illustrated = events
            .iter()
            .filter(|e| matches!(e, StoryEvent::PageIllustrated { .. }))
            .count();
        assert_eq!(illustrated, 4);
        assert!(matches!(events.last(), Some(StoryEvent::BookSaved { .. })));
    }
}
