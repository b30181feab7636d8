//! Content-addressed illustration cache.
//!
//! Image generation is the expensive, paid step of building a book. This module
//! lets the resolver skip it whenever an identical illustration description has
//! been seen before, across runs.
//!
//! # Design
//!
//! ## Cache keys
//!
//! Keys are derived from the canonical input, never from where the output ends
//! up: [`content_key`] is the SHA-256 digest of the input string truncated to
//! [`KEY_LEN`] hex characters. The same description always maps to the same
//! file, so a second request for it costs nothing. 64 bits of digest keeps
//! accidental collisions out of reach for a library of thousands of pages.
//!
//! ## Storage
//!
//! Each artifact is a single file named `<key>.png` inside the cache
//! directory. There is no manifest: the directory listing is the index.
//!
//! A hit requires the file to exist **and** be non-empty. A zero-byte file is
//! what a crashed write from an older run leaves behind, so it is treated as a
//! miss and regenerated.
//!
//! ## Concurrency
//!
//! There is no locking. Writers stage the bytes in a temp file in the same
//! directory and rename it into place, so readers never observe a partial
//! file. Two writers racing on one key write the same content; the last
//! rename wins and nothing is lost.
//!
//! Entries are never invalidated or evicted.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of hex characters kept from the SHA-256 digest.
pub const KEY_LEN: usize = 16;

/// Extension of every cached artifact.
const ARTIFACT_EXTENSION: &str = "png";

/// Deterministic key for a canonical input string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 of `input`, truncated to [`KEY_LEN`] lowercase hex characters.
pub fn content_key(input: &str) -> CacheKey {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(KEY_LEN);
    CacheKey(hex)
}

/// Directory of artifacts named by their [`CacheKey`].
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the artifact for `key` lives, whether or not it exists yet.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ARTIFACT_EXTENSION))
    }

    /// Returns the artifact path if a non-empty file is stored under `key`.
    pub fn get(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.path_for(key);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            Ok(_) => {
                debug!(key = %key, "ignoring empty cache entry");
                None
            }
            Err(_) => None,
        }
    }

    /// Store `bytes` under `key`, replacing any previous artifact.
    pub fn put(&self, key: &CacheKey, bytes: &[u8]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        write_atomic(&path, bytes)?;
        debug!(key = %key, bytes = bytes.len(), "stored cache entry");
        Ok(path)
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Summary of illustration cache performance for one book.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.misses)
        }
    }
}
