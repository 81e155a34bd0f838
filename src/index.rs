// src/index.rs

//! Content index over a file set: lookup by path, folded path, suffix, and
//! content hash.
//!
//! Two indexes drive a detection run. One covers the files a mod actually
//! installed (from the store or a listing), the other covers the extracted
//! archive payload. Installer configs reference files with whatever casing
//! and path depth their author used, so lookups run a ladder: exact
//! normalized path, then case-folded path, then a suffix scan for configs
//! that name files by their tail components only.
//!
//! [`IndexBuilder`] constructs an index from a directory on disk, hashing
//! files in parallel. Workers only compute rows; the builder thread owns the
//! maps and merges after each batch, so the index needs no interior locking.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::hash::{self, HashAlgorithm};
use crate::paths;
use crate::progress::{CancelToken, ProgressTracker, SilentProgress};

/// Files are hashed in batches of this size, with a cancellation check
/// between batches.
pub const HASH_BATCH: usize = 64;

/// One file known to an index: normalized relative path, encoded content
/// hash, and size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: String,
    pub hash: String,
    pub size: u64,
}

impl FileIdentity {
    pub fn new(path: impl Into<String>, hash: impl Into<String>, size: u64) -> Self {
        Self {
            path: paths::normalize(&path.into()),
            hash: hash.into(),
            size,
        }
    }
}

/// How a path lookup found its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Normalized paths were equal, case and all.
    Exact,
    /// Paths were equal after case folding.
    CaseInsensitive,
    /// The query matched the tail components of a stored path.
    Suffix,
}

/// Path- and hash-addressable view of a file set.
///
/// Entries keep insertion order; duplicate paths keep the first entry, which
/// mirrors how installers resolve collisions. Lookups never fail, they just
/// return `None`.
#[derive(Debug, Default)]
pub struct ContentIndex {
    entries: Vec<FileIdentity>,
    folded: Vec<String>,
    by_path: HashMap<String, usize>,
    by_folded: HashMap<String, usize>,
    by_hash: HashMap<String, Vec<usize>>,
    skipped: usize,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = FileIdentity>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Add an entry. The path is normalized; a duplicate normalized path is
    /// dropped so the first occurrence wins.
    pub fn insert(&mut self, mut entry: FileIdentity) {
        entry.path = paths::normalize(&entry.path);
        if self.by_path.contains_key(&entry.path) {
            debug!("duplicate path in index, keeping first: {}", entry.path);
            return;
        }

        let folded = entry.path.to_ascii_lowercase();
        let slot = self.entries.len();
        self.by_path.insert(entry.path.clone(), slot);
        self.by_folded.entry(folded.clone()).or_insert(slot);
        self.by_hash.entry(entry.hash.clone()).or_default().push(slot);
        self.folded.push(folded);
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files that could not be read or hashed during construction.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn entries(&self) -> &[FileIdentity] {
        &self.entries
    }

    /// Case-folded forms of every stored path, in insertion order.
    pub fn folded_paths(&self) -> impl Iterator<Item = &str> {
        self.folded.iter().map(String::as_str)
    }

    pub fn lookup_exact(&self, path: &str) -> Option<&FileIdentity> {
        let normalized = paths::normalize(path);
        self.by_path.get(&normalized).map(|&i| &self.entries[i])
    }

    pub fn lookup_case_insensitive(&self, path: &str) -> Option<&FileIdentity> {
        let folded = paths::fold_case(path);
        self.by_folded.get(&folded).map(|&i| &self.entries[i])
    }

    /// First stored path (insertion order) whose folded form equals the
    /// folded query or ends with `/<query>`. Fuzzy and best-effort.
    pub fn lookup_by_suffix(&self, short_path: &str) -> Option<&FileIdentity> {
        let folded = paths::fold_case(short_path);
        if folded.is_empty() {
            return None;
        }
        let tail = format!("/{}", folded);
        self.folded
            .iter()
            .position(|stored| *stored == folded || stored.ends_with(&tail))
            .map(|i| &self.entries[i])
    }

    /// Resolve a config-referenced path via the full lookup ladder.
    pub fn resolve(&self, path: &str) -> Option<(&FileIdentity, MatchKind)> {
        if let Some(entry) = self.lookup_exact(path) {
            return Some((entry, MatchKind::Exact));
        }
        if let Some(entry) = self.lookup_case_insensitive(path) {
            return Some((entry, MatchKind::CaseInsensitive));
        }
        self.lookup_by_suffix(path)
            .map(|entry| (entry, MatchKind::Suffix))
    }

    /// All entries with the given content hash, in insertion order.
    pub fn lookup_by_hash(&self, hash: &str) -> Vec<&FileIdentity> {
        self.by_hash
            .get(hash)
            .map(|slots| slots.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Entries whose folded path starts with `folded_prefix` (callers fold
    /// the prefix and append `/` themselves).
    pub fn entries_under<'a>(
        &'a self,
        folded_prefix: &'a str,
    ) -> impl Iterator<Item = &'a FileIdentity> {
        self.folded
            .iter()
            .zip(&self.entries)
            .filter(move |(folded, _)| folded.starts_with(folded_prefix))
            .map(|(_, entry)| entry)
    }
}

/// Builds a [`ContentIndex`] from a directory tree.
///
/// # Example
///
/// ```ignore
/// let index = IndexBuilder::new("/tmp/payload")
///     .algorithm(HashAlgorithm::Xxh64)
///     .build()?;
/// ```
pub struct IndexBuilder {
    root: PathBuf,
    algorithm: HashAlgorithm,
    cancel: CancelToken,
    progress: Option<Arc<dyn ProgressTracker>>,
}

impl IndexBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            algorithm: HashAlgorithm::default(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Walk the tree and hash every regular file.
    ///
    /// Unreadable files are logged, counted in [`ContentIndex::skipped`],
    /// and left out; they never fail the build. Cancellation aborts with
    /// [`Error::Canceled`] and discards partial results.
    pub fn build(&self) -> Result<ContentIndex> {
        let fallback = SilentProgress::new();
        let progress: &dyn ProgressTracker = match &self.progress {
            Some(p) => p.as_ref(),
            None => &fallback,
        };

        let mut skipped = 0usize;
        let mut work: Vec<(PathBuf, String, u64)> = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => paths::normalize(&rel.to_string_lossy()),
                Err(_) => continue,
            };
            match entry.metadata() {
                Ok(meta) => work.push((entry.path().to_path_buf(), rel, meta.len())),
                Err(err) => {
                    warn!("skipping {}: {}", entry.path().display(), err);
                    skipped += 1;
                }
            }
        }

        progress.set_length(work.len() as u64);
        progress.set_message("hashing files");

        let mut index = ContentIndex::new();
        for batch in work.chunks(HASH_BATCH) {
            if self.cancel.is_canceled() {
                progress.finish_with_error("canceled");
                return Err(Error::Canceled);
            }

            let rows: Vec<Option<FileIdentity>> = batch
                .par_iter()
                .map(|(abs, rel, size)| match hash::hash_file(self.algorithm, abs) {
                    Ok(hash) => Some(FileIdentity {
                        path: rel.clone(),
                        hash: hash.to_string(),
                        size: *size,
                    }),
                    Err(err) => {
                        warn!("skipping {}: {}", abs.display(), err);
                        None
                    }
                })
                .collect();

            for row in rows {
                match row {
                    Some(entry) => index.insert(entry),
                    None => skipped += 1,
                }
            }
            progress.increment(batch.len() as u64);
        }

        index.skipped = skipped;
        progress.finish_with_message(&format!(
            "hashed {} files ({} skipped)",
            index.len(),
            skipped
        ));
        Ok(index)
    }
}
