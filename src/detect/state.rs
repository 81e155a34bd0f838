// src/detect/state.rs

//! Mutable evaluation state threaded through a reconciliation run.

use std::collections::{BTreeMap, HashSet};

use crate::index::ContentIndex;
use crate::paths;

/// Flags set by selected options plus the fixed set of installed paths.
///
/// The installed set is folded once at construction and never changes;
/// flags are merged in by the engine after each step's winners are known.
/// Scoring and condition evaluation only ever read this. Flags live in a
/// `BTreeMap` so every serialization of derived results is deterministic.
#[derive(Debug, Clone, Default)]
pub struct EvaluationState {
    flags: BTreeMap<String, String>,
    installed: HashSet<String>,
}

impl EvaluationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the installed-path set from an index of installed files.
    pub fn with_installed(index: &ContentIndex) -> Self {
        Self {
            flags: BTreeMap::new(),
            installed: index.folded_paths().map(str::to_string).collect(),
        }
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.flags.insert(name.into(), value.into());
    }

    /// Current value of a flag, `None` when never set.
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    pub fn flags(&self) -> &BTreeMap<String, String> {
        &self.flags
    }

    /// Whether a path is in the installed set. The query is normalized and
    /// case-folded before the check.
    pub fn is_installed(&self, path: &str) -> bool {
        self.installed.contains(&paths::fold_case(path))
    }

    pub fn mark_installed(&mut self, path: &str) {
        self.installed.insert(paths::fold_case(path));
    }

    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }
}
