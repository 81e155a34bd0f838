// src/detect/matcher.rs

//! Per-option confidence scoring.
//!
//! An option's declared copy directives predict which files its selection
//! would have put into the install. Scoring resolves each directive's source
//! against the payload index and its destination against the installed
//! index, compares content hashes, and folds the tally into a confidence in
//! `[0, 1]`. A "perfect" match resolved both paths exactly, with no case
//! folding or suffix guessing involved.
//!
//! Scoring is a pure function of the state at step entry; it never mutates
//! anything.

use serde::Serialize;
use tracing::trace;

use crate::detect::state::EvaluationState;
use crate::detect::types;
use crate::fomod::model::{Category, CopyDirective, FileSet, InstallerOption};
use crate::index::{ContentIndex, MatchKind};
use crate::paths;

/// Confidence assigned to an option that declares no files at all but does
/// set flags: structurally plausible, unverifiable from file evidence.
pub const FLAG_ONLY_CONFIDENCE: f64 = 0.5;

/// Weight of each perfect match in the bounded upward adjustment
/// (`(matched + PERFECT_BONUS * perfect) / total`, at most +20%).
pub const PERFECT_BONUS: f64 = 0.2;

/// Flat bonus applied when any matched directive has a priority above
/// [`PRIORITY_THRESHOLD`].
pub const PRIORITY_BONUS: f64 = 0.05;

/// Priorities above this mark a directive the installer considered
/// load-bearing.
pub const PRIORITY_THRESHOLD: i64 = 0;

/// Per-category confidence multipliers.
pub const REQUIRED_MULTIPLIER: f64 = 1.3;
pub const RECOMMENDED_MULTIPLIER: f64 = 1.1;
pub const COULD_BE_USABLE_MULTIPLIER: f64 = 0.8;

/// Score of one option against the evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionMatch {
    pub option_name: String,
    pub confidence: f64,
    pub matched_files: usize,
    pub total_files: usize,
    pub perfect_matches: usize,
    pub category: Category,
    pub notes: Vec<String>,
}

impl OptionMatch {
    fn unscored(option: &InstallerOption, category: Category, note: impl Into<String>) -> Self {
        Self {
            option_name: option.name.clone(),
            confidence: 0.0,
            matched_files: 0,
            total_files: 0,
            perfect_matches: 0,
            category,
            notes: vec![note.into()],
        }
    }
}

/// Running totals over a file set's directives.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectiveTally {
    pub matched: usize,
    pub total: usize,
    pub perfect: usize,
    /// Matches that needed the suffix fallback to resolve a path.
    pub fuzzy: usize,
    /// A matched directive carried priority above the threshold.
    pub priority_hit: bool,
}

/// Score an option against the payload and installed indexes.
pub fn score(
    option: &InstallerOption,
    payload: &ContentIndex,
    installed: &ContentIndex,
    state: &EvaluationState,
) -> OptionMatch {
    let category = types::resolve_category(option, state);
    if category == Category::NotUsable {
        return OptionMatch::unscored(option, category, "not usable for this install");
    }

    let tally = tally_file_set(&option.files, payload, installed);

    if tally.total == 0 {
        if !option.flags.is_empty() {
            let mut m = OptionMatch::unscored(
                option,
                category,
                "structural-only: option sets flags but declares no files",
            );
            m.confidence = FLAG_ONLY_CONFIDENCE;
            return m;
        }
        return OptionMatch::unscored(option, category, "no files or flags declared");
    }

    let adjusted = ((tally.matched as f64 + PERFECT_BONUS * tally.perfect as f64)
        / tally.total as f64)
        .min(1.0);
    let multiplier = match category {
        Category::Required => REQUIRED_MULTIPLIER,
        Category::Recommended => RECOMMENDED_MULTIPLIER,
        Category::CouldBeUsable => COULD_BE_USABLE_MULTIPLIER,
        Category::Optional | Category::NotUsable => 1.0,
    };
    let mut confidence = adjusted * multiplier;
    if tally.priority_hit {
        confidence += PRIORITY_BONUS;
    }
    confidence = confidence.clamp(0.0, 1.0);

    let mut notes = Vec::new();
    if tally.matched == 0 {
        notes.push("not usable for this install: no declared file is present".to_string());
    }
    if tally.fuzzy > 0 {
        notes.push(format!(
            "{} match(es) resolved by suffix only (best-effort)",
            tally.fuzzy
        ));
    }

    trace!(
        option = %option.name,
        matched = tally.matched,
        total = tally.total,
        perfect = tally.perfect,
        confidence,
        "scored option"
    );

    OptionMatch {
        option_name: option.name.clone(),
        confidence,
        matched_files: tally.matched,
        total_files: tally.total,
        perfect_matches: tally.perfect,
        category,
        notes,
    }
}

/// Walk a file set's directives and count present/perfect outputs.
///
/// Shared by option scoring, the required-files check, and the
/// conditional-install pass.
pub fn tally_file_set(
    files: &FileSet,
    payload: &ContentIndex,
    installed: &ContentIndex,
) -> DirectiveTally {
    let mut tally = DirectiveTally::default();
    for directive in &files.files {
        tally_file(directive, payload, installed, &mut tally);
    }
    for directive in &files.folders {
        tally_folder(directive, payload, installed, &mut tally);
    }
    tally
}

fn tally_file(
    directive: &CopyDirective,
    payload: &ContentIndex,
    installed: &ContentIndex,
    tally: &mut DirectiveTally,
) {
    tally.total += 1;

    let destination = if directive.destination.is_empty() {
        directive.source.as_str()
    } else {
        directive.destination.as_str()
    };

    let Some((source_entry, source_kind)) = payload.resolve(&directive.source) else {
        return;
    };
    let Some((dest_entry, dest_kind)) = installed.resolve(destination) else {
        return;
    };
    if source_entry.hash != dest_entry.hash {
        return;
    }

    tally.matched += 1;
    if source_kind == MatchKind::Exact && dest_kind == MatchKind::Exact {
        tally.perfect += 1;
    }
    if source_kind == MatchKind::Suffix || dest_kind == MatchKind::Suffix {
        tally.fuzzy += 1;
    }
    if directive.priority > PRIORITY_THRESHOLD {
        tally.priority_hit = true;
    }
}

fn tally_folder(
    directive: &CopyDirective,
    payload: &ContentIndex,
    installed: &ContentIndex,
    tally: &mut DirectiveTally,
) {
    let folded_source = paths::fold_case(&directive.source);
    let destination = paths::normalize(&directive.destination);

    // ASCII case folding keeps byte offsets, so the folded prefix length
    // applies to the original-case entry path too.
    let prefix = if folded_source.is_empty() {
        String::new()
    } else {
        format!("{}/", folded_source)
    };

    let mut seen_any = false;
    for entry in payload.entries_under(&prefix) {
        seen_any = true;
        tally.total += 1;

        let relative = &entry.path[prefix.len()..];
        let dest_path = if destination.is_empty() {
            entry.path.clone()
        } else {
            format!("{}/{}", destination, relative)
        };

        let Some((dest_entry, dest_kind)) = installed.resolve(&dest_path) else {
            continue;
        };
        if entry.hash != dest_entry.hash {
            continue;
        }

        tally.matched += 1;
        if dest_kind == MatchKind::Exact {
            tally.perfect += 1;
        }
        if dest_kind == MatchKind::Suffix {
            tally.fuzzy += 1;
        }
        if directive.priority > PRIORITY_THRESHOLD {
            tally.priority_hit = true;
        }
    }

    // An unresolvable folder still counts against the option.
    if !seen_any {
        tally.total += 1;
    }
}
