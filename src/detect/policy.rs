// src/detect/policy.rs

//! Group cardinality policies over scored options.
//!
//! Every group declares how many of its options the wizard allowed, and the
//! same rule bounds how many this engine may report as selected. Thresholds
//! live here as named constants so tuning them never touches the selection
//! logic itself.

use crate::detect::matcher::OptionMatch;
use crate::fomod::model::GroupPolicy;

/// Minimum confidence for the single AtMostOne winner.
pub const AT_MOST_ONE_THRESHOLD: f64 = 0.5;

/// Minimum confidence for an Any-group member to count as selected.
pub const ANY_THRESHOLD: f64 = 0.4;

/// Minimum confidence for an All-group member to count as selected.
pub const ALL_THRESHOLD: f64 = 0.3;

/// A runner-up within this fraction of the top confidence is a near-tie:
/// co-selected under AtLeastOne, reported as ambiguous under ExactlyOne.
pub const NEAR_TIE_RATIO: f64 = 0.9;

/// Apply a group's cardinality rule to its scored options.
///
/// Returns `(selected, alternates)`. Input order is the group's declaration
/// order; matches are sorted descending by confidence with a stable sort, so
/// exact ties keep declaration order. Alternates are the non-selected
/// matches that scored above zero, also descending.
pub fn select(
    mut matches: Vec<OptionMatch>,
    policy: GroupPolicy,
) -> (Vec<OptionMatch>, Vec<OptionMatch>) {
    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let take = |m: &OptionMatch| -> bool {
        match policy {
            GroupPolicy::ExactlyOne | GroupPolicy::AtLeastOne => m.confidence > 0.0,
            GroupPolicy::AtMostOne => m.confidence > AT_MOST_ONE_THRESHOLD,
            GroupPolicy::Any => m.confidence > ANY_THRESHOLD,
            GroupPolicy::All => m.confidence > ALL_THRESHOLD,
        }
    };

    let mut selected = Vec::new();
    let mut alternates = Vec::new();
    let top = matches.first().map(|m| m.confidence).unwrap_or(0.0);

    for (i, m) in matches.into_iter().enumerate() {
        let picked = match policy {
            GroupPolicy::ExactlyOne | GroupPolicy::AtMostOne => i == 0 && take(&m),
            GroupPolicy::AtLeastOne => take(&m) && (i == 0 || m.confidence >= top * NEAR_TIE_RATIO),
            GroupPolicy::Any | GroupPolicy::All => take(&m),
        };
        if picked {
            selected.push(m);
        } else if m.confidence > 0.0 {
            alternates.push(m);
        }
    }

    (selected, alternates)
}

/// Whether a sorted score list is ambiguous under ExactlyOne: a real winner
/// with a runner-up inside the near-tie band.
pub fn is_near_tie(selected: &[OptionMatch], alternates: &[OptionMatch]) -> bool {
    let top = match selected.first() {
        Some(m) if m.confidence > 0.0 => m.confidence,
        _ => return false,
    };
    alternates
        .first()
        .is_some_and(|m| m.confidence >= top * NEAR_TIE_RATIO)
}
