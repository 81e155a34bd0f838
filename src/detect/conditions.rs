// src/detect/conditions.rs

//! Recursive evaluation of installer condition trees.
//!
//! Two conventions are pinned here and must not drift:
//!
//! - `Inactive` and `Missing` file states both test for absence from the
//!   installed set. The engine has no inactive-but-present notion, so the
//!   two states coincide; tests hold this in place.
//! - An empty composite is vacuously **true** under both `And` and `Or`.
//!   The same rule applies to both operators on purpose.

use crate::detect::state::EvaluationState;
use crate::fomod::model::{CompositeOp, Condition, FileState};

/// Evaluate a condition tree against the current state. Pure.
pub fn evaluate(condition: &Condition, state: &EvaluationState) -> bool {
    match condition {
        Condition::FilePresence { path, state: required } => {
            let present = state.is_installed(path);
            match required {
                FileState::Active => present,
                FileState::Inactive | FileState::Missing => !present,
            }
        }
        Condition::FlagEquals { name, value } => state.flag(name) == Some(value.as_str()),
        Condition::Composite { op, children } => {
            if children.is_empty() {
                return true;
            }
            match op {
                CompositeOp::And => children.iter().all(|c| evaluate(c, state)),
                CompositeOp::Or => children.iter().any(|c| evaluate(c, state)),
            }
        }
    }
}

/// Collect the paths of every `Active`-state file leaf, in declaration
/// order, without duplicates. These are the files a condition positively
/// depends on.
pub fn active_file_paths(condition: &Condition) -> Vec<String> {
    let mut paths = Vec::new();
    collect_active(condition, &mut paths);
    paths
}

fn collect_active(condition: &Condition, out: &mut Vec<String>) {
    match condition {
        Condition::FilePresence {
            path,
            state: FileState::Active,
        } => {
            if !out.iter().any(|p| p == path) {
                out.push(path.clone());
            }
        }
        Condition::FilePresence { .. } | Condition::FlagEquals { .. } => {}
        Condition::Composite { children, .. } => {
            for child in children {
                collect_active(child, out);
            }
        }
    }
}

/// Collect `Active`-state file leaves that do not hold against `state`, in
/// declaration order, without duplicates. Used to explain an unmet
/// module-level dependency.
pub fn missing_active_files(condition: &Condition, state: &EvaluationState) -> Vec<String> {
    let mut paths = Vec::new();
    collect_missing(condition, state, &mut paths);
    paths
}

fn collect_missing(condition: &Condition, state: &EvaluationState, out: &mut Vec<String>) {
    match condition {
        Condition::FilePresence {
            path,
            state: FileState::Active,
        } => {
            if !state.is_installed(path) && !out.iter().any(|p| p == path) {
                out.push(path.clone());
            }
        }
        Condition::FilePresence { .. } | Condition::FlagEquals { .. } => {}
        Condition::Composite { children, .. } => {
            for child in children {
                collect_missing(child, state, out);
            }
        }
    }
}
