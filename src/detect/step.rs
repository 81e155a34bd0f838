// src/detect/step.rs

//! Per-step analysis: visibility, group scoring, winners, and conflicts.

use serde::Serialize;
use tracing::debug;

use crate::detect::matcher::{self, OptionMatch};
use crate::detect::state::EvaluationState;
use crate::detect::{conditions, policy, types};
use crate::fomod::model::{Category, GroupPolicy, InstallStep};
use crate::index::ContentIndex;

/// The reconstructed outcome of one install step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_index: usize,
    pub step_name: String,
    pub visible: bool,
    pub selected: Vec<OptionMatch>,
    /// Best selected confidence, 0 when nothing was selected.
    pub confidence: f64,
    /// Non-selected options that scored above zero, strongest first.
    /// Zero-scored options are omitted: their payload bytes are not in the
    /// install, so they are unusable, not plausible runners-up.
    pub alternates: Vec<OptionMatch>,
    /// Files the step's visibility and the winners' type patterns depend on.
    pub required_dependencies: Vec<String>,
    pub conflicts: Vec<String>,
    pub notes: Vec<String>,
}

impl StepResult {
    fn hidden(step_index: usize, step_name: &str) -> Self {
        Self {
            step_index,
            step_name: step_name.to_string(),
            visible: false,
            selected: Vec::new(),
            confidence: 0.0,
            alternates: Vec::new(),
            required_dependencies: Vec::new(),
            conflicts: Vec::new(),
            notes: vec!["hidden: visibility condition not met".to_string()],
        }
    }
}

/// Analyze one step against the state at step entry.
///
/// A hidden step short-circuits: no option is scored. For a visible step
/// every option of every group is scored (purely, against the entry state),
/// the group's policy picks winners, and everything else becomes an
/// alternate. Two kinds of conflict are flagged: a Required-category option
/// the policy did not select, and an ExactlyOne group whose runner-up landed
/// in the near-tie band.
pub fn analyze(
    step: &InstallStep,
    step_index: usize,
    payload: &ContentIndex,
    installed: &ContentIndex,
    state: &EvaluationState,
) -> StepResult {
    if let Some(visibility) = &step.visibility {
        if !conditions::evaluate(visibility, state) {
            debug!(step = %step.name, "step hidden, skipping");
            return StepResult::hidden(step_index, &step.name);
        }
    }

    let mut result = StepResult {
        step_index,
        step_name: step.name.clone(),
        visible: true,
        selected: Vec::new(),
        confidence: 0.0,
        alternates: Vec::new(),
        required_dependencies: Vec::new(),
        conflicts: Vec::new(),
        notes: Vec::new(),
    };

    if let Some(visibility) = &step.visibility {
        result.required_dependencies = conditions::active_file_paths(visibility);
    }

    for group in &step.groups {
        let matches: Vec<OptionMatch> = group
            .options
            .iter()
            .map(|option| matcher::score(option, payload, installed, state))
            .collect();

        let required_names: Vec<String> = matches
            .iter()
            .filter(|m| m.category == Category::Required)
            .map(|m| m.option_name.clone())
            .collect();

        let (selected, alternates) = policy::select(matches, group.policy);

        if group.policy == GroupPolicy::ExactlyOne && policy::is_near_tie(&selected, &alternates) {
            result.conflicts.push(format!(
                "ambiguous selection in group '{}': '{}' ({:.2}) barely outscores '{}' ({:.2})",
                group.name,
                selected[0].option_name,
                selected[0].confidence,
                alternates[0].option_name,
                alternates[0].confidence,
            ));
        }

        for name in required_names {
            if !selected.iter().any(|m| m.option_name == name) {
                result.conflicts.push(format!(
                    "required option '{}' in group '{}' was not selected",
                    name, group.name
                ));
            }
        }

        for m in &selected {
            for path in option_pattern_dependencies(group, &m.option_name, state) {
                if !result.required_dependencies.contains(&path) {
                    result.required_dependencies.push(path);
                }
            }
        }

        result.selected.extend(selected);
        result.alternates.extend(alternates);
    }

    result.confidence = result
        .selected
        .iter()
        .map(|m| m.confidence)
        .fold(0.0, f64::max);

    debug!(
        step = %step.name,
        selected = result.selected.len(),
        confidence = result.confidence,
        conflicts = result.conflicts.len(),
        "step analyzed"
    );
    result
}

/// Active file paths from the type pattern that decided a winner's category.
fn option_pattern_dependencies(
    group: &crate::fomod::model::OptionGroup,
    option_name: &str,
    state: &EvaluationState,
) -> Vec<String> {
    group
        .options
        .iter()
        .find(|o| o.name == option_name)
        .and_then(|o| types::matched_pattern(o, state))
        .map(|p| conditions::active_file_paths(&p.condition))
        .unwrap_or_default()
}
