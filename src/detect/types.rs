// src/detect/types.rs

//! Resolves an option's effective category for the current state.

use crate::detect::conditions;
use crate::detect::state::EvaluationState;
use crate::fomod::model::{Category, InstallerOption, TypePattern, TypeRule};

/// Resolve the category an installer would have shown for this option.
///
/// A static category always wins. Otherwise patterns are tried in declared
/// order and the first whose condition holds decides; order dependence is
/// intentional (first applicable rule wins, exactly like the wizard).
/// Options with no type information at all are `Optional`.
pub fn resolve_category(option: &InstallerOption, state: &EvaluationState) -> Category {
    match &option.type_rule {
        None => Category::Optional,
        Some(TypeRule::Static(category)) => *category,
        Some(TypeRule::Dependent { patterns, default }) => patterns
            .iter()
            .find(|p| conditions::evaluate(&p.condition, state))
            .map(|p| p.category)
            .unwrap_or(*default),
    }
}

/// The pattern that decided a dependent category, if any did.
pub fn matched_pattern<'a>(
    option: &'a InstallerOption,
    state: &EvaluationState,
) -> Option<&'a TypePattern> {
    match &option.type_rule {
        Some(TypeRule::Dependent { patterns, .. }) => patterns
            .iter()
            .find(|p| conditions::evaluate(&p.condition, state)),
        _ => None,
    }
}
