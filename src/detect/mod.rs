// src/detect/mod.rs

//! The reconciliation engine: reconstructs installer selections after the
//! fact.
//!
//! Given the option tree, an index of the files a mod actually installed,
//! and an index of the extracted payload, [`reconcile`] replays the wizard
//! on paper. Steps run in declared order because a step's visibility and
//! type rules may read flags set by earlier winners; the pass is strictly
//! sequential by design. Scoring never mutates state; flags are merged only
//! after a step's winners are fixed.
//!
//! Everything short of a malformed config is reported, not raised: weak
//! scores, unselected required options, and near-ties all land in the
//! [`Report`] so the caller can see exactly how sure the engine is.

pub mod conditions;
pub mod matcher;
pub mod policy;
pub mod state;
pub mod step;
pub mod types;

pub use matcher::OptionMatch;
pub use state::EvaluationState;
pub use step::StepResult;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fomod::model::{Category, ModuleConfig};
use crate::index::ContentIndex;
use crate::progress::CancelToken;

/// Confidence assigned to fallback selections attributed purely by content
/// hash, outside the normal scoring pass.
pub const FALLBACK_CONFIDENCE: f64 = 0.25;

/// Quality gate: High needs detection rate and average confidence at or
/// above these.
pub const HIGH_RATE: f64 = 0.8;
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// Quality gate for Medium.
pub const MEDIUM_RATE: f64 = 0.5;
pub const MEDIUM_CONFIDENCE: f64 = 0.5;

/// Overall believability of a reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quality {
    High,
    Medium,
    Low,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    fn rate(detection_rate: f64, avg_confidence: f64) -> Self {
        if detection_rate >= HIGH_RATE && avg_confidence >= HIGH_CONFIDENCE {
            Self::High
        } else if detection_rate >= MEDIUM_RATE && avg_confidence >= MEDIUM_CONFIDENCE {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters carried through from index construction.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Diagnostics {
    pub installed_files: usize,
    pub payload_files: usize,
    /// Files excluded from either index because they could not be read.
    pub installed_skipped: usize,
    pub payload_skipped: usize,
}

/// Knobs for one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub cancel: CancelToken,
    /// Attribute files by raw content hash when no step selects anything.
    pub direct_match_fallback: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            direct_match_fallback: true,
        }
    }
}

/// The full reconstruction outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub module_name: String,
    pub quality: Quality,
    pub overall_success: bool,
    pub steps: Vec<StepResult>,
    pub required_file_matches: usize,
    pub required_file_total: usize,
    pub conditional_file_matches: usize,
    /// Selected options whose resolved category was Recommended.
    pub recommended_choices: Vec<String>,
    pub conflicts: Vec<String>,
    pub missing_dependencies: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl Report {
    /// One-line, pipe-delimited rendering for terminal or log display.
    pub fn summary_line(&self) -> String {
        let visible = self.steps.iter().filter(|s| s.visible).count();
        let selected = self
            .steps
            .iter()
            .filter(|s| s.visible && !s.selected.is_empty())
            .count();
        let recommended = if self.recommended_choices.is_empty() {
            "-".to_string()
        } else {
            self.recommended_choices.join(", ")
        };

        format!(
            "{} | quality: {} | success: {} | steps: {}/{} visible ({} total) | required files: {}/{} | conditional files: {} | recommended: {} | conflicts: {} | missing deps: {}",
            self.module_name,
            self.quality,
            if self.overall_success { "yes" } else { "no" },
            selected,
            visible,
            self.steps.len(),
            self.required_file_matches,
            self.required_file_total,
            self.conditional_file_matches,
            recommended,
            self.conflicts.len(),
            self.missing_dependencies.len(),
        )
    }
}

/// Reconstruct the selections that best explain the installed files.
///
/// `installed` indexes the files the mod actually put on disk; `payload`
/// indexes the extracted archive contents. The run is sequential across
/// steps and pure within each step; the cancel token is checked between
/// steps and cancellation discards all partial results.
pub fn reconcile(
    config: &ModuleConfig,
    installed: &ContentIndex,
    payload: &ContentIndex,
    options: &ReconcileOptions,
) -> Result<Report> {
    info!(
        module = %config.module_name,
        steps = config.steps.len(),
        options = config.option_count(),
        installed = installed.len(),
        payload = payload.len(),
        "reconciling installer selections"
    );

    let mut state = EvaluationState::with_installed(installed);

    // Required files are checked once, before any step, with empty flags.
    let required = matcher::tally_file_set(&config.required, payload, installed);

    let mut steps = Vec::with_capacity(config.steps.len());
    let mut conflicts = Vec::new();
    let mut recommended_choices = Vec::new();

    for (step_index, install_step) in config.steps.iter().enumerate() {
        if options.cancel.is_canceled() {
            return Err(Error::Canceled);
        }

        let result = step::analyze(install_step, step_index, payload, installed, &state);

        for conflict in &result.conflicts {
            conflicts.push(format!("step '{}': {}", install_step.name, conflict));
        }
        for m in &result.selected {
            if m.category == Category::Recommended {
                recommended_choices.push(format!("{}/{}", install_step.name, m.option_name));
            }
        }

        // Merge winners' flags in declaration order: option within group,
        // group within step, last writer wins.
        for group in &install_step.groups {
            for option in &group.options {
                if result.selected.iter().any(|m| m.option_name == option.name) {
                    for flag in &option.flags {
                        debug!(flag = %flag.name, value = %flag.value, "flag set by winner");
                        state.set_flag(&flag.name, &flag.value);
                    }
                }
            }
        }

        steps.push(result);
    }

    // Conditional installs see the final flag state.
    let mut conditional_file_matches = 0;
    for conditional in &config.conditional_installs {
        if conditions::evaluate(&conditional.condition, &state) {
            let tally = matcher::tally_file_set(&conditional.files, payload, installed);
            conditional_file_matches += tally.matched;
        }
    }

    let mut missing_dependencies = Vec::new();
    if let Some(deps) = &config.module_dependencies {
        if !conditions::evaluate(deps, &state) {
            missing_dependencies = conditions::missing_active_files(deps, &state);
            if missing_dependencies.is_empty() {
                missing_dependencies
                    .push("module-level dependencies not satisfied".to_string());
            }
        }
    }

    let nothing_selected = steps.iter().all(|s| s.selected.is_empty());
    if options.direct_match_fallback && !steps.is_empty() && nothing_selected {
        direct_match_fallback(config, installed, payload, &state, &mut steps);
    }

    let visible = steps.iter().filter(|s| s.visible).count();
    let selected_steps = steps
        .iter()
        .filter(|s| s.visible && !s.selected.is_empty())
        .count();
    let detection_rate = if visible == 0 {
        0.0
    } else {
        selected_steps as f64 / visible as f64
    };
    let avg_confidence = if visible == 0 {
        0.0
    } else {
        steps
            .iter()
            .filter(|s| s.visible)
            .map(|s| s.confidence)
            .sum::<f64>()
            / visible as f64
    };
    let quality = Quality::rate(detection_rate, avg_confidence);
    let overall_success = (config.steps.is_empty() || selected_steps > 0)
        && conflicts.is_empty()
        && missing_dependencies.is_empty();

    info!(
        quality = %quality,
        detection_rate,
        avg_confidence,
        conflicts = conflicts.len(),
        "reconciliation complete"
    );

    Ok(Report {
        module_name: config.module_name.clone(),
        quality,
        overall_success,
        steps,
        required_file_matches: required.matched,
        required_file_total: required.total,
        conditional_file_matches,
        recommended_choices,
        conflicts,
        missing_dependencies,
        diagnostics: Diagnostics {
            installed_files: installed.len(),
            payload_files: payload.len(),
            installed_skipped: installed.skipped(),
            payload_skipped: payload.skipped(),
        },
    })
}

/// Last-resort attribution by raw content hash.
///
/// Runs only when the scoring pass selected nothing anywhere. Every
/// installed hash found in the payload is traced back to the options whose
/// file directives name that payload path (or whose folder directives
/// prefix it); those options become low-confidence selections on their
/// step results. Flags are not applied and nothing is re-scored.
fn direct_match_fallback(
    config: &ModuleConfig,
    installed: &ContentIndex,
    payload: &ContentIndex,
    state: &EvaluationState,
    steps: &mut [StepResult],
) {
    use crate::paths;

    debug!("no step selected anything, trying direct hash matching");

    for installed_entry in installed.entries() {
        for payload_entry in payload.lookup_by_hash(&installed_entry.hash) {
            let folded = paths::fold_case(&payload_entry.path);

            for (step_index, install_step) in config.steps.iter().enumerate() {
                // Hidden steps stay empty even under the fallback.
                if !steps[step_index].visible {
                    continue;
                }
                for group in &install_step.groups {
                    for option in &group.options {
                        let hit = option
                            .files
                            .files
                            .iter()
                            .any(|d| paths::fold_case(&d.source) == folded)
                            || option.files.folders.iter().any(|d| {
                                let source = paths::fold_case(&d.source);
                                source.is_empty()
                                    || folded.starts_with(&format!("{}/", source))
                            });
                        if !hit {
                            continue;
                        }

                        let result = &mut steps[step_index];
                        match result
                            .selected
                            .iter_mut()
                            .find(|m| m.option_name == option.name)
                        {
                            Some(existing) => existing.matched_files += 1,
                            None => {
                                debug!(
                                    option = %option.name,
                                    path = %payload_entry.path,
                                    "fallback selection by direct hash match"
                                );
                                result.selected.push(OptionMatch {
                                    option_name: option.name.clone(),
                                    confidence: FALLBACK_CONFIDENCE,
                                    matched_files: 1,
                                    total_files: 1,
                                    perfect_matches: 0,
                                    category: types::resolve_category(option, state),
                                    notes: vec!["direct hash match (fallback)".to_string()],
                                });
                                result.confidence = FALLBACK_CONFIDENCE;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fomod::model::{
        CompositeOp, Condition, ConditionalInstall, CopyDirective, FileSet, FileState, FlagSet,
        GroupPolicy, InstallStep, InstallerOption, OptionGroup,
    };
    use crate::index::{ContentIndex, FileIdentity};

    fn index(entries: &[(&str, &str)]) -> ContentIndex {
        ContentIndex::from_entries(
            entries
                .iter()
                .map(|(path, hash)| FileIdentity::new(*path, *hash, 1)),
        )
    }

    fn directive(source: &str, destination: &str) -> CopyDirective {
        CopyDirective {
            source: source.to_string(),
            destination: destination.to_string(),
            priority: 0,
            always_install: false,
            install_if_usable: false,
        }
    }

    fn option(name: &str, files: Vec<CopyDirective>, flags: Vec<FlagSet>) -> InstallerOption {
        InstallerOption {
            name: name.to_string(),
            description: String::new(),
            image: None,
            type_rule: None,
            files: FileSet {
                files,
                folders: vec![],
            },
            flags,
        }
    }

    fn flag(name: &str, value: &str) -> FlagSet {
        FlagSet {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn config(steps: Vec<InstallStep>) -> ModuleConfig {
        ModuleConfig {
            module_name: "Test Mod".to_string(),
            module_dependencies: None,
            required: FileSet::default(),
            steps,
            conditional_installs: vec![],
        }
    }

    fn one_option_step(step_name: &str, opt: InstallerOption) -> InstallStep {
        InstallStep {
            name: step_name.to_string(),
            visibility: None,
            groups: vec![OptionGroup {
                name: "Main".to_string(),
                policy: GroupPolicy::ExactlyOne,
                options: vec![opt],
            }],
        }
    }

    #[test]
    fn test_empty_config_succeeds() {
        let report = reconcile(
            &config(vec![]),
            &index(&[]),
            &index(&[]),
            &ReconcileOptions::default(),
        )
        .unwrap();
        assert!(report.overall_success);
        assert_eq!(report.quality, Quality::Low);
        assert!(report.steps.is_empty());
    }

    #[test]
    fn test_single_perfect_step_is_high_quality() {
        let cfg = config(vec![one_option_step(
            "Main",
            option("A", vec![directive("a/x.esp", "x.esp")], vec![]),
        )]);
        let payload = index(&[("a/x.esp", "H1")]);
        let installed = index(&[("x.esp", "H1")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert_eq!(report.quality, Quality::High);
        assert!(report.overall_success);
        assert_eq!(report.steps[0].selected[0].option_name, "A");
        assert_eq!(report.steps[0].selected[0].confidence, 1.0);
    }

    #[test]
    fn test_flags_thread_between_steps() {
        // Step 1's winner sets a flag; step 2 is only visible when it holds.
        let step1 = one_option_step(
            "Choose",
            option(
                "Full",
                vec![directive("full/x.esp", "x.esp")],
                vec![flag("mode", "full")],
            ),
        );
        let mut step2 = one_option_step(
            "Extras",
            option("Bonus", vec![directive("bonus/y.esp", "y.esp")], vec![]),
        );
        step2.visibility = Some(Condition::FlagEquals {
            name: "mode".to_string(),
            value: "full".to_string(),
        });

        let payload = index(&[("full/x.esp", "H1"), ("bonus/y.esp", "H2")]);
        let installed = index(&[("x.esp", "H1"), ("y.esp", "H2")]);

        let cfg = config(vec![step1, step2]);
        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert!(report.steps[1].visible);
        assert_eq!(report.steps[1].selected[0].option_name, "Bonus");

        // Without the matching install, the flag is never set and step 2
        // stays hidden.
        let installed = index(&[("y.esp", "H2")]);
        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert!(report.steps[0].selected.is_empty());
        assert!(!report.steps[1].visible);
    }

    #[test]
    fn test_required_files_checked_before_steps() {
        let mut cfg = config(vec![]);
        cfg.required.files = vec![
            directive("base/core.esp", "core.esp"),
            directive("base/absent.esp", "absent.esp"),
        ];
        let payload = index(&[("base/core.esp", "H1"), ("base/absent.esp", "H2")]);
        let installed = index(&[("core.esp", "H1")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert_eq!(report.required_file_matches, 1);
        assert_eq!(report.required_file_total, 2);
    }

    #[test]
    fn test_conditional_installs_use_final_state() {
        let step1 = one_option_step(
            "Choose",
            option(
                "Full",
                vec![directive("full/x.esp", "x.esp")],
                vec![flag("extras", "on")],
            ),
        );
        let mut cfg = config(vec![step1]);
        cfg.conditional_installs = vec![ConditionalInstall {
            condition: Condition::FlagEquals {
                name: "extras".to_string(),
                value: "on".to_string(),
            },
            files: FileSet {
                files: vec![directive("cond/z.esp", "z.esp")],
                folders: vec![],
            },
        }];

        let payload = index(&[("full/x.esp", "H1"), ("cond/z.esp", "H3")]);
        let installed = index(&[("x.esp", "H1"), ("z.esp", "H3")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert_eq!(report.conditional_file_matches, 1);
    }

    #[test]
    fn test_missing_module_dependencies_reported() {
        let mut cfg = config(vec![]);
        cfg.module_dependencies = Some(Condition::Composite {
            op: CompositeOp::And,
            children: vec![Condition::FilePresence {
                path: "skse_loader.exe".to_string(),
                state: FileState::Active,
            }],
        });

        let report = reconcile(
            &cfg,
            &index(&[]),
            &index(&[]),
            &ReconcileOptions::default(),
        )
        .unwrap();
        assert_eq!(report.missing_dependencies, vec!["skse_loader.exe"]);
        assert!(!report.overall_success);
    }

    #[test]
    fn test_recommended_choice_recorded() {
        use crate::fomod::model::{Category, TypeRule};

        let mut opt = option("HD Pack", vec![directive("hd/t.dds", "t.dds")], vec![]);
        opt.type_rule = Some(TypeRule::Static(Category::Recommended));
        let cfg = config(vec![one_option_step("Textures", opt)]);

        let payload = index(&[("hd/t.dds", "H1")]);
        let installed = index(&[("t.dds", "H1")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert_eq!(report.recommended_choices, vec!["Textures/HD Pack"]);
    }

    #[test]
    fn test_conflicts_carry_step_name() {
        use crate::fomod::model::{Category, TypeRule};

        let mut opt = option("Core", vec![directive("core/a.esp", "a.esp")], vec![]);
        opt.type_rule = Some(TypeRule::Static(Category::Required));
        let cfg = config(vec![one_option_step("Base", opt)]);

        let payload = index(&[("core/a.esp", "H_other")]);
        let installed = index(&[("a.esp", "H1")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert!(report.conflicts[0].starts_with("step 'Base':"));
        assert!(!report.overall_success);
    }

    #[test]
    fn test_fallback_attributes_by_hash() {
        // The declared destination doesn't exist, so scoring finds nothing;
        // the fallback still ties the installed hash back to option A.
        let cfg = config(vec![one_option_step(
            "Main",
            option("A", vec![directive("a/x.esp", "elsewhere/x.esp")], vec![]),
        )]);
        let payload = index(&[("a/x.esp", "H1")]);
        let installed = index(&[("totally/different/path.esp", "H1")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        let selected = &report.steps[0].selected;
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].option_name, "A");
        assert_eq!(selected[0].confidence, FALLBACK_CONFIDENCE);
        assert!(selected[0].notes.iter().any(|n| n.contains("direct hash match")));
    }

    #[test]
    fn test_fallback_disabled() {
        let cfg = config(vec![one_option_step(
            "Main",
            option("A", vec![directive("a/x.esp", "elsewhere/x.esp")], vec![]),
        )]);
        let payload = index(&[("a/x.esp", "H1")]);
        let installed = index(&[("other.esp", "H1")]);

        let opts = ReconcileOptions {
            direct_match_fallback: false,
            ..Default::default()
        };
        let report = reconcile(&cfg, &installed, &payload, &opts).unwrap();
        assert!(report.steps[0].selected.is_empty());
    }

    #[test]
    fn test_cancellation_between_steps() {
        let cfg = config(vec![one_option_step(
            "Main",
            option("A", vec![], vec![]),
        )]);
        let opts = ReconcileOptions::default();
        opts.cancel.cancel();

        let err = reconcile(&cfg, &index(&[]), &index(&[]), &opts).unwrap_err();
        assert!(matches!(err, Error::Canceled));
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let cfg = config(vec![
            one_option_step("One", option("A", vec![directive("a/x.esp", "x.esp")], vec![])),
            one_option_step("Two", option("B", vec![directive("b/y.esp", "y.esp")], vec![])),
        ]);
        let payload = index(&[("a/x.esp", "H1"), ("b/y.esp", "H2")]);
        let installed = index(&[("x.esp", "H1"), ("y.esp", "H2")]);

        let first = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        let second = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_summary_line_shape() {
        let cfg = config(vec![one_option_step(
            "Main",
            option("A", vec![directive("a/x.esp", "x.esp")], vec![]),
        )]);
        let payload = index(&[("a/x.esp", "H1")]);
        let installed = index(&[("x.esp", "H1")]);

        let report = reconcile(&cfg, &installed, &payload, &ReconcileOptions::default()).unwrap();
        let line = report.summary_line();
        assert!(line.starts_with("Test Mod | quality: High"));
        assert!(line.contains("steps: 1/1 visible (1 total)"));
        assert!(line.contains("conflicts: 0"));
    }
}
