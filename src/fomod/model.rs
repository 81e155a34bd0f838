// src/fomod/model.rs

//! Data model for the installer option tree.
//!
//! Mirrors the `ModuleConfig.xml` schema: a module carries optional
//! module-level dependencies, files that are always installed, an ordered
//! list of install steps (each holding option groups), and conditional
//! installs evaluated after the last step. The XML calls options "plugins";
//! this crate names them options throughout.

use serde::Serialize;

/// A parsed installer configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleConfig {
    pub module_name: String,
    /// Module-level requirements, checked against the final state
    pub module_dependencies: Option<Condition>,
    /// Files installed unconditionally, before any step
    pub required: FileSet,
    pub steps: Vec<InstallStep>,
    /// Pattern-gated installs applied after the last step
    pub conditional_installs: Vec<ConditionalInstall>,
}

impl ModuleConfig {
    /// Total number of options across all steps and groups
    pub fn option_count(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| &s.groups)
            .map(|g| g.options.len())
            .sum()
    }
}

/// One page of the original installer wizard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallStep {
    pub name: String,
    /// Step is skipped entirely when this evaluates false
    pub visibility: Option<Condition>,
    pub groups: Vec<OptionGroup>,
}

/// A set of options governed by one selection policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionGroup {
    pub name: String,
    pub policy: GroupPolicy,
    pub options: Vec<InstallerOption>,
}

/// Cardinality rule for selections within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupPolicy {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
    Any,
    All,
}

impl GroupPolicy {
    /// The name used by the on-disk format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactlyOne => "SelectExactlyOne",
            Self::AtMostOne => "SelectAtMostOne",
            Self::AtLeastOne => "SelectAtLeastOne",
            Self::Any => "SelectAny",
            Self::All => "SelectAll",
        }
    }

    /// Parse an on-disk policy name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SelectExactlyOne" => Some(Self::ExactlyOne),
            "SelectAtMostOne" => Some(Self::AtMostOne),
            "SelectAtLeastOne" => Some(Self::AtLeastOne),
            "SelectAny" => Some(Self::Any),
            "SelectAll" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single selectable option within a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallerOption {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    /// Category rule; `None` means plain Optional
    pub type_rule: Option<TypeRule>,
    pub files: FileSet,
    /// Flags this option sets when selected
    pub flags: Vec<FlagSet>,
}

/// How an option's effective category is determined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeRule {
    /// Fixed category regardless of state
    Static(Category),
    /// First matching pattern wins; `default` applies when none match
    Dependent {
        patterns: Vec<TypePattern>,
        default: Category,
    },
}

/// One condition/category pair of a dependent type rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypePattern {
    pub condition: Condition,
    pub category: Category,
}

/// Option categories as declared by the installer format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Required,
    Optional,
    Recommended,
    NotUsable,
    CouldBeUsable,
}

impl Category {
    /// The name used by the on-disk format
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "Required",
            Self::Optional => "Optional",
            Self::Recommended => "Recommended",
            Self::NotUsable => "NotUsable",
            Self::CouldBeUsable => "CouldBeUsable",
        }
    }

    /// Parse an on-disk category name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Required" => Some(Self::Required),
            "Optional" => Some(Self::Optional),
            "Recommended" => Some(Self::Recommended),
            "NotUsable" => Some(Self::NotUsable),
            "CouldBeUsable" => Some(Self::CouldBeUsable),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File and folder copy directives declared together
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FileSet {
    pub files: Vec<CopyDirective>,
    pub folders: Vec<CopyDirective>,
}

impl FileSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }
}

/// A single source-to-destination copy declared by the installer.
///
/// Used for both file and folder entries; which one it is follows from the
/// owning [`FileSet`] list. An empty destination means "same path as source".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CopyDirective {
    pub source: String,
    pub destination: String,
    pub priority: i64,
    pub always_install: bool,
    pub install_if_usable: bool,
}

impl CopyDirective {
    /// Directive copying `source` to the same relative path
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: String::new(),
            priority: 0,
            always_install: false,
            install_if_usable: false,
        }
    }
}

/// A flag assignment made by a selected option
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagSet {
    pub name: String,
    pub value: String,
}

/// Install-state a file-presence condition asks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileState {
    Active,
    Inactive,
    Missing,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Missing => "Missing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "Inactive" => Some(Self::Inactive),
            "Missing" => Some(Self::Missing),
            _ => None,
        }
    }
}

/// Boolean operator of a composite condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompositeOp {
    And,
    Or,
}

/// A recursive boolean condition over flags and file presence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    /// True when the named file's install state matches
    FilePresence { path: String, state: FileState },
    /// True when the flag is set to exactly this value
    FlagEquals { name: String, value: String },
    /// Boolean combination; empty composites are vacuously true
    Composite {
        op: CompositeOp,
        children: Vec<Condition>,
    },
}

impl Condition {
    /// An empty composite, which evaluates to true.
    ///
    /// Dependency kinds this engine cannot check (game-version checks and
    /// the like) parse to this so they never veto a pattern.
    pub fn vacuous() -> Self {
        Self::Composite {
            op: CompositeOp::And,
            children: Vec::new(),
        }
    }
}

/// A post-step install gated on a condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalInstall {
    pub condition: Condition,
    pub files: FileSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trip() {
        for policy in [
            GroupPolicy::ExactlyOne,
            GroupPolicy::AtMostOne,
            GroupPolicy::AtLeastOne,
            GroupPolicy::Any,
            GroupPolicy::All,
        ] {
            assert_eq!(GroupPolicy::parse(policy.as_str()), Some(policy));
        }
        assert_eq!(GroupPolicy::parse("SelectSome"), None);
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            Category::Required,
            Category::Optional,
            Category::Recommended,
            Category::NotUsable,
            Category::CouldBeUsable,
        ] {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
        assert_eq!(Category::parse("required"), None);
    }

    #[test]
    fn test_file_state_round_trip() {
        for state in [FileState::Active, FileState::Inactive, FileState::Missing] {
            assert_eq!(FileState::parse(state.as_str()), Some(state));
        }
        assert_eq!(FileState::parse("Present"), None);
    }

    #[test]
    fn test_vacuous_condition_shape() {
        match Condition::vacuous() {
            Condition::Composite { op, children } => {
                assert_eq!(op, CompositeOp::And);
                assert!(children.is_empty());
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_option_count() {
        let config = ModuleConfig {
            module_name: "Test".to_string(),
            module_dependencies: None,
            required: FileSet::default(),
            steps: vec![InstallStep {
                name: "Step".to_string(),
                visibility: None,
                groups: vec![OptionGroup {
                    name: "Group".to_string(),
                    policy: GroupPolicy::Any,
                    options: vec![
                        InstallerOption {
                            name: "A".to_string(),
                            description: String::new(),
                            image: None,
                            type_rule: None,
                            files: FileSet::default(),
                            flags: vec![],
                        },
                        InstallerOption {
                            name: "B".to_string(),
                            description: String::new(),
                            image: None,
                            type_rule: None,
                            files: FileSet::default(),
                            flags: vec![],
                        },
                    ],
                }],
            }],
            conditional_installs: vec![],
        };
        assert_eq!(config.option_count(), 2);
    }
}
