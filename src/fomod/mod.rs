// src/fomod/mod.rs

//! FOMOD installer configuration: model, parser, and discovery.
//!
//! A FOMOD package ships a `ModuleConfig.xml` describing an interactive
//! install wizard: ordered steps, option groups with selection policies,
//! per-option file lists and condition flags, plus conditional installs that
//! run after the wizard finishes. This module turns that document into the
//! typed option tree the detection engine walks.
//!
//! - [`model`] holds the parsed tree ([`ModuleConfig`] down to
//!   [`CopyDirective`] and [`Condition`]).
//! - [`parser`] reads the XML, tolerating BOMs, UTF-16, and tag-case drift.
//! - [`discover`] locates the config file inside an extracted payload.

pub mod discover;
pub mod model;
pub mod parser;

pub use discover::{find_config, load_config_file, load_module_config};
pub use model::{
    Category, CompositeOp, Condition, ConditionalInstall, CopyDirective, FileSet, FileState,
    FlagSet, GroupPolicy, InstallStep, InstallerOption, ModuleConfig, OptionGroup, TypePattern,
    TypeRule,
};
pub use parser::{parse_module_config, parse_module_config_bytes};
