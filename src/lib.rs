// src/lib.rs

//! modscry
//!
//! Reconstructs which FOMOD installer options were selected during a past
//! mod installation, given the files the install actually produced (path +
//! content hash + size) and the extracted installer payload.
//!
//! # Architecture
//!
//! - Indexes first: installed files and payload files are hashed into
//!   [`ContentIndex`] values before any scoring happens
//! - Sequential replay: install steps are reconciled in declared order,
//!   threading flags from earlier winners into later visibility and type
//!   checks
//! - Uncertainty is data: weak matches, near-ties, and unmet requirements
//!   are reported in the [`Report`], never raised as errors

pub mod cli;
pub mod commands;
pub mod detect;
mod error;
pub mod fomod;
pub mod hash;
pub mod index;
pub mod paths;
pub mod progress;
pub mod store;

pub use detect::{
    reconcile, OptionMatch, Quality, ReconcileOptions, Report, StepResult,
};
pub use error::{Error, Result};
pub use fomod::ModuleConfig;
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use index::{ContentIndex, FileIdentity, IndexBuilder, MatchKind};
pub use progress::{
    CallbackProgress, CancelToken, LogProgress, ProgressEvent, ProgressTracker, SilentProgress,
};
