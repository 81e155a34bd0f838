// src/cli.rs
//! CLI definitions for modscry
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::hash::HashAlgorithm;

#[derive(Parser)]
#[command(name = "modscry")]
#[command(author = "Modscry Contributors")]
#[command(version)]
#[command(
    about = "Reconstructs FOMOD installer choices from installed files and the extracted payload",
    long_about = None
)]
pub struct Cli {
    /// Suppress progress bars (logging is controlled via RUST_LOG)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the modscry store
    Init {
        /// Path to the database file (default: platform data dir)
        #[arg(short, long)]
        db_path: Option<String>,
    },

    /// Import an installed-file listing as a mod
    Import {
        /// Path to the JSON listing
        listing: PathBuf,

        /// Mod name (defaults to the listing's own name, then the file stem)
        #[arg(short = 'n', long)]
        mod_name: Option<String>,

        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,
    },

    /// List imported mods
    Mods {
        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,
    },

    /// Remove an imported mod and its stored files
    Remove {
        /// Mod to remove, by id or name
        #[arg(value_name = "ID_OR_NAME")]
        mod_ref: String,

        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,
    },

    /// Reconstruct the installer choices for a stored mod
    Detect {
        /// Extracted installer payload directory
        payload_root: PathBuf,

        /// Mod to reconcile against, by id or name
        #[arg(short, long = "mod", value_name = "ID_OR_NAME")]
        mod_ref: String,

        /// Path to the database file
        #[arg(short, long)]
        db_path: Option<String>,

        /// Content hash algorithm the stored listing uses
        #[arg(long, default_value = "xxh64")]
        hash_algo: HashAlgorithm,

        /// Hashing worker threads (default: available parallelism)
        #[arg(long)]
        threads: Option<usize>,

        /// Skip the direct-hash-match fallback pass
        #[arg(long)]
        no_fallback: bool,

        /// Emit the full report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Discover and dump the installer option tree of a payload
    ShowConfig {
        /// Extracted installer payload directory (or a ModuleConfig.xml path)
        payload_root: PathBuf,

        /// Emit the parsed tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}
