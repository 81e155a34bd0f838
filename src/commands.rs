// src/commands.rs
//! Command handlers for the modscry CLI

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cli::Cli;
use crate::detect::{self, ReconcileOptions, Report};
use crate::fomod::{self, ModuleConfig};
use crate::hash::HashAlgorithm;
use crate::index::{ContentIndex, IndexBuilder};
use crate::progress::ProgressTracker;
use crate::store::{
    self, listing,
    models::{ModFile, ModUnit},
};

/// Default store location under the platform data directory.
pub fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("modscry")
        .join("modscry.db")
        .to_string_lossy()
        .into_owned()
}

fn resolve_db_path(db_path: Option<&str>) -> String {
    db_path.map(str::to_string).unwrap_or_else(default_db_path)
}

/// Indicatif-backed implementation of the library's progress trait.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.green/dim}] {pos}/{len}")
                .expect("Invalid progress bar template")
                .progress_chars("##-"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressTracker for BarProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn set_position(&self, position: u64) {
        self.bar.set_position(position);
    }

    fn set_length(&self, length: u64) {
        self.bar.set_length(length);
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    fn length(&self) -> u64 {
        self.bar.length().unwrap_or(0)
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }

    fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

/// Initialize the store
pub fn cmd_init(db_path: Option<&str>) -> Result<()> {
    let db_path = resolve_db_path(db_path);
    store::init(&db_path).with_context(|| format!("initializing store at {}", db_path))?;
    println!("Store initialized at: {}", db_path);
    Ok(())
}

/// Import an installed-file listing as a mod
pub fn cmd_import(
    listing_path: &Path,
    mod_name: Option<&str>,
    db_path: Option<&str>,
) -> Result<()> {
    let db_path = resolve_db_path(db_path);
    store::init(&db_path)?;
    let mut conn = store::open(&db_path)?;

    let parsed = listing::read_listing(listing_path)
        .with_context(|| format!("reading listing {}", listing_path.display()))?;

    let name = match (mod_name, &parsed.name) {
        (Some(name), _) => name.to_string(),
        (None, Some(name)) => name.clone(),
        (None, None) => listing_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string()),
    };

    let unit = listing::import(&mut conn, &name, &parsed)?;
    println!(
        "Imported '{}' ({} files) as {}",
        unit.name,
        parsed.files.len(),
        unit.id
    );
    Ok(())
}

/// List imported mods
pub fn cmd_mods(db_path: Option<&str>) -> Result<()> {
    let db_path = resolve_db_path(db_path);
    let conn = store::open(&db_path)?;
    let units = ModUnit::list_all(&conn)?;

    if units.is_empty() {
        println!("No mods imported.");
    } else {
        println!("Imported mods:");
        for unit in &units {
            let files = ModFile::count_by_mod(&conn, &unit.id)?;
            println!(
                "  {}  {} ({} files, imported {})",
                unit.id, unit.name, files, unit.imported_at
            );
        }
        println!("\nTotal: {} mod(s)", units.len());
    }
    Ok(())
}

/// Remove an imported mod; the cascade drops its file rows
pub fn cmd_remove(mod_ref: &str, db_path: Option<&str>) -> Result<()> {
    let db_path = resolve_db_path(db_path);
    let conn = store::open(&db_path)?;
    let Some(unit) = ModUnit::resolve(&conn, mod_ref)? else {
        bail!("mod '{}' not found (see `modscry mods`)", mod_ref);
    };

    let files = ModFile::count_by_mod(&conn, &unit.id)?;
    ModUnit::delete(&conn, &unit.id)?;
    info!(mod_id = %unit.id, name = %unit.name, "removed mod");
    println!("Removed '{}' ({} files)", unit.name, files);
    Ok(())
}

/// Options collected from the detect subcommand's flags
pub struct DetectArgs<'a> {
    pub payload_root: &'a Path,
    pub mod_ref: &'a str,
    pub db_path: Option<&'a str>,
    pub hash_algo: HashAlgorithm,
    pub threads: Option<usize>,
    pub no_fallback: bool,
    pub json: bool,
    pub quiet: bool,
}

/// Reconstruct the installer choices for a stored mod
pub fn cmd_detect(args: &DetectArgs) -> Result<()> {
    let db_path = resolve_db_path(args.db_path);
    let conn = store::open(&db_path)?;
    let Some(unit) = ModUnit::resolve(&conn, args.mod_ref)? else {
        bail!("mod '{}' not found (see `modscry mods`)", args.mod_ref);
    };
    info!(mod_id = %unit.id, name = %unit.name, "reconciling against stored mod");

    let installed = store::installed_index(&conn, &unit)?;
    if installed.is_empty() {
        bail!("mod '{}' has no stored files", unit.name);
    }

    let (config_path, config) = fomod::load_module_config(args.payload_root)
        .with_context(|| format!("loading installer config under {}", args.payload_root.display()))?;
    info!(config = %config_path.display(), "parsed installer config");

    let payload = build_payload_index(args)?;

    let options = ReconcileOptions {
        direct_match_fallback: !args.no_fallback,
        ..Default::default()
    };
    let report = detect::reconcile(&config, &installed, &payload, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }
    Ok(())
}

fn build_payload_index(args: &DetectArgs) -> Result<ContentIndex> {
    let mut builder = IndexBuilder::new(args.payload_root).algorithm(args.hash_algo);
    // JSON output keeps stdout clean for pipes.
    if !args.quiet && !args.json {
        builder = builder.with_progress(Arc::new(BarProgress::new()));
    }

    let index = match args.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("building hash worker pool")?
            .install(|| builder.build()),
        None => builder.build(),
    }?;
    Ok(index)
}

fn render_report(report: &Report) {
    println!("{}", report.summary_line());
    println!();

    println!("Steps:");
    for step in &report.steps {
        if !step.visible {
            println!("  [{}] {} - hidden", step.step_index, step.step_name);
            continue;
        }
        if step.selected.is_empty() {
            println!("  [{}] {} - no option detected", step.step_index, step.step_name);
        } else {
            println!(
                "  [{}] {} (confidence {:.2})",
                step.step_index, step.step_name, step.confidence
            );
            for m in &step.selected {
                print!(
                    "      selected: {} [{}] {:.2} ({}/{} files, {} perfect)",
                    m.option_name,
                    m.category,
                    m.confidence,
                    m.matched_files,
                    m.total_files,
                    m.perfect_matches
                );
                if m.notes.is_empty() {
                    println!();
                } else {
                    println!(" - {}", m.notes.join("; "));
                }
            }
        }
        for m in &step.alternates {
            println!(
                "      alternate: {} {:.2} ({}/{} files)",
                m.option_name, m.confidence, m.matched_files, m.total_files
            );
        }
    }

    if !report.recommended_choices.is_empty() {
        println!("\nRecommended choices taken:");
        for choice in &report.recommended_choices {
            println!("  {}", choice);
        }
    }
    if !report.conflicts.is_empty() {
        println!("\nConflicts:");
        for conflict in &report.conflicts {
            println!("  {}", conflict);
        }
    }
    if !report.missing_dependencies.is_empty() {
        println!("\nMissing dependencies:");
        for dep in &report.missing_dependencies {
            println!("  {}", dep);
        }
    }
    if report.diagnostics.payload_skipped > 0 || report.diagnostics.installed_skipped > 0 {
        println!(
            "\nNote: {} payload / {} installed file(s) could not be hashed and were skipped",
            report.diagnostics.payload_skipped, report.diagnostics.installed_skipped
        );
    }
}

/// Discover, parse, and dump a payload's installer option tree
pub fn cmd_show_config(payload_root: &Path, json: bool) -> Result<()> {
    let config = if payload_root.is_file() {
        fomod::load_config_file(payload_root)?
    } else {
        let (path, config) = fomod::load_module_config(payload_root)?;
        if !json {
            println!("Config: {}\n", path.display());
        }
        config
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        render_config(&config);
    }
    Ok(())
}

fn render_config(config: &ModuleConfig) {
    println!("Module: {}", config.module_name);
    if config.module_dependencies.is_some() {
        println!("  (has module-level dependencies)");
    }
    if !config.required.is_empty() {
        println!(
            "  required files: {} file(s), {} folder(s)",
            config.required.files.len(),
            config.required.folders.len()
        );
    }

    for (i, step) in config.steps.iter().enumerate() {
        let gate = if step.visibility.is_some() {
            " (conditional)"
        } else {
            ""
        };
        println!("  Step {}: {}{}", i, step.name, gate);
        for group in &step.groups {
            println!("    Group: {} [{}]", group.name, group.policy);
            for option in &group.options {
                println!(
                    "      - {} ({} file(s), {} folder(s), {} flag(s))",
                    option.name,
                    option.files.files.len(),
                    option.files.folders.len(),
                    option.flags.len()
                );
            }
        }
    }
    if !config.conditional_installs.is_empty() {
        println!(
            "  conditional installs: {}",
            config.conditional_installs.len()
        );
    }
}

/// Generate shell completions on stdout
pub fn cmd_completions(shell: Shell) -> Result<()> {
    clap_complete::generate(shell, &mut Cli::command(), "modscry", &mut io::stdout());
    Ok(())
}
