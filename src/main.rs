// src/main.rs

use anyhow::Result;
use clap::Parser;

use modscry::cli::{Cli, Commands};
use modscry::commands::{self, DetectArgs};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_path } => commands::cmd_init(db_path.as_deref()),
        Commands::Import {
            listing,
            mod_name,
            db_path,
        } => commands::cmd_import(&listing, mod_name.as_deref(), db_path.as_deref()),
        Commands::Mods { db_path } => commands::cmd_mods(db_path.as_deref()),
        Commands::Remove { mod_ref, db_path } => {
            commands::cmd_remove(&mod_ref, db_path.as_deref())
        }
        Commands::Detect {
            payload_root,
            mod_ref,
            db_path,
            hash_algo,
            threads,
            no_fallback,
            json,
        } => commands::cmd_detect(&DetectArgs {
            payload_root: &payload_root,
            mod_ref: &mod_ref,
            db_path: db_path.as_deref(),
            hash_algo,
            threads,
            no_fallback,
            json,
            quiet: cli.quiet,
        }),
        Commands::ShowConfig { payload_root, json } => {
            commands::cmd_show_config(&payload_root, json)
        }
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
