// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: database path
fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .help("Database path (default: platform data dir)")
}

fn build_cli() -> Command {
    Command::new("modscry")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Modscry Contributors")
        .about("Reconstructs FOMOD installer choices from installed files and the extracted payload")
        .subcommand(
            Command::new("init")
                .about("Initialize the modscry store")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("import")
                .about("Import an installed-file listing as a mod")
                .arg(Arg::new("listing").required(true).help("Path to the JSON listing"))
                .arg(
                    Arg::new("mod_name")
                        .short('n')
                        .long("mod-name")
                        .help("Mod name (defaults to the listing's own name, then the file stem)"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("mods")
                .about("List imported mods")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove an imported mod and its stored files")
                .arg(
                    Arg::new("mod_ref")
                        .required(true)
                        .value_name("ID_OR_NAME")
                        .help("Mod to remove, by id or name"),
                )
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("detect")
                .about("Reconstruct the installer choices for a stored mod")
                .arg(
                    Arg::new("payload_root")
                        .required(true)
                        .help("Extracted installer payload directory"),
                )
                .arg(
                    Arg::new("mod")
                        .short('m')
                        .long("mod")
                        .required(true)
                        .value_name("ID_OR_NAME")
                        .help("Mod to reconcile against, by id or name"),
                )
                .arg(db_path_arg())
                .arg(
                    Arg::new("hash_algo")
                        .long("hash-algo")
                        .default_value("xxh64")
                        .help("Content hash algorithm the stored listing uses"),
                )
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .help("Hashing worker threads (default: available parallelism)"),
                )
                .arg(
                    Arg::new("no_fallback")
                        .long("no-fallback")
                        .action(clap::ArgAction::SetTrue)
                        .help("Skip the direct-hash-match fallback pass"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Emit the full report as JSON instead of text"),
                ),
        )
        .subcommand(
            Command::new("show-config")
                .about("Discover and dump the installer option tree of a payload")
                .arg(
                    Arg::new("payload_root")
                        .required(true)
                        .help("Extracted installer payload directory (or a ModuleConfig.xml path)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Emit the parsed tree as JSON"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(Arg::new("shell").required(true).help("Target shell")),
        )
}

fn main() -> std::io::Result<()> {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR not set"));
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    let cli = build_cli();

    // Top-level man page
    let man = Man::new(cli.clone());
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    fs::write(man_dir.join("modscry.1"), buffer)?;

    // One page per subcommand
    for sub in cli.get_subcommands() {
        let name = format!("modscry-{}", sub.get_name());
        let man = Man::new(sub.clone().name(name.clone()));
        let mut buffer = Vec::new();
        man.render(&mut buffer)?;
        fs::write(man_dir.join(format!("{}.1", name)), buffer)?;
    }

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
