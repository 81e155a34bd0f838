// src/fomod/discover.rs

//! Locates `ModuleConfig.xml` inside an extracted payload tree.
//!
//! Archives are inconsistent about layout: the config usually lives in a
//! top-level `fomod/` directory, but some payloads nest it one level down or
//! vary the file name casing. The search walks the whole tree and picks the
//! shallowest match, breaking ties by path, so repeated runs agree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fomod::model::ModuleConfig;
use crate::fomod::parser;

const CONFIG_FILE_NAME: &str = "moduleconfig.xml";

/// Find the module config file beneath `payload_root`.
pub fn find_config(payload_root: &Path) -> Result<PathBuf> {
    let mut best: Option<(usize, PathBuf)> = None;

    for entry in WalkDir::new(payload_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(CONFIG_FILE_NAME));
        if !matches {
            continue;
        }
        let candidate = (entry.depth(), entry.path().to_path_buf());
        match &best {
            Some(current) if *current <= candidate => {}
            _ => best = Some(candidate),
        }
    }

    match best {
        Some((depth, path)) => {
            debug!("found module config at {} (depth {})", path.display(), depth);
            Ok(path)
        }
        None => Err(Error::NotFound(format!(
            "no ModuleConfig.xml under {}",
            payload_root.display()
        ))),
    }
}

/// Parse the config at an explicit file path.
pub fn load_config_file(path: &Path) -> Result<ModuleConfig> {
    let bytes = fs::read(path)?;
    parser::parse_module_config_bytes(&bytes)
}

/// Find and parse the module config beneath `payload_root`, returning the
/// path it was loaded from alongside the parsed tree.
pub fn load_module_config(payload_root: &Path) -> Result<(PathBuf, ModuleConfig)> {
    let path = find_config(payload_root)?;
    let config = load_config_file(&path)?;
    Ok((path, config))
}
