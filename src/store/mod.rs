// src/store/mod.rs

//! SQLite store for imported install units.
//!
//! The detection engine itself never touches the database; this module is
//! the collaborator that remembers which files each mod installed so a
//! `detect` run can be replayed later without the original listing on hand.
//! Connections are plain [`rusqlite::Connection`] values passed explicitly,
//! never global state.

pub mod listing;
pub mod models;

use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use crate::error::Result;
use crate::index::{ContentIndex, FileIdentity};
use models::{ModFile, ModUnit};

/// Create the database and its schema, including parent directories.
pub fn init(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = open(db_path)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS mods (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            imported_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS mod_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mod_id TEXT NOT NULL REFERENCES mods(id) ON DELETE CASCADE,
            path TEXT NOT NULL,
            hash TEXT NOT NULL,
            size INTEGER NOT NULL,
            UNIQUE (mod_id, path)
        );
        CREATE INDEX IF NOT EXISTS idx_mod_files_mod_id ON mod_files (mod_id);",
    )?;

    info!("store initialized at {}", db_path);
    Ok(())
}

/// Open an existing (or about-to-be-initialized) store.
pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    debug!("opened store at {}", db_path);
    Ok(conn)
}

/// Run `f` inside a transaction, committing on `Ok` and rolling back on
/// `Err`.
pub fn transaction<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Transaction) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Build the installed-file index for a stored mod.
pub fn installed_index(conn: &Connection, unit: &ModUnit) -> Result<ContentIndex> {
    let files = ModFile::find_by_mod(conn, &unit.id)?;
    Ok(ContentIndex::from_entries(files.into_iter().map(|f| {
        FileIdentity::new(f.path, f.hash, f.size.max(0) as u64)
    })))
}
