// src/store/models/mod_file.rs

//! ModFile model - one installed file of a mod

use rusqlite::{Connection, Row, params};

use crate::error::Result;
use crate::paths;

/// One file a mod installed: install-relative path, content hash, size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModFile {
    pub id: Option<i64>,
    pub mod_id: String,
    /// Normalized install-relative path
    pub path: String,
    /// Encoded content hash as found in the source listing
    pub hash: String,
    pub size: i64,
}

impl ModFile {
    /// Create a new ModFile; the path is normalized on construction
    pub fn new(mod_id: &str, path: &str, hash: &str, size: i64) -> Self {
        Self {
            id: None,
            mod_id: mod_id.to_string(),
            path: paths::normalize(path),
            hash: hash.to_string(),
            size,
        }
    }

    /// Insert this file into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO mod_files (mod_id, path, hash, size) VALUES (?1, ?2, ?3, ?4)",
            params![&self.mod_id, &self.path, &self.hash, &self.size],
        )?;
        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// All files of a mod, ordered by path for deterministic output
    pub fn find_by_mod(conn: &Connection, mod_id: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, mod_id, path, hash, size FROM mod_files
             WHERE mod_id = ?1 ORDER BY path",
        )?;
        let files = stmt
            .query_map([mod_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Number of files stored for a mod
    pub fn count_by_mod(conn: &Connection, mod_id: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM mod_files WHERE mod_id = ?1",
            [mod_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            mod_id: row.get(1)?,
            path: row.get(2)?,
            hash: row.get(3)?,
            size: row.get(4)?,
        })
    }
}
