// src/store/models/mod_unit.rs

//! ModUnit model - one imported install unit

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::Result;

/// A logical mod whose installed files have been imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModUnit {
    /// Stable identifier, assigned at import
    pub id: String,
    pub name: String,
    /// RFC 3339 import timestamp
    pub imported_at: String,
}

impl ModUnit {
    /// Create a new ModUnit with a fresh id and the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            imported_at: Utc::now().to_rfc3339(),
        }
    }

    /// Insert this mod into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO mods (id, name, imported_at) VALUES (?1, ?2, ?3)",
            params![&self.id, &self.name, &self.imported_at],
        )?;
        Ok(())
    }

    /// Find a mod by its id
    pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, imported_at FROM mods WHERE id = ?1")?;
        let unit = stmt.query_row([id], Self::from_row).optional()?;
        Ok(unit)
    }

    /// Find a mod by its exact name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, imported_at FROM mods WHERE name = ?1")?;
        let unit = stmt.query_row([name], Self::from_row).optional()?;
        Ok(unit)
    }

    /// Resolve a user-supplied reference: id first, then name
    pub fn resolve(conn: &Connection, reference: &str) -> Result<Option<Self>> {
        if let Some(unit) = Self::find_by_id(conn, reference)? {
            return Ok(Some(unit));
        }
        Self::find_by_name(conn, reference)
    }

    /// List all mods, newest import first
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn
            .prepare("SELECT id, name, imported_at FROM mods ORDER BY imported_at DESC, name")?;
        let units = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(units)
    }

    /// Delete a mod and (via cascade) its files
    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        conn.execute("DELETE FROM mods WHERE id = ?1", [id])?;
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            imported_at: row.get(2)?,
        })
    }
}
