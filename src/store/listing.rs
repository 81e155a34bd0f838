// src/store/listing.rs

//! JSON installed-file listings and their import into the store.
//!
//! A listing is the hand-off format from whatever produced the install
//! record (a mod manager export, a modlist profile dump): one entry per
//! installed file with its install-relative path, encoded content hash, and
//! size. Both a bare array and a `{"name": ..., "files": [...]}` wrapper
//! are accepted.

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::{self, models::{ModFile, ModUnit}};

/// One installed file as recorded in a listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingEntry {
    pub path: String,
    pub hash: String,
    #[serde(default)]
    pub size: i64,
}

/// A parsed installed-file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Mod name carried by the wrapper form, absent for bare arrays.
    pub name: Option<String>,
    pub files: Vec<ListingEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawListing {
    Wrapped {
        name: Option<String>,
        files: Vec<ListingEntry>,
    },
    Bare(Vec<ListingEntry>),
}

/// Parse listing JSON.
pub fn parse_listing(json: &str) -> Result<Listing> {
    let raw: RawListing = serde_json::from_str(json)?;
    Ok(match raw {
        RawListing::Wrapped { name, files } => Listing { name, files },
        RawListing::Bare(files) => Listing { name: None, files },
    })
}

/// Read and parse a listing file.
pub fn read_listing(path: &Path) -> Result<Listing> {
    let json = fs::read_to_string(path)?;
    parse_listing(&json)
}

/// Import a listing as a new mod. The whole import is one transaction; a
/// mod with the same name is rejected before any row is written.
///
/// Entry hashes may be bare (`"menYUTfbRu8="`) or prefixed
/// (`"xxh64:menYUTfbRu8="`); they are stored in the bare canonical encoding
/// that payload indexing emits, so either form hash-matches at detect time.
/// A malformed hash fails the whole import with [`Error::InvalidHash`].
pub fn import(conn: &mut Connection, name: &str, listing: &Listing) -> Result<ModUnit> {
    let unit = store::transaction(conn, |tx| {
        if ModUnit::find_by_name(tx, name)?.is_some() {
            return Err(Error::AlreadyExists(format!("mod '{}'", name)));
        }
        let mut unit = ModUnit::new(name);
        unit.insert(tx)?;
        for entry in &listing.files {
            let hash = Hash::parse(&entry.hash)?;
            ModFile::new(&unit.id, &entry.path, hash.as_str(), entry.size).insert(tx)?;
        }
        Ok(unit)
    })?;

    info!(
        "imported mod '{}' ({} files) as {}",
        name,
        listing.files.len(),
        unit.id
    );
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l.db").to_str().unwrap().to_string();
        store::init(&path).unwrap();
        (dir, store::open(&path).unwrap())
    }

    const BARE: &str = r#"[
        {"path": "Data\\SkyUI.esp", "hash": "xxh64:menYUTfbRu8=", "size": 12},
        {"path": "Data/Interface/skyui.swf", "hash": "xxh64:r4dEjRWeJqo="}
    ]"#;

    #[test]
    fn test_parse_bare_array() {
        let listing = parse_listing(BARE).unwrap();
        assert_eq!(listing.name, None);
        assert_eq!(listing.files.len(), 2);
        // Size defaults to zero when the listing omits it.
        assert_eq!(listing.files[1].size, 0);
    }

    #[test]
    fn test_parse_wrapped_form() {
        let json = r#"{"name": "SkyUI", "files": [{"path": "a.esp", "hash": "h", "size": 1}]}"#;
        let listing = parse_listing(json).unwrap();
        assert_eq!(listing.name.as_deref(), Some("SkyUI"));
        assert_eq!(listing.files.len(), 1);
    }

    #[test]
    fn test_parse_malformed_is_listing_error() {
        assert!(matches!(
            parse_listing("{\"files\": 3}").unwrap_err(),
            Error::Listing(_)
        ));
    }

    #[test]
    fn test_import_round_trip() {
        let (_dir, mut conn) = temp_conn();
        let listing = parse_listing(BARE).unwrap();
        let unit = import(&mut conn, "SkyUI", &listing).unwrap();

        let files = ModFile::find_by_mod(&conn, &unit.id).unwrap();
        assert_eq!(files.len(), 2);
        // Backslash paths land normalized.
        assert!(files.iter().any(|f| f.path == "Data/SkyUI.esp"));
    }

    #[test]
    fn test_import_stores_hashes_bare() {
        let (_dir, mut conn) = temp_conn();
        let listing = parse_listing(BARE).unwrap();
        let unit = import(&mut conn, "SkyUI", &listing).unwrap();

        // The "xxh64:" prefixes are stripped on the way in; rows carry the
        // same bare encoding the payload index produces.
        let files = ModFile::find_by_mod(&conn, &unit.id).unwrap();
        let hashes: Vec<&str> = files.iter().map(|f| f.hash.as_str()).collect();
        assert!(hashes.contains(&"menYUTfbRu8="));
        assert!(hashes.contains(&"r4dEjRWeJqo="));
        assert!(hashes.iter().all(|h| !h.contains(':')));
    }

    #[test]
    fn test_import_rejects_malformed_hash_atomically() {
        let (_dir, mut conn) = temp_conn();
        let listing = parse_listing(
            r#"[
                {"path": "good.esp", "hash": "menYUTfbRu8=", "size": 1},
                {"path": "bad.esp", "hash": "not-a-hash", "size": 1}
            ]"#,
        )
        .unwrap();

        let err = import(&mut conn, "Broken", &listing).unwrap_err();
        assert!(matches!(err, Error::InvalidHash(_)));
        // The transaction rolled back the mod row and the good entry.
        assert!(ModUnit::list_all(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_import_duplicate_name_rejected() {
        let (_dir, mut conn) = temp_conn();
        let listing = parse_listing(BARE).unwrap();
        import(&mut conn, "SkyUI", &listing).unwrap();

        let err = import(&mut conn, "SkyUI", &listing).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(ModUnit::list_all(&conn).unwrap().len(), 1);
    }
}
