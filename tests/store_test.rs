// tests/store_test.rs

//! Store round trip: import a listing, read it back, detect against it.

mod common;

use modscry::detect::{self, Quality, ReconcileOptions};
use modscry::fomod;
use modscry::index::IndexBuilder;
use modscry::store::models::{ModFile, ModUnit};
use modscry::store::{self, listing};
use modscry::Error;

fn temp_store() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db").to_str().unwrap().to_string();
    store::init(&path).unwrap();
    (dir, path)
}

#[test]
fn import_then_detect_from_the_store() {
    let (_db_dir, db_path) = temp_store();
    let mut conn = store::open(&db_path).unwrap();

    // Import the steel install as a listing file, like the CLI does.
    let listing_dir = tempfile::tempdir().unwrap();
    let listing_path = listing_dir.path().join("armory.json");
    std::fs::write(
        &listing_path,
        common::listing_json(&common::steel_install_files()),
    )
    .unwrap();

    let listing = listing::read_listing(&listing_path).unwrap();
    assert_eq!(listing.files.len(), common::steel_install_files().len());
    let unit = listing::import(&mut conn, "Adventurer Armory", &listing).unwrap();

    // The stored rows come back as an installed index...
    let installed = store::installed_index(&conn, &unit).unwrap();
    assert_eq!(installed.len(), listing.files.len());

    // ...and that index drives a full detection run.
    let payload_dir = common::sample_payload();
    let payload = IndexBuilder::new(payload_dir.path()).build().unwrap();
    let (_, config) = fomod::load_module_config(payload_dir.path()).unwrap();

    let report =
        detect::reconcile(&config, &installed, &payload, &ReconcileOptions::default()).unwrap();
    assert_eq!(report.quality, Quality::High);
    assert!(report.overall_success);
    assert_eq!(report.steps[0].selected[0].option_name, "Steel");
}

#[test]
fn prefixed_hashes_import_canonically_and_still_match() {
    let (_db_dir, db_path) = temp_store();
    let mut conn = store::open(&db_path).unwrap();

    // Same steel install, but the exporter wrote algorithm-prefixed hashes.
    let entries: Vec<String> = common::steel_install_files()
        .iter()
        .map(|(path, bytes)| {
            format!(
                r#"{{"path": "{}", "hash": "xxh64:{}", "size": {}}}"#,
                path,
                modscry::hash::xxh64(bytes),
                bytes.len()
            )
        })
        .collect();
    let listing = listing::parse_listing(&format!("[{}]", entries.join(","))).unwrap();
    let unit = listing::import(&mut conn, "Prefixed Armory", &listing).unwrap();

    // Stored rows carry the bare encoding the payload index emits.
    let installed = store::installed_index(&conn, &unit).unwrap();
    let armory = installed.lookup_exact("Armory.esp").unwrap();
    assert_eq!(armory.hash, modscry::hash::xxh64(b"armory plugin"));

    // So detection still hash-matches instead of degrading to the fallback.
    let payload_dir = common::sample_payload();
    let payload = IndexBuilder::new(payload_dir.path()).build().unwrap();
    let (_, config) = fomod::load_module_config(payload_dir.path()).unwrap();

    let report =
        detect::reconcile(&config, &installed, &payload, &ReconcileOptions::default()).unwrap();
    assert_eq!(report.quality, Quality::High);
    assert_eq!(report.steps[0].selected[0].option_name, "Steel");
    assert_eq!(report.steps[0].selected[0].confidence, 1.0);
}

#[test]
fn wrapped_listing_carries_its_name() {
    let (_db_dir, db_path) = temp_store();
    let mut conn = store::open(&db_path).unwrap();

    let json = format!(
        r#"{{"name": "From Wrapper", "files": {}}}"#,
        common::listing_json(&[("a.esp", b"bytes")])
    );
    let listing = listing::parse_listing(&json).unwrap();
    assert_eq!(listing.name.as_deref(), Some("From Wrapper"));

    let unit = listing::import(&mut conn, listing.name.as_deref().unwrap(), &listing).unwrap();
    assert_eq!(ModFile::count_by_mod(&conn, &unit.id).unwrap(), 1);
}

#[test]
fn reimporting_the_same_name_changes_nothing() {
    let (_db_dir, db_path) = temp_store();
    let mut conn = store::open(&db_path).unwrap();

    let listing = listing::parse_listing(&common::listing_json(&[
        ("a.esp", b"one"),
        ("b.esp", b"two"),
    ]))
    .unwrap();
    let unit = listing::import(&mut conn, "Once", &listing).unwrap();

    let err = listing::import(&mut conn, "Once", &listing).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    assert_eq!(ModUnit::list_all(&conn).unwrap().len(), 1);
    assert_eq!(ModFile::count_by_mod(&conn, &unit.id).unwrap(), 2);
}

#[test]
fn mods_resolve_by_id_and_name() {
    let (_db_dir, db_path) = temp_store();
    let mut conn = store::open(&db_path).unwrap();

    let listing = listing::parse_listing(&common::listing_json(&[("a.esp", b"x")])).unwrap();
    let unit = listing::import(&mut conn, "Resolvable", &listing).unwrap();

    assert_eq!(
        ModUnit::resolve(&conn, &unit.id).unwrap().unwrap().name,
        "Resolvable"
    );
    assert_eq!(
        ModUnit::resolve(&conn, "Resolvable").unwrap().unwrap().id,
        unit.id
    );
    assert!(ModUnit::resolve(&conn, "nope").unwrap().is_none());
}

#[test]
fn deleting_a_mod_drops_its_files() {
    let (_db_dir, db_path) = temp_store();
    let mut conn = store::open(&db_path).unwrap();

    let listing = listing::parse_listing(&common::listing_json(&[("a.esp", b"x")])).unwrap();
    let unit = listing::import(&mut conn, "Doomed", &listing).unwrap();

    ModUnit::delete(&conn, &unit.id).unwrap();
    assert!(ModUnit::find_by_id(&conn, &unit.id).unwrap().is_none());
    assert_eq!(ModFile::count_by_mod(&conn, &unit.id).unwrap(), 0);
}
