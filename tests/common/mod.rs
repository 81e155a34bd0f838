// tests/common/mod.rs

//! Shared fixtures for integration tests: a small but realistic FOMOD
//! payload tree plus matching installed-file listings.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use modscry::hash;
use tempfile::TempDir;

/// The fixture module config: two steps, flag-gated visibility, a required
/// file, and a conditional install.
pub const MODULE_CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<config xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <moduleName>Adventurer Armory</moduleName>
  <moduleDependencies operator="And">
    <fileDependency file="Skyrim.esm" state="Active"/>
  </moduleDependencies>
  <requiredInstallFiles>
    <file source="base/Armory.esp" destination="Armory.esp"/>
  </requiredInstallFiles>
  <installSteps order="Explicit">
    <installStep name="Armor Style">
      <optionalFileGroups order="Explicit">
        <group name="Style" type="SelectExactlyOne">
          <plugins order="Explicit">
            <plugin name="Steel">
              <description>Steel plate textures</description>
              <files>
                <folder source="steel" destination="textures"/>
              </files>
              <conditionFlags>
                <flag name="style">steel</flag>
              </conditionFlags>
              <typeDescriptor><type name="Recommended"/></typeDescriptor>
            </plugin>
            <plugin name="Ebony">
              <description>Ebony plate textures</description>
              <files>
                <folder source="ebony" destination="textures"/>
              </files>
              <conditionFlags>
                <flag name="style">ebony</flag>
              </conditionFlags>
            </plugin>
          </plugins>
        </group>
      </optionalFileGroups>
    </installStep>
    <installStep name="Extras">
      <visible>
        <flagDependency flag="style" value="steel"/>
      </visible>
      <optionalFileGroups order="Explicit">
        <group name="Extras" type="SelectAny">
          <plugins order="Explicit">
            <plugin name="Shields">
              <files>
                <file source="extras/shield.nif" destination="meshes/shield.nif"/>
              </files>
            </plugin>
          </plugins>
        </group>
      </optionalFileGroups>
    </installStep>
  </installSteps>
  <conditionalFileInstalls>
    <patterns>
      <pattern>
        <dependencies operator="And">
          <flagDependency flag="style" value="steel"/>
        </dependencies>
        <files>
          <file source="cond/steel_patch.esp" destination="steel_patch.esp"/>
        </files>
      </pattern>
    </patterns>
  </conditionalFileInstalls>
</config>"#;

/// Write one file, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Build the extracted-payload tree matching [`MODULE_CONFIG`].
///
/// Returns the TempDir; keep it alive for the duration of the test.
pub fn sample_payload() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_file(root, "fomod/ModuleConfig.xml", MODULE_CONFIG.as_bytes());
    write_file(root, "base/Armory.esp", b"armory plugin");
    write_file(root, "steel/armor/cuirass.dds", b"steel cuirass");
    write_file(root, "steel/armor/helm.dds", b"steel helm");
    write_file(root, "ebony/armor/cuirass.dds", b"ebony cuirass");
    write_file(root, "ebony/armor/helm.dds", b"ebony helm");
    write_file(root, "extras/shield.nif", b"shield mesh");
    write_file(root, "cond/steel_patch.esp", b"steel patch");

    dir
}

/// Listing entry tuples (path, payload bytes) for a "user picked Steel and
/// Shields" install.
pub fn steel_install_files() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("Armory.esp", b"armory plugin"),
        ("textures/armor/cuirass.dds", b"steel cuirass"),
        ("textures/armor/helm.dds", b"steel helm"),
        ("meshes/shield.nif", b"shield mesh"),
        ("steel_patch.esp", b"steel patch"),
        ("Skyrim.esm", b"base game master"),
    ]
}

/// Render entries into the JSON listing format accepted by the importer,
/// hashing the payload bytes with xxh64 like the modlist ecosystem does.
pub fn listing_json(files: &[(&str, &[u8])]) -> String {
    let entries: Vec<String> = files
        .iter()
        .map(|(path, bytes)| {
            format!(
                r#"{{"path": "{}", "hash": "{}", "size": {}}}"#,
                path,
                hash::xxh64(bytes),
                bytes.len()
            )
        })
        .collect();
    format!("[{}]", entries.join(","))
}
