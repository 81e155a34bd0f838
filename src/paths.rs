// src/paths.rs

//! Install-relative path normalization.
//!
//! Installer manifests, archive listings, and payload walks all spell paths
//! differently: backslashes from Windows-authored configs, stray leading
//! `./`, doubled separators. Every path that enters an index or a lookup
//! goes through [`normalize`] first so the rest of the crate compares plain
//! `/`-separated relative strings.

/// Canonicalize an install-relative path string.
///
/// Replaces `\` with `/`, collapses repeated separators, and strips leading
/// `./` segments plus leading and trailing `/`. Case is preserved.
/// Normalizing an already-normalized path returns it unchanged.
///
/// # Example
/// ```
/// use modscry::paths::normalize;
///
/// assert_eq!(normalize(r"textures\\armor\steel.dds"), "textures/armor/steel.dds");
/// assert_eq!(normalize("./meshes//weapons/"), "meshes/weapons");
/// ```
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");

    let mut collapsed = String::with_capacity(replaced.len());
    let mut prev_slash = false;
    for c in replaced.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }

    let mut s = collapsed.as_str();
    loop {
        if let Some(rest) = s.strip_prefix("./") {
            s = rest;
        } else if let Some(rest) = s.strip_prefix('/') {
            s = rest;
        } else {
            break;
        }
    }

    s.trim_end_matches('/').to_string()
}

/// Normalize and lowercase a path for case-insensitive comparison.
///
/// Installed game trees routinely disagree with the manifest on case
/// (`Textures/` vs `textures/`), so equality checks between the two always
/// go through the folded form. Folding is ASCII-only, which keeps byte
/// offsets identical between a path and its folded form; prefix arithmetic
/// on folded paths relies on that.
pub fn fold_case(path: &str) -> String {
    normalize(path).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslashes_become_slashes() {
        assert_eq!(normalize(r"meshes\armor\steel.nif"), "meshes/armor/steel.nif");
        assert_eq!(normalize(r"a\b/c\d"), "a/b/c/d");
    }

    #[test]
    fn test_duplicate_separators_collapse() {
        assert_eq!(normalize("a//b///c"), "a/b/c");
        assert_eq!(normalize(r"a\\b"), "a/b");
    }

    #[test]
    fn test_leading_and_trailing_trimmed() {
        assert_eq!(normalize("/textures/skin.dds"), "textures/skin.dds");
        assert_eq!(normalize("./textures/skin.dds"), "textures/skin.dds");
        assert_eq!(normalize("././a"), "a");
        assert_eq!(normalize("textures/"), "textures");
        assert_eq!(normalize(r".\data"), "data");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            r"Textures\\Armor/steel.dds",
            "./a//b/",
            "plain/path.esp",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_case_preserved_by_normalize() {
        assert_eq!(normalize("Textures/Armor.DDS"), "Textures/Armor.DDS");
    }

    #[test]
    fn test_fold_case() {
        assert_eq!(fold_case(r"Textures\Armor.DDS"), "textures/armor.dds");
        assert_eq!(fold_case("MESHES//Sword.NIF"), "meshes/sword.nif");
    }

    #[test]
    fn test_empty_and_degenerate() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize("./"), "");
        assert_eq!(normalize("//"), "");
    }
}
