//! Fixture helpers for tests, grounded on the teacher's `test_utils`
//! pattern (`tempfile::TempDir` + `fs::write` synthetic mini-repos).

use std::fs;

use tempfile::TempDir;

/// Writes a temporary repository with the given `(relative_path, content)`
/// pairs, creating parent directories as needed. Used by extractor and
/// scenario tests that need real files on disk for `FileDiscovery` and
/// the tree-sitter parser pool to walk.
pub fn create_repo_with_structure(structure: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().expect("create tempdir");
    let root = temp_dir.path();

    for (path, content) in structure {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&full_path, content).expect("write fixture file");
    }

    temp_dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_nested_fixture_files() {
        let repo = create_repo_with_structure(&[
            ("src/a.ts", "export function a() {}"),
            ("src/utils/b.ts", "export function b() {}"),
        ]);
        assert!(repo.path().join("src/a.ts").exists());
        assert!(repo.path().join("src/utils/b.ts").exists());
    }
}
