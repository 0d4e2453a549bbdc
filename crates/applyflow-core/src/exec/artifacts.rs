//! Artifact discovery over the pipeline output tree.
//!
//! Successful runs leave generated documents under
//! `applications/<company>/<role>/`. Discovery maps a fixed set of
//! expected filenames to logical artifact names; a missing file is simply
//! omitted. Nothing here assumes one company/role directory per job:
//! directories are scanned in lexicographic order and the first match
//! wins, so precedence is deterministic.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Expected generated files, `(filename, logical artifact name)`.
pub const EXPECTED_ARTIFACTS: &[(&str, &str)] = &[
    ("CV.md", "cv_md_url"),
    ("CV.pdf", "cv_pdf_url"),
    ("Dossier.md", "dossier_url"),
    ("CoverLetter.md", "cover_letter_url"),
];

const APPLICATIONS_SUBDIR: &str = "applications";

/// Company/role leaf directories under `output_dir/applications`, sorted
/// lexicographically at both levels.
fn role_dirs(output_dir: &Path) -> Vec<PathBuf> {
    let mut companies = read_dirs(&output_dir.join(APPLICATIONS_SUBDIR));
    companies.sort();
    let mut result = Vec::new();
    for company in companies {
        let mut roles = read_dirs(&company);
        roles.sort();
        result.extend(roles);
    }
    result
}

fn read_dirs(path: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(path) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect()
}

/// Scan the output tree for expected artifacts. Returns logical name ->
/// filename for whichever files are present.
pub fn discover(output_dir: &Path) -> BTreeMap<String, String> {
    let dirs = role_dirs(output_dir);
    let mut found = BTreeMap::new();
    for (filename, logical) in EXPECTED_ARTIFACTS {
        if dirs.iter().any(|dir| dir.join(filename).is_file()) {
            found.insert(logical.to_string(), filename.to_string());
        }
    }
    found
}

/// Locate a discovered artifact file by name for serving. Read-only; same
/// deterministic directory order as `discover`.
pub fn locate(output_dir: &Path, filename: &str) -> Option<PathBuf> {
    // Filenames come from URLs; refuse anything that could escape the tree
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return None;
    }
    role_dirs(output_dir)
        .into_iter()
        .map(|dir| dir.join(filename))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn single_file_yields_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("applications/Acme/Architect/CV.md"));

        let found = discover(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found["cv_md_url"], "CV.md");
    }

    #[test]
    fn absent_files_are_omitted_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).is_empty());
    }

    #[test]
    fn all_expected_artifacts_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let role = dir.path().join("applications/Acme/Architect");
        for (filename, _) in EXPECTED_ARTIFACTS {
            touch(&role.join(filename));
        }
        let found = discover(dir.path());
        assert_eq!(found.len(), EXPECTED_ARTIFACTS.len());
        assert_eq!(found["cover_letter_url"], "CoverLetter.md");
        assert_eq!(found["dossier_url"], "Dossier.md");
    }

    #[test]
    fn locate_prefers_lexicographically_first_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("applications/Beta/Engineer/CV.md"));
        touch(&dir.path().join("applications/Acme/Architect/CV.md"));

        let path = locate(dir.path(), "CV.md").unwrap();
        assert!(path.ends_with("applications/Acme/Architect/CV.md"));
    }

    #[test]
    fn locate_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate(dir.path(), "../secret").is_none());
        assert!(locate(dir.path(), "a/b").is_none());
        assert!(locate(dir.path(), "").is_none());
    }

    #[test]
    fn locate_misses_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("applications/Acme/Architect/CV.md"));
        assert!(locate(dir.path(), "Dossier.md").is_none());
    }
}
