//! [`Manifest`]: `path → content_hash` for every file in the last successful
//! run. Diffing the previous manifest against a fresh scan classifies every
//! file as unchanged/added/modified/deleted, which is what makes a rescan
//! proportional to the number of changed files (`spec.md` §4.2).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One file's entry in the manifest: its content hash, detected language,
/// and last-seen mtime (used only as a cheap pre-filter before hashing; the
/// hash, not the mtime, is the source of truth for change detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub content_hash: u64,
    pub mtime_secs: i64,
}

/// `path → (content_hash, language, mtime)` as of the last successful run.
/// `IndexMap` keeps insertion order so a freshly-built manifest serializes
/// in workspace-lexicographic order when paths are inserted in that order,
/// satisfying the determinism property in `spec.md` §8.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub files: IndexMap<String, ManifestEntry>,
}

/// How a file compares to the prior manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `path` given its freshly-computed hash. Does not mutate
    /// `self` — callers apply the classification and then call
    /// [`Manifest::record`] once the file has actually been (re)parsed.
    pub fn classify(&self, path: &str, fresh_hash: u64) -> FileStatus {
        match self.files.get(path) {
            None => FileStatus::Added,
            Some(entry) if entry.content_hash == fresh_hash => FileStatus::Unchanged,
            Some(_) => FileStatus::Modified,
        }
    }

    /// Paths present in the prior manifest but absent from `seen_paths`.
    pub fn deleted_paths<'a>(&'a self, seen_paths: &'a indexmap::IndexSet<String>) -> Vec<&'a str> {
        self.files
            .keys()
            .filter(|p| !seen_paths.contains(p.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn record(&mut self, path: impl Into<String>, content_hash: u64, mtime_secs: i64) {
        self.files.insert(path.into(), ManifestEntry { content_hash, mtime_secs });
    }

    pub fn remove(&mut self, path: &str) {
        self.files.shift_remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_path_is_added() {
        let manifest = Manifest::new();
        assert_eq!(manifest.classify("a.py", 42), FileStatus::Added);
    }

    #[test]
    fn same_hash_is_unchanged() {
        let mut manifest = Manifest::new();
        manifest.record("a.py", 42, 0);
        assert_eq!(manifest.classify("a.py", 42), FileStatus::Unchanged);
    }

    #[test]
    fn different_hash_is_modified() {
        let mut manifest = Manifest::new();
        manifest.record("a.py", 42, 0);
        assert_eq!(manifest.classify("a.py", 43), FileStatus::Modified);
    }

    #[test]
    fn missing_from_seen_set_is_deleted() {
        let mut manifest = Manifest::new();
        manifest.record("a.py", 1, 0);
        manifest.record("b.py", 2, 0);
        let seen: indexmap::IndexSet<String> = ["a.py".to_string()].into_iter().collect();
        assert_eq!(manifest.deleted_paths(&seen), vec!["b.py"]);
    }
}
