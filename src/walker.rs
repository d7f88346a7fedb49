//! File Walker (`spec.md` §4.1): enumerates source files below a root,
//! filtering by language and ignore rules, in deterministic lexicographic
//! order.

use crate::config::Settings;
use crate::parsing::Language;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One file the walker decided to hand to a parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub path: PathBuf,
    pub language: Language,
}

pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Walks `root`, returning files in lexicographic path order. `cancel`
    /// is checked before emitting each path so a scan can be cancelled
    /// cooperatively (`spec.md` §5); an already-cancelled walk returns no
    /// files.
    pub fn walk(&self, root: &Path, cancel: &AtomicBool) -> Vec<WalkedFile> {
        let root = match root.canonicalize() {
            Ok(r) => r,
            Err(_) => return Vec::new(),
        };

        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false)
            .add_custom_ignore_filename(".flyto-index-ignore");

        let mut overrides = OverrideBuilder::new(&root);
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(err) = overrides.add(&format!("!{pattern}")) {
                tracing::warn!(stage = "walker", %pattern, %err, "invalid ignore pattern");
            }
        }
        if let Ok(built) = overrides.build() {
            builder.overrides(built);
        }

        let max_bytes = self.settings.indexing.max_file_bytes;
        let mut entries: Vec<WalkedFile> = Vec::new();

        for result in builder.build() {
            if cancel.load(Ordering::Relaxed) {
                return Vec::new();
            }
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(stage = "walker", %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if is_in_dot_dir(&root, path) {
                continue;
            }
            if !is_within_root(&root, path) {
                tracing::warn!(stage = "walker", path = %path.display(), "refusing symlink escaping root");
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            if metadata.len() > max_bytes {
                continue;
            }
            if let Some(language) = classify_language(path) {
                if self.is_enabled(language) {
                    entries.push(WalkedFile { path: path.to_path_buf(), language });
                }
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    fn is_enabled(&self, language: Language) -> bool {
        self.settings
            .languages
            .get(language.config_key())
            .map(|cfg| cfg.enabled)
            .unwrap_or(false)
    }
}

/// Any path component between `root` and `path` starting with `.`, other
/// than `.flyto-index` itself, excludes the path (`spec.md` §4.1).
fn is_in_dot_dir(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else { return false };
    relative.parent().is_some_and(|parent| {
        parent.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            s.starts_with('.') && s != ".flyto-index"
        })
    })
}

/// Symlinks resolving outside `root` are refused.
fn is_within_root(root: &Path, path: &Path) -> bool {
    match path.canonicalize() {
        Ok(resolved) => resolved.starts_with(root),
        Err(_) => false,
    }
}

fn classify_language(path: &Path) -> Option<Language> {
    if let Some(lang) = Language::from_extension(path) {
        return Some(lang);
    }
    Language::from_shebang(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> Arc<Settings> {
        Arc::new(Settings::default())
    }

    #[test]
    fn walks_enabled_languages_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def f(): pass").unwrap();
        fs::write(dir.path().join("a.rs"), "fn f() {}").unwrap();
        fs::write(dir.path().join("README.md"), "# hi").unwrap();

        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path(), &AtomicBool::new(false));
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn enumeration_order_is_lexicographic() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("z.py"), "").unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        fs::write(dir.path().join("m.py"), "").unwrap();

        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path(), &AtomicBool::new(false));
        let names: Vec<_> = files.iter().map(|f| f.path.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.py", "m.py", "z.py"]);
    }

    #[test]
    fn size_cap_boundary() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.indexing.max_file_bytes = 10;
        fs::write(dir.path().join("small.py"), "x" .repeat(10)).unwrap();
        fs::write(dir.path().join("big.py"), "x".repeat(11)).unwrap();

        let walker = FileWalker::new(Arc::new(settings));
        let files = walker.walk(dir.path(), &AtomicBool::new(false));
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("small.py"));
    }

    #[test]
    fn cancelled_before_start_returns_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path(), &AtomicBool::new(true));
        assert!(files.is_empty());
    }

    #[test]
    fn dot_directories_are_skipped_except_flyto_index() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden/a.py"), "").unwrap();
        fs::write(dir.path().join("visible.py"), "").unwrap();

        let walker = FileWalker::new(settings());
        let files = walker.walk(dir.path(), &AtomicBool::new(false));
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("visible.py"));
    }
}
