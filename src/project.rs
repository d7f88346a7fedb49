//! [`Project`]: the root grouping for a namespace of symbols. Multiple
//! projects may share a workspace; their symbol namespaces are disjoint by
//! `name`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub root_path: PathBuf,
    pub language_hints: Vec<String>,
}

impl Project {
    pub fn new(name: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), root_path: root_path.into(), language_hints: Vec::new() }
    }

    pub fn with_language_hints(mut self, hints: Vec<String>) -> Self {
        self.language_hints = hints;
        self
    }
}

/// Summary counts published in `index.json`'s `projects` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub root: PathBuf,
    pub language_counts: HashMap<String, usize>,
}
