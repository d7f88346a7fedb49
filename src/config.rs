//! Layered configuration: defaults → TOML file → `FLYTO_`-prefixed
//! environment variables. This is the contract an external CLI/config-loader
//! collaborator fills in before calling into the core; the core never reads
//! environment variables on its own initiative outside of [`Settings::load`].

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexingConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    #[serde(default = "default_parse_timeout_secs")]
    pub parse_timeout_secs: u64,

    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_k1")]
    pub k1: f32,

    #[serde(default = "default_b")]
    pub b: f32,

    /// Session boost coefficient, as a fraction of the top BM25 score.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_capacity")]
    pub capacity: usize,

    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(".flyto-index")
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_max_file_bytes() -> u64 {
    1024 * 1024
}
fn default_parse_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_k1() -> f32 {
    1.5
}
fn default_b() -> f32 {
    0.75
}
fn default_alpha() -> f32 {
    0.20
}
fn default_session_capacity() -> usize {
    128
}
fn default_flush_interval_secs() -> u64 {
    1
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            search: SearchConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            max_file_bytes: default_max_file_bytes(),
            parse_timeout_secs: default_parse_timeout_secs(),
            ignore_patterns: vec![
                "node_modules/**".to_string(),
                "target/**".to_string(),
                ".git/**".to_string(),
            ],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { k1: default_k1(), b: default_b(), alpha: default_alpha() }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_session_capacity(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { default: default_log_level(), modules: HashMap::new() }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    for (name, exts) in [
        ("python", vec!["py"]),
        ("typescript", vec!["ts", "tsx", "js", "jsx"]),
        ("vue", vec!["vue"]),
        ("go", vec!["go"]),
        ("rust", vec!["rs"]),
        ("java", vec!["java"]),
    ] {
        langs.insert(
            name.to_string(),
            LanguageConfig {
                enabled: true,
                extensions: exts.into_iter().map(String::from).collect(),
            },
        );
    }
    langs
}

impl Settings {
    /// Load configuration layered: defaults → `path` (if it exists) →
    /// `FLYTO_`-prefixed environment variables (double underscore separates
    /// nesting, e.g. `FLYTO_INDEXING__PARALLEL_THREADS=8`).
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FLYTO_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_string =
            toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, toml_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_enable_all_six_languages() {
        let settings = Settings::default();
        assert_eq!(settings.languages.len(), 6);
        assert!(settings.languages["rust"].enabled);
    }

    #[test]
    fn layered_load_overrides_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[indexing]\nparallel_threads = 4\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.indexing.parallel_threads, 4);
        assert_eq!(settings.search.k1, 1.5);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load("/nonexistent/settings.toml").unwrap();
        assert_eq!(settings.indexing.max_file_bytes, 1024 * 1024);
    }
}
