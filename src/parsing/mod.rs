//! Uniform multi-language parser contract (`spec.md` §4.3).
//!
//! Every language implements [`LanguageParser`] and is selected through the
//! [`Language`] tagged enum's dispatch table rather than a subclass
//! hierarchy (`spec.md` §9 design note on dynamic dispatch across parsers).

mod common;
mod go;
mod java;
mod python;
mod rust;
mod typescript;
mod vue;

pub use common::{
    identifier_sweep, safe_truncate, split_identifier, strip_comments_and_strings, CommentStyle,
    C_STYLE_COMMENTS, PY_COMMENTS,
};

use crate::file_record::{CallSite, ImportDecl, RouteDecl};
use crate::symbol::SymbolRecord;
use std::path::Path;

/// The closed set of languages this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    TypeScript,
    Vue,
    Go,
    Rust,
    Java,
}

impl Language {
    /// The key this language is registered under in `Settings.languages`.
    pub fn config_key(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::Vue => "vue",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Some(match ext {
            "py" | "pyi" => Language::Python,
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => Language::TypeScript,
            "vue" => Language::Vue,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "java" => Language::Java,
            _ => return None,
        })
    }

    /// Shebang sniff for extensionless scripts (`spec.md` §4.1).
    pub fn from_shebang(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        let first_line = bytes.split(|&b| b == b'\n').next()?;
        let line = std::str::from_utf8(first_line).ok()?;
        if !line.starts_with("#!") {
            return None;
        }
        if line.contains("python") {
            Some(Language::Python)
        } else if line.contains("node") {
            Some(Language::TypeScript)
        } else {
            None
        }
    }

    /// Dispatch table entry: builds the parser for this language.
    pub fn new_parser(&self) -> Box<dyn LanguageParser> {
        match self {
            Language::Python => Box::new(python::PythonParser::new()),
            Language::TypeScript => Box::new(typescript::TypeScriptParser::new()),
            Language::Vue => Box::new(vue::VueParser::new()),
            Language::Go => Box::new(go::GoParser::new()),
            Language::Rust => Box::new(rust::RustParser::new()),
            Language::Java => Box::new(java::JavaParser::new()),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_key())
    }
}

/// The uniform output every parser produces for one file (`spec.md` §4.3).
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub symbols: Vec<SymbolRecord>,
    pub imports: Vec<ImportDecl>,
    pub routes: Vec<RouteDecl>,
    pub calls: Vec<CallSite>,
    /// AST/scanner node kinds seen but not specifically handled, for the
    /// ambient parse-construct audit (see DESIGN.md).
    pub unhandled_constructs: Vec<String>,
}

/// Common interface every language parser implements. One parser instance
/// handles one file at a time; instances are not required to be reused
/// across files (the pipeline creates one per worker-thread-local via
/// [`Language::new_parser`]). `Send` only, not `Sync`: the tree-sitter
/// grammars backing the AST-driven parsers wrap a `Parser` that is not
/// `Sync`, and every call site here only ever moves a boxed parser to the
/// thread that owns it, never shares `&dyn LanguageParser` across threads.
pub trait LanguageParser: Send {
    /// Parses `source` (already known to be valid UTF-8) belonging to
    /// `project`/`path`, producing the uniform `{symbols, imports, routes,
    /// calls}` bundle. Per `spec.md` §4.3, this must be total: a construct
    /// that fails to parse is skipped and recorded in
    /// `unhandled_constructs`, never dropping the whole file.
    fn parse(&mut self, project: &str, path: &str, source: &str) -> ParsedFile;

    fn language(&self) -> Language;
}
