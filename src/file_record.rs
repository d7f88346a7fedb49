//! [`FileRecord`] and the two sides of the cross-language API join:
//! [`RouteDecl`] (backend) and [`CallSite`] (frontend).

use crate::types::{HttpMethod, SymbolId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framework {
    FastApi,
    Flask,
    Starlette,
    Express,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecl {
    pub method: HttpMethod,
    pub path_pattern: String,
    pub handler_symbol_id: SymbolId,
    pub framework: Framework,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub method: HttpMethod,
    pub url_literal: String,
    pub file: String,
    pub line: u32,
    pub containing_symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub module: String,
    pub alias: Option<String>,
}

/// Why a file contributed zero symbols, if so. `spec.md` §4.3: a file is
/// never dropped whole unless it isn't decodable as UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFlag {
    Ok,
    NonUtf8,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub project: String,
    pub language: String,
    pub content_hash: u64,
    pub symbols: Vec<SymbolId>,
    pub imports: Vec<ImportDecl>,
    pub defined_routes: Vec<RouteDecl>,
    pub outbound_calls: Vec<CallSite>,
    pub parse_flag: ParseFlag,
    /// AST/scanner node kinds seen but not specifically handled — ambient
    /// audit data for triaging parser gaps, no bearing on the query surface.
    pub unhandled_constructs: Vec<String>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, project: impl Into<String>, language: impl Into<String>, content_hash: u64) -> Self {
        Self {
            path: path.into(),
            project: project.into(),
            language: language.into(),
            content_hash,
            symbols: Vec::new(),
            imports: Vec::new(),
            defined_routes: Vec::new(),
            outbound_calls: Vec::new(),
            parse_flag: ParseFlag::Ok,
            unhandled_constructs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_symbol_file_still_records_itself() {
        let record = FileRecord::new("empty.py", "proj", "python", 0);
        assert!(record.symbols.is_empty());
        assert_eq!(record.parse_flag, ParseFlag::Ok);
    }

    #[test]
    fn non_utf8_file_flagged_not_dropped() {
        let mut record = FileRecord::new("bin.py", "proj", "python", 0);
        record.parse_flag = ParseFlag::NonUtf8;
        assert_eq!(record.parse_flag, ParseFlag::NonUtf8);
    }
}
