//! Primitive value types shared across the crate: symbol identity, spans,
//! symbol kinds, and the confidence/edge-kind tiers used by the graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `kind` component of a [`SymbolId`], matching the closed set in the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Trait,
    Component,
    Composable,
    Type,
    Enum,
    Constant,
    Module,
    Route,
}

impl SymbolKind {
    fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Component => "component",
            SymbolKind::Composable => "composable",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Constant => "constant",
            SymbolKind::Module => "module",
            SymbolKind::Route => "route",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "function" => SymbolKind::Function,
            "method" => SymbolKind::Method,
            "class" => SymbolKind::Class,
            "struct" => SymbolKind::Struct,
            "interface" => SymbolKind::Interface,
            "trait" => SymbolKind::Trait,
            "component" => SymbolKind::Component,
            "composable" => SymbolKind::Composable,
            "type" => SymbolKind::Type,
            "enum" => SymbolKind::Enum,
            "constant" => SymbolKind::Constant,
            "module" => SymbolKind::Module,
            "route" => SymbolKind::Route,
            other => return Err(format!("unknown symbol kind '{other}'")),
        })
    }
}

/// The stable four-tuple primary key of the graph: `project:path:kind:name`.
///
/// For methods, `name` is `Owner.method` per the data model. Serializes as the
/// canonical colon-joined string so `index.json` keys stay human-readable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId {
    pub project: String,
    pub path: String,
    pub kind: SymbolKind,
    pub name: String,
}

impl SymbolId {
    pub fn new(
        project: impl Into<String>,
        path: impl Into<String>,
        kind: SymbolKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            path: path.into(),
            kind,
            name: name.into(),
        }
    }

    /// `Owner.method` constructor for methods, enforcing the dotted name shape.
    pub fn method(
        project: impl Into<String>,
        path: impl Into<String>,
        owner: &str,
        method: &str,
    ) -> Self {
        Self::new(project, path, SymbolKind::Method, format!("{owner}.{method}"))
    }

    pub fn to_canonical(&self) -> String {
        format!("{}:{}:{}:{}", self.project, self.path, self.kind, self.name)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl FromStr for SymbolId {
    type Err = String;

    /// Parses `project:path:kind:name`. `path` may itself contain `:` (e.g.
    /// Windows drive letters never occur here since paths are workspace-relative,
    /// but we still split conservatively from the right to keep `kind`/`name`
    /// unambiguous: exactly the last two colon-separated segments are `kind`
    /// and `name`, everything before the first colon is `project`, everything
    /// in between is `path`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rsplit = s.rsplitn(3, ':');
        let name = rsplit.next().ok_or("malformed symbol id")?;
        let kind_str = rsplit.next().ok_or("malformed symbol id: missing kind")?;
        let rest = rsplit.next().ok_or("malformed symbol id: missing project/path")?;
        let (project, path) = rest
            .split_once(':')
            .ok_or("malformed symbol id: missing path")?;
        let kind = kind_str.parse()?;
        Ok(SymbolId::new(project, path, kind, name))
    }
}

impl Serialize for SymbolId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for SymbolId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `(start_line, end_line)` span of a symbol within its file. Lines are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
}

impl Span {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self { start_line, end_line }
    }
}

/// Confidence tier attached to every resolved edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Heuristic,
    Likely,
    Exact,
}

/// The kind of relationship a forward edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    Imports,
    Extends,
    References,
    RoutesTo,
}

/// `(from, to, kind, confidence)` forward edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: SymbolId,
    pub to: SymbolId,
    pub kind: EdgeKind,
    pub confidence: Confidence,
}

impl Edge {
    pub fn new(from: SymbolId, to: SymbolId, kind: EdgeKind, confidence: Confidence) -> Self {
        Self { from, to, kind, confidence }
    }
}

/// HTTP method, normalized lowercase for storage and joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "get" => HttpMethod::Get,
            "post" => HttpMethod::Post,
            "put" => HttpMethod::Put,
            "patch" => HttpMethod::Patch,
            "delete" => HttpMethod::Delete,
            "head" => HttpMethod::Head,
            "options" => HttpMethod::Options,
            _ => HttpMethod::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_id_roundtrip() {
        let id = SymbolId::new("web", "src/a.py", SymbolKind::Function, "foo");
        let canonical = id.to_canonical();
        assert_eq!(canonical, "web:src/a.py:function:foo");
        let parsed: SymbolId = canonical.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn symbol_id_method_name_is_dotted() {
        let id = SymbolId::method("web", "src/a.py", "Owner", "method");
        assert_eq!(id.name, "Owner.method");
        assert_eq!(id.kind, SymbolKind::Method);
    }

    #[test]
    fn symbol_id_rejects_unknown_kind() {
        let result: Result<SymbolId, _> = "web:src/a.py:bogus:foo".parse();
        assert!(result.is_err());
    }

    #[test]
    fn confidence_ordering_matches_spec() {
        assert!(Confidence::Exact > Confidence::Likely);
        assert!(Confidence::Likely > Confidence::Heuristic);
    }

    #[test]
    fn symbol_id_serializes_as_string() {
        let id = SymbolId::new("web", "src/a.py", SymbolKind::Function, "foo");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"web:src/a.py:function:foo\"");
    }
}
