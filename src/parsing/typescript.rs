//! TypeScript/JavaScript parser (`spec.md` §4.3): a handwritten scanner, not
//! tree-sitter, per the explicit design note in `spec.md` §9 — comments and
//! string/template literals are stripped first (preserving line numbers),
//! then a regex + bracket-balance scanner finds function/arrow/class/
//! interface/type-alias boundaries and call-site patterns.

use super::{identifier_sweep, strip_comments_and_strings, LanguageParser, ParsedFile, CommentStyle};
use crate::file_record::{CallSite, ImportDecl};
use crate::hashing::hash_body;
use crate::symbol::SymbolRecord;
use crate::types::{HttpMethod, Span, SymbolId, SymbolKind};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "return", "super", "switch", "this", "throw", "try", "typeof",
    "var", "void", "while", "with", "yield", "async", "await", "true", "false", "null",
    "undefined", "interface", "type", "implements", "public", "private", "protected", "static",
    "readonly", "enum", "as", "from", "of",
];

const TS_COMMENTS: CommentStyle = CommentStyle {
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    string_quotes: &['\'', '"', '`'],
    triple_quotes: &[],
};

fn function_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(export\s+)?(default\s+)?(async\s+)?function\s*\*?\s+([A-Za-z_$][\w$]*)\s*\(").unwrap())
}

fn arrow_const_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(export\s+)?(const|let)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(async\s+)?\(?[^=;{]*\)?\s*=>").unwrap())
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(export\s+)?(default\s+)?(abstract\s+)?class\s+([A-Za-z_$][\w$]*)").unwrap())
}

fn interface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(export\s+)?interface\s+([A-Za-z_$][\w$]*)").unwrap())
}

fn type_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*(export\s+)?type\s+([A-Za-z_$][\w$]*)\s*(<[^=]*>)?\s*=").unwrap())
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(public\s+|private\s+|protected\s+|static\s+|async\s+|readonly\s+)*([A-Za-z_$][\w$]*)\s*\(([^)]*)\)\s*(:[^{;]+)?\{").unwrap()
    })
}

fn call_site_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:\bfetch|\baxios\.(get|post|put|patch|delete|head|options)|\$http\.(get|post|put|patch|delete|head|options)|\.request)\s*\(").unwrap()
    })
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?(?:([\w${},\s*]+)\s+from\s+)?['"]([^'"]+)['"]"#).unwrap())
}

pub struct TypeScriptParser {
    reserved: HashSet<&'static str>,
}

impl TypeScriptParser {
    pub fn new() -> Self {
        Self { reserved: RESERVED.iter().copied().collect() }
    }

    /// Parses the given source, optionally wrapping symbols in a class
    /// `owner` (used by [`super::vue::VueParser`] when treating a Vue
    /// `<script>` block's top-level exports as a component's methods is not
    /// needed, so `owner` is always `None` from there; kept generic for
    /// reuse and tests).
    pub(super) fn parse_block(&self, project: &str, path: &str, source: &str, line_offset: u32) -> ParsedFile {
        let mut out = ParsedFile::default();
        let no_comments = strip_comments_and_strings_comments_only(source);

        self.extract_functions(project, path, source, &no_comments, line_offset, &mut out);
        self.extract_classes(project, path, source, &no_comments, line_offset, &mut out);
        self.extract_interfaces(project, path, source, &no_comments, line_offset, &mut out);
        self.extract_type_aliases(project, path, source, &no_comments, line_offset, &mut out);
        self.extract_imports(source, &no_comments, &mut out);
        self.extract_call_sites(path, source, &no_comments, line_offset, &mut out);
        attach_containing_symbols(&mut out);

        out
    }

    fn extract_functions(&self, project: &str, path: &str, source: &str, scan: &str, line_offset: u32, out: &mut ParsedFile) {
        for caps in function_re().captures_iter(scan) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(4).unwrap().as_str();
            let exported = caps.get(1).is_some();
            let Some(brace_start) = scan[whole.end()..].find('{').map(|i| whole.end() + i) else { continue };
            let Some(end) = find_matching_brace(scan.as_bytes(), brace_start) else { continue };
            let id = SymbolId::new(project, path, SymbolKind::Function, name);
            out.symbols.push(self.build_symbol(id, SymbolKind::Function, source, whole.start(), end, line_offset, exported));
        }
        for caps in arrow_const_re().captures_iter(scan) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(3).unwrap().as_str();
            let exported = caps.get(1).is_some();
            let end = statement_end(scan.as_bytes(), whole.end());
            let id = SymbolId::new(project, path, SymbolKind::Function, name);
            out.symbols.push(self.build_symbol(id, SymbolKind::Function, source, whole.start(), end, line_offset, exported));
        }
    }

    fn extract_classes(&self, project: &str, path: &str, source: &str, scan: &str, line_offset: u32, out: &mut ParsedFile) {
        for caps in class_re().captures_iter(scan) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(4).unwrap().as_str();
            let exported = caps.get(1).is_some();
            let Some(brace_start) = scan[whole.end()..].find('{').map(|i| whole.end() + i) else { continue };
            let Some(end) = find_matching_brace(scan.as_bytes(), brace_start) else { continue };
            let id = SymbolId::new(project, path, SymbolKind::Class, name);
            out.symbols.push(self.build_symbol(id, SymbolKind::Class, source, whole.start(), end, line_offset, exported));

            let body = &scan[brace_start + 1..end];
            let body_offset = brace_start + 1;
            for method_caps in method_re().captures_iter(body) {
                let method_whole = method_caps.get(0).unwrap();
                let method_name = method_caps.get(2).unwrap().as_str();
                if method_name == "constructor" {
                    continue;
                }
                let abs_start = body_offset + method_whole.start();
                let Some(method_brace) = body[method_whole.start()..].find('{').map(|i| body_offset + method_whole.start() + i) else { continue };
                let Some(method_end) = find_matching_brace(scan.as_bytes(), method_brace) else { continue };
                let method_id = SymbolId::method(project, path, name, method_name);
                out.symbols.push(self.build_symbol(method_id, SymbolKind::Method, source, abs_start, method_end, line_offset, true));
            }
        }
    }

    fn extract_interfaces(&self, project: &str, path: &str, source: &str, scan: &str, line_offset: u32, out: &mut ParsedFile) {
        for caps in interface_re().captures_iter(scan) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(2).unwrap().as_str();
            let exported = caps.get(1).is_some();
            let Some(brace_start) = scan[whole.end()..].find('{').map(|i| whole.end() + i) else { continue };
            let Some(end) = find_matching_brace(scan.as_bytes(), brace_start) else { continue };
            let id = SymbolId::new(project, path, SymbolKind::Interface, name);
            out.symbols.push(self.build_symbol(id, SymbolKind::Interface, source, whole.start(), end, line_offset, exported));
        }
    }

    fn extract_type_aliases(&self, project: &str, path: &str, source: &str, scan: &str, line_offset: u32, out: &mut ParsedFile) {
        for caps in type_alias_re().captures_iter(scan) {
            let whole = caps.get(0).unwrap();
            let name = caps.get(2).unwrap().as_str();
            let exported = caps.get(1).is_some();
            let end = statement_end(scan.as_bytes(), whole.end());
            let id = SymbolId::new(project, path, SymbolKind::Type, name);
            out.symbols.push(self.build_symbol(id, SymbolKind::Type, source, whole.start(), end, line_offset, exported));
        }
    }

    fn extract_imports(&self, source: &str, scan: &str, out: &mut ParsedFile) {
        let _ = source;
        for caps in import_re().captures_iter(scan) {
            let module = caps.get(2).unwrap().as_str().to_string();
            let alias = caps.get(1).map(|m| m.as_str().trim().to_string());
            out.imports.push(ImportDecl { module, alias });
        }
    }

    fn extract_call_sites(&self, path: &str, source: &str, scan: &str, line_offset: u32, out: &mut ParsedFile) {
        for m in call_site_re().find_iter(scan) {
            let Some(literal) = first_string_literal_after(source, m.end()) else { continue };
            let line = line_offset + scan[..m.start()].matches('\n').count() as u32 + 1;
            let method = infer_method(&scan[m.start()..m.end()]);
            out.calls.push(CallSite { method, url_literal: literal, file: path.to_string(), line, containing_symbol: None });
        }
    }

    fn build_symbol(&self, id: SymbolId, kind: SymbolKind, source: &str, start: usize, end: usize, line_offset: u32, exported: bool) -> SymbolRecord {
        let end = end.min(source.len()).max(start);
        let body_text = &source[start..end];
        let start_line = line_offset + source[..start].matches('\n').count() as u32 + 1;
        let end_line = start_line + body_text.matches('\n').count() as u32;
        let body_hash = hash_body(body_text);
        let stripped = strip_comments_and_strings(body_text, TS_COMMENTS);
        let refs_out = identifier_sweep(&stripped, &self.reserved);
        SymbolRecord::new(id, kind, Span::new(start_line, end_line), body_hash)
            .with_refs_out(refs_out)
            .exported(exported)
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for TypeScriptParser {
    fn parse(&mut self, project: &str, path: &str, source: &str) -> ParsedFile {
        self.parse_block(project, path, source, 0)
    }

    fn language(&self) -> super::Language {
        super::Language::TypeScript
    }
}

/// Strips only comments (not strings), matching the "pre-strip comments and
/// string literals preserving line numbers" design note while still letting
/// call-site extraction read the real string literal it matched.
fn strip_comments_and_strings_comments_only(source: &str) -> String {
    let style = CommentStyle { string_quotes: &[], ..TS_COMMENTS };
    strip_comments_and_strings(source, style)
}

fn find_matching_brace(bytes: &[u8], open_index: usize) -> Option<usize> {
    if bytes.get(open_index) != Some(&b'{') {
        return None;
    }
    let mut depth = 0i32;
    let mut i = open_index;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// For statement-style declarations (arrow consts, type aliases) without a
/// brace body: the terminating `;` at the same bracket depth, or line end.
fn statement_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0i32;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b';' if depth <= 0 => return i + 1,
            b'\n' if depth <= 0 => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn first_string_literal_after(source: &str, from: usize) -> Option<String> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let quote = *bytes.get(i)?;
    if quote != b'\'' && quote != b'"' && quote != b'`' {
        return None;
    }
    let rest = &source[i + 1..];
    let end = rest.find(quote as char)?;
    Some(rest[..end].to_string())
}

/// A call site's containing symbol is whichever extracted function/method
/// body spans its line; the narrowest (innermost) span wins when bodies
/// nest, matching the handler-attribution a caller needs to join a route
/// call back to a specific function in `api_resolver`.
fn attach_containing_symbols(out: &mut ParsedFile) {
    for call in &mut out.calls {
        let owner = out
            .symbols
            .iter()
            .filter(|s| s.span.start_line <= call.line && call.line <= s.span.end_line)
            .min_by_key(|s| s.span.end_line.saturating_sub(s.span.start_line));
        call.containing_symbol = owner.map(|s| s.id.clone());
    }
}

fn infer_method(matched: &str) -> HttpMethod {
    for (name, method) in [
        ("get", HttpMethod::Get),
        ("post", HttpMethod::Post),
        ("put", HttpMethod::Put),
        ("patch", HttpMethod::Patch),
        ("delete", HttpMethod::Delete),
        ("head", HttpMethod::Head),
        ("options", HttpMethod::Options),
    ] {
        if matched.to_ascii_lowercase().contains(name) {
            return method;
        }
    }
    HttpMethod::Get
}
