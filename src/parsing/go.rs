//! Go parser (`spec.md` §4.3): top-level `func`, `type ... struct`,
//! `type ... interface`, methods (`func (r T) name`), package-level
//! consts, and `import ( ... )` blocks.

use super::{identifier_sweep, strip_comments_and_strings, LanguageParser, ParsedFile, C_STYLE_COMMENTS};
use crate::file_record::ImportDecl;
use crate::hashing::hash_body;
use crate::symbol::SymbolRecord;
use crate::types::{Span, SymbolId, SymbolKind};
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

const RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var", "nil", "true", "false",
];

pub struct GoParser {
    parser: Parser,
    reserved: HashSet<&'static str>,
}

impl GoParser {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .expect("tree-sitter-go grammar ABI matches tree-sitter");
        Self { parser, reserved: RESERVED.iter().copied().collect() }
    }

    fn walk(&self, node: Node, code: &str, project: &str, path: &str, out: &mut ParsedFile) {
        match node.kind() {
            "function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = text(code, name_node);
                    let id = SymbolId::new(project, path, SymbolKind::Function, name);
                    out.symbols.push(self.record(id, SymbolKind::Function, node, code, exported_go(name)));
                }
            }
            "method_declaration" => {
                if let (Some(receiver), Some(name_node)) =
                    (node.child_by_field_name("receiver"), node.child_by_field_name("name"))
                {
                    if let Some(owner) = receiver_type_name(code, receiver) {
                        let name = text(code, name_node);
                        let id = SymbolId::method(project, path, &owner, name);
                        out.symbols.push(self.record(id, SymbolKind::Method, node, code, exported_go(name)));
                    }
                }
            }
            "type_declaration" => {
                let mut cursor = node.walk();
                for spec in node.children(&mut cursor) {
                    if spec.kind() != "type_spec" {
                        continue;
                    }
                    let Some(name_node) = spec.child_by_field_name("name") else { continue };
                    let Some(type_node) = spec.child_by_field_name("type") else { continue };
                    let kind = match type_node.kind() {
                        "struct_type" => SymbolKind::Struct,
                        "interface_type" => SymbolKind::Interface,
                        _ => SymbolKind::Type,
                    };
                    let name = text(code, name_node);
                    let id = SymbolId::new(project, path, kind, name);
                    out.symbols.push(self.record(id, kind, node, code, exported_go(name)));
                }
            }
            "const_declaration" => {
                let mut cursor = node.walk();
                for spec in node.children(&mut cursor) {
                    if spec.kind() != "const_spec" {
                        continue;
                    }
                    let mut spec_cursor = spec.walk();
                    for ident in spec.children(&mut spec_cursor) {
                        if ident.kind() == "identifier" {
                            let name = text(code, ident);
                            let id = SymbolId::new(project, path, SymbolKind::Constant, name);
                            out.symbols.push(self.record(id, SymbolKind::Constant, spec, code, exported_go(name)));
                        }
                    }
                }
            }
            "import_declaration" => collect_imports(code, node, out),
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, code, project, path, out);
        }
    }

    fn record(&self, id: SymbolId, kind: SymbolKind, node: Node, code: &str, exported: bool) -> SymbolRecord {
        let span = Span::new(node.start_position().row as u32 + 1, node.end_position().row as u32 + 1);
        let body_text = text(code, node);
        let body_hash = hash_body(body_text);
        let stripped = strip_comments_and_strings(body_text, C_STYLE_COMMENTS);
        let refs_out = identifier_sweep(&stripped, &self.reserved);
        let doc = leading_comment(code, node);
        let mut record = SymbolRecord::new(id, kind, span, body_hash).with_refs_out(refs_out).exported(exported);
        if let Some(doc) = doc {
            record = record.with_doc(doc);
        }
        record
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for GoParser {
    fn parse(&mut self, project: &str, path: &str, source: &str) -> ParsedFile {
        let mut out = ParsedFile::default();
        let Some(tree) = self.parser.parse(source, None) else {
            out.unhandled_constructs.push("unparseable".to_string());
            return out;
        };
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.walk(child, source, project, path, &mut out);
        }
        out
    }

    fn language(&self) -> super::Language {
        super::Language::Go
    }
}

fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}

fn exported_go(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

fn receiver_type_name(code: &str, receiver: Node) -> Option<String> {
    let mut cursor = receiver.walk();
    for param in receiver.children(&mut cursor) {
        if param.kind() != "parameter_declaration" {
            continue;
        }
        if let Some(type_node) = param.child_by_field_name("type") {
            let mut t = text(code, type_node);
            t = t.trim_start_matches('*');
            return Some(t.to_string());
        }
    }
    None
}

fn leading_comment(code: &str, node: Node) -> Option<String> {
    let sibling = node.prev_sibling()?;
    if sibling.kind() != "comment" {
        return None;
    }
    let raw = text(code, sibling).trim_start_matches("//").trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn collect_imports(code: &str, node: Node, out: &mut ParsedFile) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "import_spec" {
            push_import_spec(code, child, out);
        } else if child.kind() == "import_spec_list" {
            let mut inner_cursor = child.walk();
            for spec in child.children(&mut inner_cursor) {
                if spec.kind() == "import_spec" {
                    push_import_spec(code, spec, out);
                }
            }
        }
    }
}

fn push_import_spec(code: &str, spec: Node, out: &mut ParsedFile) {
    let mut path = None;
    let mut alias = None;
    let mut cursor = spec.walk();
    for child in spec.children(&mut cursor) {
        match child.kind() {
            "interpreted_string_literal" => path = Some(text(code, child).trim_matches('"').to_string()),
            "package_identifier" | "dot" | "blank_identifier" => alias = Some(text(code, child).to_string()),
            _ => {}
        }
    }
    if let Some(module) = path {
        out.imports.push(ImportDecl { module, alias });
    }
}
