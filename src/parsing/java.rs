//! Java parser (`spec.md` §4.3): classes, interfaces, methods, annotations,
//! imports. Grounded on the reference codebase's `parsing::java` module's
//! behavior/definition split, adapted to the uniform extraction contract.

use super::{identifier_sweep, strip_comments_and_strings, LanguageParser, ParsedFile, C_STYLE_COMMENTS};
use crate::file_record::ImportDecl;
use crate::hashing::hash_body;
use crate::symbol::SymbolRecord;
use crate::types::{Span, SymbolId, SymbolKind};
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "true", "false", "null",
];

pub struct JavaParser {
    parser: Parser,
    reserved: HashSet<&'static str>,
}

impl JavaParser {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .expect("tree-sitter-java grammar ABI matches tree-sitter");
        Self { parser, reserved: RESERVED.iter().copied().collect() }
    }

    fn walk(&self, node: Node, code: &str, project: &str, path: &str, out: &mut ParsedFile, owner: Option<&str>) {
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration" => {
                let kind = match node.kind() {
                    "interface_declaration" => SymbolKind::Interface,
                    "enum_declaration" => SymbolKind::Enum,
                    _ => SymbolKind::Class,
                };
                let Some(name_node) = node.child_by_field_name("name") else { return };
                let name = text(code, name_node);
                let decorators = collect_annotations(code, node);
                let id = SymbolId::new(project, path, kind, name);
                out.symbols.push(self.record(id, kind, node, code, decorators, is_public(code, node)));
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.walk(child, code, project, path, out, Some(name));
                    }
                }
                return;
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = text(code, name_node);
                    let decorators = collect_annotations(code, node);
                    let id = match owner {
                        Some(owner) => SymbolId::method(project, path, owner, name),
                        None => SymbolId::new(project, path, SymbolKind::Function, name),
                    };
                    let kind = if owner.is_some() { SymbolKind::Method } else { SymbolKind::Function };
                    out.symbols.push(self.record(id, kind, node, code, decorators, is_public(code, node)));
                }
                return;
            }
            "import_declaration" => {
                let text_value = text(code, node);
                let module = text_value
                    .trim_start_matches("import")
                    .trim_start_matches("static")
                    .trim()
                    .trim_end_matches(';')
                    .trim();
                out.imports.push(ImportDecl { module: module.to_string(), alias: None });
                return;
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, code, project, path, out, owner);
        }
    }

    fn record(&self, id: SymbolId, kind: SymbolKind, node: Node, code: &str, decorators: Vec<String>, exports: bool) -> SymbolRecord {
        let span = Span::new(node.start_position().row as u32 + 1, node.end_position().row as u32 + 1);
        let body_text = text(code, node);
        let body_hash = hash_body(body_text);
        let stripped = strip_comments_and_strings(body_text, C_STYLE_COMMENTS);
        let refs_out = identifier_sweep(&stripped, &self.reserved);
        let doc = leading_javadoc(code, node);
        let mut record = SymbolRecord::new(id, kind, span, body_hash)
            .with_refs_out(refs_out)
            .with_decorators(decorators)
            .exported(exports);
        if let Some(doc) = doc {
            record = record.with_doc(doc);
        }
        record
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for JavaParser {
    fn parse(&mut self, project: &str, path: &str, source: &str) -> ParsedFile {
        let mut out = ParsedFile::default();
        let Some(tree) = self.parser.parse(source, None) else {
            out.unhandled_constructs.push("unparseable".to_string());
            return out;
        };
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.walk(child, source, project, path, &mut out, None);
        }
        out
    }

    fn language(&self) -> super::Language {
        super::Language::Java
    }
}

fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}

fn is_public(code: &str, node: Node) -> bool {
    if let Some(modifiers) = node.child_by_field_name("modifiers") {
        return text(code, modifiers).contains("public");
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "modifiers" && text(code, c).contains("public"))
}

fn collect_annotations(code: &str, node: Node) -> Vec<String> {
    let mut annotations = Vec::new();
    let Some(modifiers) = (0..node.child_count())
        .filter_map(|i| node.child(i))
        .find(|c| c.kind() == "modifiers")
    else {
        return annotations;
    };
    let mut cursor = modifiers.walk();
    for child in modifiers.children(&mut cursor) {
        if child.kind() == "marker_annotation" || child.kind() == "annotation" {
            annotations.push(text(code, child).trim_start_matches('@').to_string());
        }
    }
    annotations
}

fn leading_javadoc(code: &str, node: Node) -> Option<String> {
    let sibling = node.prev_sibling()?;
    if sibling.kind() != "block_comment" {
        return None;
    }
    let raw = text(code, sibling);
    if !raw.starts_with("/**") {
        return None;
    }
    let cleaned: Vec<&str> = raw
        .trim_start_matches("/**")
        .trim_end_matches("*/")
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .filter(|l| !l.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join("\n"))
    }
}
