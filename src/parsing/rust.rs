//! Rust parser (`spec.md` §4.3): `fn`, `struct`, `enum`, `trait`, `impl`
//! blocks (methods attributed to the impl's type), `mod`, `use`.
//!
//! Grounded on the reference codebase's own `parsing::RustParser`, adapted
//! to the four-tuple `SymbolId` and the uniform `{symbols, imports, routes,
//! calls}` contract instead of its original relationship-graph-specific
//! output.

use super::{identifier_sweep, strip_comments_and_strings, LanguageParser, ParsedFile, C_STYLE_COMMENTS};
use crate::file_record::ImportDecl;
use crate::hashing::hash_body;
use crate::symbol::SymbolRecord;
use crate::types::{Span, SymbolId, SymbolKind};
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn",
];

pub struct RustParser {
    parser: Parser,
    reserved: HashSet<&'static str>,
}

impl RustParser {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        // `set_language` only fails on an ABI mismatch between `tree-sitter`
        // and the grammar crate; both are pinned in Cargo.toml so this is
        // treated as infallible here.
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .expect("tree-sitter-rust grammar ABI matches tree-sitter");
        Self { parser, reserved: RESERVED.iter().copied().collect() }
    }

    fn walk(&self, node: Node, code: &str, project: &str, path: &str, out: &mut ParsedFile, owner: Option<&str>) {
        match node.kind() {
            "function_item" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name_text = text(code, name_node);
                    let is_method = owner.is_some();
                    let id = if is_method {
                        SymbolId::method(project, path, owner.unwrap(), name_text)
                    } else {
                        SymbolId::new(project, path, SymbolKind::Function, name_text)
                    };
                    out.symbols.push(self.record(id, if is_method { SymbolKind::Method } else { SymbolKind::Function }, node, code));
                }
            }
            "struct_item" => self.simple_type(node, code, project, path, SymbolKind::Struct, out),
            "enum_item" => self.simple_type(node, code, project, path, SymbolKind::Enum, out),
            "trait_item" => self.simple_type(node, code, project, path, SymbolKind::Trait, out),
            "const_item" | "static_item" => self.simple_type(node, code, project, path, SymbolKind::Constant, out),
            "mod_item" => {
                self.simple_type(node, code, project, path, SymbolKind::Module, out);
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.walk(child, code, project, path, out, owner);
                    }
                }
                return;
            }
            "impl_item" => {
                let owner_name = node
                    .child_by_field_name("type")
                    .map(|n| text(code, n).to_string());
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.walk(child, code, project, path, out, owner_name.as_deref());
                    }
                }
                return;
            }
            "use_declaration" => {
                if let Some(use_tree) = node.child(1) {
                    collect_use_tree(code, use_tree, String::new(), &mut out.imports);
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, code, project, path, out, owner);
        }
    }

    fn simple_type(&self, node: Node, code: &str, project: &str, path: &str, kind: SymbolKind, out: &mut ParsedFile) {
        if let Some(name_node) = node.child_by_field_name("name") {
            let id = SymbolId::new(project, path, kind, text(code, name_node));
            out.symbols.push(self.record(id, kind, node, code));
        }
    }

    fn record(&self, id: SymbolId, kind: SymbolKind, node: Node, code: &str) -> SymbolRecord {
        let span = Span::new(node.start_position().row as u32 + 1, node.end_position().row as u32 + 1);
        let body_text = text(code, node);
        let body_hash = hash_body(body_text);
        let doc = leading_doc_comment(code, node);
        let exports = has_pub(code, node);
        let stripped = strip_comments_and_strings(body_text, C_STYLE_COMMENTS);
        let refs_out = identifier_sweep(&stripped, &self.reserved);

        let mut record = SymbolRecord::new(id, kind, span, body_hash).with_refs_out(refs_out).exported(exports);
        if let Some(doc) = doc {
            record = record.with_doc(doc);
        }
        record
    }
}

impl Default for RustParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for RustParser {
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
        super::Language::Rust
    }
}

fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}

fn has_pub(code: &str, node: Node) -> bool {
    // `pub` is a direct leading sibling-less modifier captured in source
    // text before the item keyword; cheapest total check is a text scan.
    let start = node.start_byte();
    let preceding = &code[..start];
    preceding
        .rfind(['\n', '{', '}', ';'])
        .map(|idx| preceding[idx..].contains("pub"))
        .unwrap_or(false)
        || text(code, node).trim_start().starts_with("pub")
}

fn leading_doc_comment(code: &str, node: Node) -> Option<String> {
    let mut sibling = node.prev_sibling();
    let mut lines = Vec::new();
    while let Some(s) = sibling {
        if s.kind() == "line_comment" {
            let t = text(code, s).trim_start_matches('/').trim_start_matches('/').trim();
            if text(code, s).starts_with("///") {
                lines.push(t.to_string());
                sibling = s.prev_sibling();
                continue;
            }
        }
        break;
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn collect_use_tree(code: &str, node: Node, prefix: String, imports: &mut Vec<ImportDecl>) {
    match node.kind() {
        "scoped_identifier" | "identifier" => {
            let mut path = prefix;
            if !path.is_empty() {
                path.push_str("::");
            }
            path.push_str(text(code, node));
            imports.push(ImportDecl { module: path, alias: None });
        }
        "use_as_clause" => {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            if let (Some(path_node), Some(alias_node)) = (children.first(), children.last()) {
                let mut path = prefix;
                if !path.is_empty() {
                    path.push_str("::");
                }
                path.push_str(text(code, *path_node));
                imports.push(ImportDecl { module: path, alias: Some(text(code, *alias_node).to_string()) });
            }
        }
        "use_wildcard" => {
            let mut path = prefix;
            path.push_str("::*");
            imports.push(ImportDecl { module: path, alias: None });
        }
        "use_list" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.kind() == "use_tree" || child.kind().ends_with("identifier") {
                    collect_use_tree(code, child, prefix.clone(), imports);
                }
            }
        }
        "scoped_use_list" => {
            let mut cursor = node.walk();
            let mut new_prefix = prefix;
            let mut list = None;
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "use_list" => list = Some(child),
                    "identifier" | "scoped_identifier" | "crate" | "self" | "super" => {
                        if !new_prefix.is_empty() {
                            new_prefix.push_str("::");
                        }
                        new_prefix.push_str(text(code, child));
                    }
                    _ => {}
                }
            }
            if let Some(list) = list {
                collect_use_tree(code, list, new_prefix, imports);
            }
        }
        "use_tree" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_use_tree(code, child, prefix.clone(), imports);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_and_struct() {
        let src = "pub fn foo() {}\nstruct Bar { x: i32 }\n";
        let mut parser = RustParser::new();
        let parsed = parser.parse("proj", "a.rs", src);
        let names: Vec<_> = parsed.symbols.iter().map(|s| s.id.name.clone()).collect();
        assert!(names.contains(&"foo".to_string()));
        assert!(names.contains(&"Bar".to_string()));
    }

    #[test]
    fn methods_attributed_to_impl_type() {
        let src = "struct Foo;\nimpl Foo { fn bar(&self) {} }\n";
        let mut parser = RustParser::new();
        let parsed = parser.parse("proj", "a.rs", src);
        let method = parsed.symbols.iter().find(|s| s.kind == SymbolKind::Method).unwrap();
        assert_eq!(method.id.name, "Foo.bar");
    }

    #[test]
    fn doc_comment_attached() {
        let src = "/// Adds one.\npub fn inc(x: i32) -> i32 { x + 1 }\n";
        let mut parser = RustParser::new();
        let parsed = parser.parse("proj", "a.rs", src);
        let func = &parsed.symbols[0];
        assert_eq!(func.doc.as_deref(), Some("Adds one."));
    }

    #[test]
    fn use_declaration_recorded() {
        let src = "use std::collections::HashMap;\n";
        let mut parser = RustParser::new();
        let parsed = parser.parse("proj", "a.rs", src);
        assert_eq!(parsed.imports[0].module, "std::collections::HashMap");
    }

    #[test]
    fn refs_out_ignore_comment_contents() {
        let src = "fn foo() {\n  // calls bar()\n  baz();\n}\n";
        let mut parser = RustParser::new();
        let parsed = parser.parse("proj", "a.rs", src);
        let func = &parsed.symbols[0];
        assert!(func.refs_out.contains(&"baz".to_string()));
        assert!(!func.refs_out.contains(&"bar".to_string()));
    }
}
