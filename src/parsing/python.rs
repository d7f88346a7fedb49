//! Python parser (`spec.md` §4.3): AST-driven via `tree-sitter-python`.
//! Extracts module-level and nested functions, classes, methods (including
//! decorated FastAPI/Flask/Starlette routes), and `import`/`from ... import`
//! statements.

use super::{identifier_sweep, strip_comments_and_strings, LanguageParser, ParsedFile, PY_COMMENTS};
use crate::file_record::{Framework, ImportDecl, RouteDecl};
use crate::hashing::hash_body;
use crate::symbol::SymbolRecord;
use crate::types::{HttpMethod, Span, SymbolId, SymbolKind};
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

const RESERVED: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield", "self",
    "None", "True", "False",
];

const ROUTE_DECORATOR_METHODS: &[(&str, HttpMethod)] = &[
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("patch", HttpMethod::Patch),
    ("delete", HttpMethod::Delete),
    ("head", HttpMethod::Head),
    ("options", HttpMethod::Options),
];

pub struct PythonParser {
    parser: Parser,
    reserved: HashSet<&'static str>,
}

impl PythonParser {
    pub fn new() -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("tree-sitter-python grammar ABI matches tree-sitter");
        Self { parser, reserved: RESERVED.iter().copied().collect() }
    }

    fn walk(
        &self,
        node: Node,
        code: &str,
        project: &str,
        path: &str,
        out: &mut ParsedFile,
        owner: Option<&str>,
    ) {
        match node.kind() {
            "function_definition" => {
                let Some(name_node) = node.child_by_field_name("name") else { return };
                let name = text(code, name_node);
                let is_method = owner.is_some();
                let id = if is_method {
                    SymbolId::method(project, path, owner.unwrap(), name)
                } else {
                    SymbolId::new(project, path, SymbolKind::Function, name)
                };
                let decorators = collect_decorators(code, node);
                let routes = routes_from_decorators(project, path, &id, &decorators);
                out.routes.extend(routes);

                let record = self.record(
                    id,
                    if is_method { SymbolKind::Method } else { SymbolKind::Function },
                    node,
                    code,
                    decorators,
                    !name.starts_with('_'),
                );
                out.symbols.push(record);

                // Nested functions: walk the body under the function's own name
                // as the enclosing symbol for call-site attribution, but this
                // parser treats nested defs as independent module symbols like
                // the reference codebase, since Python has no block scoping
                // for identity purposes here.
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.walk(child, code, project, path, out, owner);
                    }
                }
            }
            "class_definition" => {
                let Some(name_node) = node.child_by_field_name("name") else { return };
                let name = text(code, name_node);
                let id = SymbolId::new(project, path, SymbolKind::Class, name);
                let decorators = collect_decorators(code, node);
                out.symbols.push(self.record(id, SymbolKind::Class, node, code, decorators, !name.starts_with('_')));
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        self.walk(child, code, project, path, out, Some(name));
                    }
                }
            }
            "import_statement" => collect_import(code, node, out),
            "import_from_statement" => collect_import_from(code, node, out),
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.walk(child, code, project, path, out, owner);
                }
            }
        }
    }

    fn record(
        &self,
        id: SymbolId,
        kind: SymbolKind,
        node: Node,
        code: &str,
        decorators: Vec<String>,
        exports: bool,
    ) -> SymbolRecord {
        let span = Span::new(node.start_position().row as u32 + 1, node.end_position().row as u32 + 1);
        let body_text = text(code, node);
        let body_hash = hash_body(body_text);
        let stripped = strip_comments_and_strings(body_text, PY_COMMENTS);
        let refs_out = identifier_sweep(&stripped, &self.reserved);
        let doc = docstring(code, node);

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

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for PythonParser {
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
        super::Language::Python
    }
}

fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}

fn collect_decorators(code: &str, node: Node) -> Vec<String> {
    let mut decorators = Vec::new();
    let Some(parent) = node.parent() else { return decorators };
    if parent.kind() != "decorated_definition" {
        return decorators;
    }
    let mut cursor = parent.walk();
    for child in parent.children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(text(code, child).trim_start_matches('@').to_string());
        }
    }
    decorators
}

/// `@app.get("/path")`, `@router.post("/path")`, `@app.route("/path",
/// methods=["GET"])` (`spec.md` §4.3).
fn routes_from_decorators(
    project: &str,
    path: &str,
    handler: &SymbolId,
    decorators: &[String],
) -> Vec<RouteDecl> {
    let mut routes = Vec::new();
    for decorator in decorators {
        let Some((receiver_call, arg)) = decorator.split_once('(') else { continue };
        let Some(literal) = first_string_literal(arg) else { continue };
        let Some((_receiver, method_name)) = receiver_call.rsplit_once('.') else { continue };

        if method_name == "route" {
            let methods = extract_methods_kwarg(arg);
            if methods.is_empty() {
                routes.push(route(project, path, handler, HttpMethod::Get, &literal, Framework::Flask));
            } else {
                for m in methods {
                    routes.push(route(project, path, handler, HttpMethod::parse(&m), &literal, Framework::Flask));
                }
            }
            continue;
        }
        if let Some((_, http_method)) = ROUTE_DECORATOR_METHODS.iter().find(|(m, _)| *m == method_name) {
            routes.push(route(project, path, handler, *http_method, &literal, Framework::FastApi));
        }
    }
    routes
}

fn route(project: &str, path: &str, handler: &SymbolId, method: HttpMethod, pattern: &str, framework: Framework) -> RouteDecl {
    let _ = (project, path);
    RouteDecl {
        method,
        path_pattern: pattern.to_string(),
        handler_symbol_id: handler.clone(),
        framework,
    }
}

fn first_string_literal(args: &str) -> Option<String> {
    let bytes = args.as_bytes();
    let start = bytes.iter().position(|&b| b == b'"' || b == b'\'')?;
    let quote = bytes[start];
    let rest = &args[start + 1..];
    let end = rest.find(quote as char)?;
    Some(rest[..end].to_string())
}

fn extract_methods_kwarg(args: &str) -> Vec<String> {
    let Some(idx) = args.find("methods") else { return Vec::new() };
    let Some(bracket_start) = args[idx..].find('[') else { return Vec::new() };
    let abs_start = idx + bracket_start;
    let Some(bracket_end) = args[abs_start..].find(']') else { return Vec::new() };
    let inner = &args[abs_start + 1..abs_start + bracket_end];
    inner
        .split(',')
        .filter_map(|s| first_string_literal(s.trim()))
        .collect()
}

fn docstring(code: &str, node: Node) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first_stmt = body.child(0)?;
    if first_stmt.kind() != "expression_statement" {
        return None;
    }
    let expr = first_stmt.child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let raw = text(code, expr);
    let trimmed = raw
        .trim_matches('"')
        .trim_matches('\'')
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn collect_import(code: &str, node: Node, out: &mut ParsedFile) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => out.imports.push(ImportDecl { module: text(code, child).to_string(), alias: None }),
            "aliased_import" => {
                let Some(name_node) = child.child(0) else { continue };
                let Some(alias_node) = child.child_by_field_name("alias") else { continue };
                out.imports.push(ImportDecl {
                    module: text(code, name_node).to_string(),
                    alias: Some(text(code, alias_node).to_string()),
                });
            }
            _ => {}
        }
    }
}

fn collect_import_from(code: &str, node: Node, out: &mut ParsedFile) {
    let Some(module_node) = node.child_by_field_name("module_name") else { return };
    let module = text(code, module_node).to_string();
    let mut cursor = node.walk();
    let mut found_name = false;
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" | "identifier" if found_name => {
                out.imports.push(ImportDecl { module: format!("{module}.{}", text(code, child)), alias: None });
            }
            "aliased_import" => {
                let Some(name_node) = child.child(0) else { continue };
                let Some(alias_node) = child.child_by_field_name("alias") else { continue };
                out.imports.push(ImportDecl {
                    module: format!("{module}.{}", text(code, name_node)),
                    alias: Some(text(code, alias_node).to_string()),
                });
            }
            "wildcard_import" => {
                out.imports.push(ImportDecl { module: format!("{module}.*"), alias: None });
            }
            "import" => found_name = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_module_function() {
        let src = "def foo():\n    pass\n";
        let mut parser = PythonParser::new();
        let parsed = parser.parse("proj", "a.py", src);
        assert_eq!(parsed.symbols[0].id.name, "foo");
        assert_eq!(parsed.symbols[0].kind, SymbolKind::Function);
    }

    #[test]
    fn method_id_includes_class() {
        let src = "class Foo:\n    def bar(self):\n        pass\n";
        let mut parser = PythonParser::new();
        let parsed = parser.parse("proj", "a.py", src);
        let method = parsed.symbols.iter().find(|s| s.kind == SymbolKind::Method).unwrap();
        assert_eq!(method.id.name, "Foo.bar");
    }

    #[test]
    fn fastapi_get_route_extracted() {
        let src = "@app.get(\"/api/users/{id}\")\ndef get_user(id):\n    pass\n";
        let mut parser = PythonParser::new();
        let parsed = parser.parse("proj", "a.py", src);
        assert_eq!(parsed.routes.len(), 1);
        assert_eq!(parsed.routes[0].method, HttpMethod::Get);
        assert_eq!(parsed.routes[0].path_pattern, "/api/users/{id}");
        assert_eq!(parsed.routes[0].framework, Framework::FastApi);
    }

    #[test]
    fn flask_route_with_methods_kwarg() {
        let src = "@app.route(\"/x\", methods=[\"POST\", \"GET\"])\ndef h():\n    pass\n";
        let mut parser = PythonParser::new();
        let parsed = parser.parse("proj", "a.py", src);
        assert_eq!(parsed.routes.len(), 2);
        assert!(parsed.routes.iter().all(|r| r.framework == Framework::Flask));
    }

    #[test]
    fn from_import_with_alias() {
        let src = "from a import foo as bar\n";
        let mut parser = PythonParser::new();
        let parsed = parser.parse("proj", "a.py", src);
        assert_eq!(parsed.imports[0].module, "a.foo");
        assert_eq!(parsed.imports[0].alias.as_deref(), Some("bar"));
    }

    #[test]
    fn docstring_is_doc() {
        let src = "def foo():\n    \"\"\"Does a thing.\"\"\"\n    pass\n";
        let mut parser = PythonParser::new();
        let parsed = parser.parse("proj", "a.py", src);
        assert_eq!(parsed.symbols[0].doc.as_deref(), Some("Does a thing."));
    }
}
