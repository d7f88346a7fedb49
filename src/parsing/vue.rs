//! Vue single-file component parser (`spec.md` §4.3): treats the `<script>`
//! block as TypeScript/JavaScript, additionally emitting one `component`
//! symbol named after the file and recording `defineProps`/`defineEmits`/
//! composable-call identifiers as references (`refs_out`) on that symbol so
//! the graph builder turns them into `references` edges.

use super::typescript::TypeScriptParser;
use super::{LanguageParser, ParsedFile};
use crate::hashing::hash_body;
use crate::symbol::SymbolRecord;
use crate::types::{Span, SymbolId, SymbolKind};
use regex::Regex;
use std::sync::OnceLock;

fn script_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<script[^>]*>(.*?)</script>").unwrap())
}

fn composable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(use[A-Z]\w*)\s*\(").unwrap())
}

fn define_props_emits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(defineProps|defineEmits)\s*[(<]").unwrap())
}

pub struct VueParser {
    inner: TypeScriptParser,
}

impl VueParser {
    pub fn new() -> Self {
        Self { inner: TypeScriptParser::new() }
    }

    fn component_name(path: &str) -> String {
        std::path::Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Component")
            .to_string()
    }
}

impl Default for VueParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageParser for VueParser {
    fn parse(&mut self, project: &str, path: &str, source: &str) -> ParsedFile {
        let Some(caps) = script_block_re().captures(source) else {
            let mut out = ParsedFile::default();
            out.unhandled_constructs.push("no <script> block".to_string());
            return out;
        };
        let script_match = caps.get(1).unwrap();
        let script_source = script_match.as_str();
        let line_offset = source[..script_match.start()].matches('\n').count() as u32;

        let mut out = self.inner.parse_block(project, path, script_source, line_offset);

        let name = Self::component_name(path);
        let id = SymbolId::new(project, path, SymbolKind::Component, &name);
        let mut refs_out: Vec<String> = composable_re()
            .captures_iter(script_source)
            .map(|c| c[1].to_string())
            .collect();
        refs_out.extend(define_props_emits_re().captures_iter(script_source).map(|c| c[1].to_string()));
        refs_out.sort();
        refs_out.dedup();

        let span = Span::new(1, source.matches('\n').count() as u32 + 1);
        let component = SymbolRecord::new(id, SymbolKind::Component, span, hash_body(source))
            .with_refs_out(refs_out)
            .exported(true);
        out.symbols.push(component);

        out
    }

    fn language(&self) -> super::Language {
        super::Language::Vue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_component_symbol_named_after_file() {
        let src = "<template><div/></template>\n<script setup lang=\"ts\">\nconst x = 1;\n</script>\n";
        let mut parser = VueParser::new();
        let parsed = parser.parse("proj", "UserCard.vue", src);
        assert!(parsed.symbols.iter().any(|s| s.kind == SymbolKind::Component && s.id.name == "UserCard"));
    }

    #[test]
    fn captures_composable_and_define_props_as_refs() {
        let src = "<script setup>\nconst props = defineProps(['id']);\nconst auth = useAuth();\n</script>\n";
        let mut parser = VueParser::new();
        let parsed = parser.parse("proj", "Thing.vue", src);
        let component = parsed.symbols.iter().find(|s| s.kind == SymbolKind::Component).unwrap();
        assert!(component.refs_out.contains(&"defineProps".to_string()));
        assert!(component.refs_out.contains(&"useAuth".to_string()));
    }

    #[test]
    fn delegates_script_block_to_typescript_parser() {
        let src = "<script>\nexport function helper() { return 1; }\n</script>\n";
        let mut parser = VueParser::new();
        let parsed = parser.parse("proj", "a.vue", src);
        assert!(parsed.symbols.iter().any(|s| s.id.name == "helper"));
    }
}
