//! API Resolver (`spec.md` §4.5): joins [`RouteDecl`] (backend) and
//! [`CallSite`] (frontend) records by `(method, normalized_path)`.

use crate::file_record::{CallSite, RouteDecl};
use crate::types::{Confidence, Edge, EdgeKind, HttpMethod, SymbolId};

/// One joined API: a route declaration and every call site that reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiJoin {
    pub route: RouteDecl,
    pub callers: Vec<CallSite>,
    pub confidence: Confidence,
}

/// Normalizes a path for the join: lowercases the method (handled via
/// [`HttpMethod`] already being a closed enum), collapses `{param}`,
/// `:param`, and `${...}` placeholders to a single sentinel `*`, and strips
/// trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if let Some(end) = path[i..].find('}') {
                    out.push('*');
                    i += end + 1;
                    continue;
                }
            }
            b':' => {
                let rest = &path[i + 1..];
                let end = rest.find('/').unwrap_or(rest.len());
                if end > 0 {
                    out.push('*');
                    i += 1 + end;
                    continue;
                }
            }
            b'$' if path[i..].starts_with("${") => {
                if let Some(end) = path[i..].find('}') {
                    out.push('*');
                    i += end + 1;
                    continue;
                }
            }
            _ => {}
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

fn had_placeholder(path: &str) -> bool {
    path.contains('{') || path.contains(':') || path.contains("${")
}

/// Joins every route against every call site, producing one [`ApiJoin`] per
/// route (with zero or more callers) plus the `routes_to` edges the graph
/// should carry.
pub fn resolve_apis(routes: &[RouteDecl], calls: &[CallSite]) -> (Vec<ApiJoin>, Vec<Edge>) {
    let mut joins = Vec::with_capacity(routes.len());
    let mut edges = Vec::new();

    for route in routes {
        let normalized_route = normalize_path(&route.path_pattern);
        let mut callers = Vec::new();
        let mut join_confidence: Option<Confidence> = None;

        for call in calls {
            if call.method != route.method {
                continue;
            }
            let normalized_call = normalize_path(&call.url_literal);
            if normalized_call != normalized_route {
                continue;
            }
            let exact = call.url_literal == route.path_pattern
                && !had_placeholder(&route.path_pattern)
                && !had_placeholder(&call.url_literal);
            let confidence = if exact { Confidence::Likely } else { Confidence::Heuristic };
            callers.push(call.clone());
            join_confidence = Some(match join_confidence {
                Some(existing) if existing > confidence => existing,
                _ => confidence,
            });

            if let Some(symbol) = &call.containing_symbol {
                edges.push(Edge::new(symbol.clone(), route.handler_symbol_id.clone(), EdgeKind::RoutesTo, confidence));
            }
        }

        if let Some(confidence) = join_confidence {
            joins.push(ApiJoin { route: route.clone(), callers, confidence });
        }
    }

    (joins, edges)
}

/// Infers the HTTP method a route's literal call would need for the exact
/// (non-placeholder) upgrade in [`resolve_apis`]; kept separate so callers
/// constructing ad-hoc [`CallSite`]s can reuse the same parsing the
/// TypeScript parser uses.
pub fn method_matches(a: HttpMethod, b: HttpMethod) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Framework, SymbolKind};

    fn handler() -> SymbolId {
        SymbolId::new("backend", "routes.py", SymbolKind::Function, "get_user")
    }

    fn caller() -> SymbolId {
        SymbolId::new("frontend", "api.ts", SymbolKind::Function, "loadUser")
    }

    #[test]
    fn collapses_curly_brace_placeholder() {
        assert_eq!(normalize_path("/api/users/{id}"), "/api/users/*");
    }

    #[test]
    fn collapses_colon_placeholder() {
        assert_eq!(normalize_path("/api/users/:id"), "/api/users/*");
    }

    #[test]
    fn collapses_template_placeholder() {
        assert_eq!(normalize_path("/api/users/${id}"), "/api/users/*");
    }

    #[test]
    fn strips_trailing_slash() {
        assert_eq!(normalize_path("/api/users/"), "/api/users");
    }

    #[test]
    fn cross_language_join_is_heuristic_after_placeholder_collapse() {
        let route = RouteDecl {
            method: HttpMethod::Get,
            path_pattern: "/api/users/{id}".to_string(),
            handler_symbol_id: handler(),
            framework: Framework::FastApi,
        };
        let call = CallSite {
            method: HttpMethod::Get,
            url_literal: "/api/users/42".to_string(),
            file: "api.ts".to_string(),
            line: 3,
            containing_symbol: Some(caller()),
        };
        let (joins, edges) = resolve_apis(&[route], &[call]);
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].confidence, Confidence::Heuristic);
        assert_eq!(edges[0].kind, EdgeKind::RoutesTo);
    }

    #[test]
    fn exact_literal_match_without_placeholders_is_likely() {
        let route = RouteDecl {
            method: HttpMethod::Get,
            path_pattern: "/health".to_string(),
            handler_symbol_id: handler(),
            framework: Framework::FastApi,
        };
        let call = CallSite {
            method: HttpMethod::Get,
            url_literal: "/health".to_string(),
            file: "api.ts".to_string(),
            line: 1,
            containing_symbol: Some(caller()),
        };
        let (joins, _) = resolve_apis(&[route], &[call]);
        assert_eq!(joins[0].confidence, Confidence::Likely);
    }

    #[test]
    fn mismatched_method_does_not_join() {
        let route = RouteDecl {
            method: HttpMethod::Post,
            path_pattern: "/health".to_string(),
            handler_symbol_id: handler(),
            framework: Framework::FastApi,
        };
        let call = CallSite {
            method: HttpMethod::Get,
            url_literal: "/health".to_string(),
            file: "api.ts".to_string(),
            line: 1,
            containing_symbol: None,
        };
        let (joins, _) = resolve_apis(&[route], &[call]);
        assert!(joins.is_empty());
    }
}
