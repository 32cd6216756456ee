//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for a path: exact key first, then patterns in
//!   declaration order
//! - Produce the fetch target, optionally with `{path}` substituted
//!
//! # Design Decisions
//! - Immutable after construction (compiled once per configuration)
//! - O(1) exact lookup via HashMap, O(n) ordered pattern scan
//! - First-declared pattern wins on ambiguity
//! - Explicit `None` rather than a silent default

use std::collections::HashMap;

use crate::config::schema::{Route, RouteTable};
use crate::routing::matcher::WildcardPattern;

/// Placeholder recognised in route targets when templating is enabled.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// How a route was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Pattern,
}

/// A route selected for a request path.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub kind: MatchKind,
    /// Text matched by the first `*` (pattern matches only).
    pub capture: Option<&'a str>,
}

impl RouteMatch<'_> {
    /// The fetch target for this match.
    ///
    /// Without templating the route's `file` is used literally. With
    /// templating, `{path}` becomes the wildcard capture, or the request
    /// path without its leading `/` for exact routes.
    pub fn target(&self, request_path: &str, templating: bool) -> String {
        if !templating || !self.route.file.contains(PATH_PLACEHOLDER) {
            return self.route.file.clone();
        }
        let value = match (self.kind, self.capture) {
            (MatchKind::Pattern, Some(capture)) => capture,
            _ => request_path.trim_start_matches('/'),
        };
        self.route.file.replace(PATH_PLACEHOLDER, value)
    }
}

/// Compiled route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
    exact: HashMap<String, usize>,
    patterns: Vec<(usize, WildcardPattern)>,
}

impl Router {
    /// Compile a route table. Patterns that fail to compile are skipped.
    pub fn from_table(table: &RouteTable) -> Self {
        let routes: Vec<Route> = table.iter().cloned().collect();
        let mut exact = HashMap::new();
        let mut patterns = Vec::new();

        for (index, route) in routes.iter().enumerate() {
            exact.insert(route.pattern.clone(), index);
            match WildcardPattern::new(route.pattern.as_str()) {
                Ok(pattern) => patterns.push((index, pattern)),
                Err(e) => {
                    tracing::warn!(pattern = %route.pattern, error = %e, "Skipping uncompilable route pattern");
                }
            }
        }

        Self { routes, exact, patterns }
    }

    /// Find the route for a path.
    pub fn match_path<'a>(&'a self, path: &'a str) -> Option<RouteMatch<'a>> {
        if let Some(&index) = self.exact.get(path) {
            return Some(RouteMatch {
                route: &self.routes[index],
                kind: MatchKind::Exact,
                capture: None,
            });
        }

        self.patterns
            .iter()
            .find(|(_, pattern)| pattern.matches(path))
            .map(|(index, pattern)| RouteMatch {
                route: &self.routes[*index],
                kind: MatchKind::Pattern,
                capture: pattern.first_capture(path),
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
