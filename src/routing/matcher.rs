//! Wildcard pattern matching.
//!
//! # Responsibilities
//! - Compile `*` wildcard patterns to anchored regexes
//! - Expose the text captured by each wildcard
//!
//! # Design Decisions
//! - Every regex metacharacter in the pattern is escaped before `*` is
//!   expanded, so `.`, `+`, `(` and friends match literally
//! - `*` matches any sequence, including `/` and the empty string
//! - Patterns compile once per configuration, never per request

use regex::Regex;

/// A compiled wildcard pattern such as `/api/*` or `/assets/*.json`.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    /// Compile a wildcard pattern.
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let source = pattern.into();
        let body = source
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("(.*)");
        let regex = Regex::new(&format!("^{}$", body))?;
        Ok(Self { source, regex })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the whole path matches.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Text matched by the first wildcard, if the path matches and the
    /// pattern has one.
    pub fn first_capture<'p>(&self, path: &'p str) -> Option<&'p str> {
        self.regex
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// A list of patterns where any match counts.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<WildcardPattern>,
}

impl PatternSet {
    /// Compile every pattern; invalid ones are logged and dropped.
    pub fn compile(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match WildcardPattern::new(p.as_str()) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "Ignoring uncompilable pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// An empty set accepts everything.
    pub fn accepts(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
