//! Wildcard matching for policy patterns
//!
//! Patterns support `*` (any run of characters), `?` (exactly one character)
//! and `/regex/` (a full-match regular expression). Anything else is an exact
//! string comparison.

use crate::error::ConfigError;
use regex::Regex;
use std::collections::BTreeSet;

/// Returns true if `pattern` is not a plain literal.
pub fn contains_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || is_regex(pattern)
}

fn is_regex(pattern: &str) -> bool {
    pattern.len() > 1 && pattern.starts_with('/') && pattern.ends_with('/')
}

/// A single compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Option<Regex>,
}

impl WildcardPattern {
    /// Compile a wildcard pattern
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex = if is_regex(pattern) {
            let inner = &pattern[1..pattern.len() - 1];
            Some(compile(pattern, &format!("^(?:{inner})$"))?)
        } else if contains_wildcard(pattern) {
            Some(compile(pattern, &glob_to_regex(pattern))?)
        } else {
            None
        };

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check if a candidate matches this pattern
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(candidate),
            None => self.source == candidate,
        }
    }

    /// Collect every candidate that matches this pattern
    pub fn matching<'a, I>(&self, candidates: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates
            .into_iter()
            .filter(|c| self.matches(c))
            .cloned()
            .collect()
    }

    /// The pattern as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn has_wildcard(&self) -> bool {
        self.regex.is_some()
    }
}

fn compile(pattern: &str, expression: &str) -> Result<Regex, ConfigError> {
    Regex::new(expression).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

/// Compiled list of wildcard patterns
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<WildcardPattern>,
}

impl PatternMatcher {
    /// Create a new pattern matcher from a list of wildcard patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| WildcardPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Create an empty pattern matcher (matches nothing)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if a candidate matches any pattern
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(candidate))
    }

    /// Check if any of the candidates matches any pattern
    pub fn matches_any<I, S>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates.into_iter().any(|c| self.matches(c.as_ref()))
    }

    /// Check if a candidate matches any pattern, returning the matching pattern
    pub fn find_match(&self, candidate: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.matches(candidate))
            .map(WildcardPattern::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case("starfleet", false)]
    #[case("star*", true)]
    #[case("sh?ps", true)]
    #[case("/sf.+/", true)]
    #[case("/", false)]
    fn test_contains_wildcard(#[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(contains_wildcard(pattern), expected);
    }

    #[rstest]
    #[case("indices:*", "indices:data/read/search", true)]
    #[case("indices:data/write*", "indices:data/write/index", true)]
    #[case("indices:data/write*", "indices:data/read/get", false)]
    #[case("indices:admin/delete", "indices:admin/delete", true)]
    #[case("indices:admin/delete", "indices:admin/delete/extra", false)]
    #[case("pub*", "public", true)]
    #[case("pub*", "republic", false)]
    #[case("ship?", "ships", true)]
    #[case("ship?", "ship", false)]
    #[case("*", "_all", true)]
    #[case("a.b", "axb", false)]
    #[case("/sf(_[a-z]+)?/", "sf_academy", true)]
    #[case("/sf(_[a-z]+)?/", "xsf", false)]
    fn test_pattern_matches(#[case] pattern: &str, #[case] candidate: &str, #[case] expected: bool) {
        let compiled = WildcardPattern::new(pattern).unwrap();
        assert_eq!(compiled.matches(candidate), expected, "{pattern} vs {candidate}");
    }

    #[test]
    fn test_matching_subset() {
        let pattern = WildcardPattern::new("star*").unwrap();
        let candidates = set(&["starfleet", "starbase", "public"]);
        assert_eq!(
            pattern.matching(&candidates),
            set(&["starbase", "starfleet"])
        );
    }

    #[test]
    fn test_literal_pattern_has_no_wildcard() {
        let pattern = WildcardPattern::new("starfleet").unwrap();
        assert!(!pattern.has_wildcard());
        assert_eq!(pattern.as_str(), "starfleet");
    }

    #[test]
    fn test_invalid_regex_pattern() {
        let result = WildcardPattern::new("/[invalid/");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = PatternMatcher::empty();
        assert!(!matcher.matches("anything"));
        assert!(matcher.is_empty());
    }

    #[test]
    fn test_matcher_any_and_find() {
        let matcher = PatternMatcher::new(&["indices:data/write*", "indices:admin/close"]).unwrap();
        assert_eq!(matcher.len(), 2);
        assert!(matcher.matches("indices:admin/close"));
        assert_eq!(
            matcher.find_match("indices:data/write/bulk"),
            Some("indices:data/write*")
        );
        assert_eq!(matcher.find_match("indices:admin/upgrade"), None);
        assert!(matcher.matches_any(["nope", "indices:data/write/index"]));
        assert!(!matcher.matches_any(Vec::<String>::new()));
    }
}
