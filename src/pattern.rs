//! Compiled `LIKE` patterns.
//!
//! Patterns whose only wildcards are a leading and/or trailing `%` are
//! matched with plain string operations. Everything else is translated to a
//! regex once and kept in a process-wide cache, since the row interpreter
//! evaluates the same pattern for every changed row.
//!
//! Matching is case-insensitive.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;

const MAX_CACHED_PATTERNS: usize = 1024;

static PATTERNS: LazyLock<RwLock<HashMap<String, LikePattern>>> = LazyLock::new(|| RwLock::new(HashMap::new()));

#[derive(Debug, Clone)]
pub enum LikePattern {
    /// `%`
    MatchAll,
    /// `rent`
    Exact(String),
    /// `rent%`
    Prefix(String),
    /// `%rent`
    Suffix(String),
    /// `%rent%`
    Contains(String),
    /// Anything with `_` or an inner `%`
    Regex(Regex),
}

impl LikePattern {
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        if !pattern.is_empty() && pattern.chars().all(|c| c == '%') {
            return Ok(LikePattern::MatchAll);
        }

        let leading = pattern.starts_with('%');
        let trailing = pattern.len() > 1 && pattern.ends_with('%');
        let start = usize::from(leading);
        let end = pattern.len() - usize::from(trailing);
        let inner = &pattern[start..end.max(start)];

        if !inner.contains(['%', '_']) {
            let inner = inner.to_lowercase();
            return Ok(match (leading, trailing) {
                (false, false) => LikePattern::Exact(inner),
                (false, true) => LikePattern::Prefix(inner),
                (true, false) => LikePattern::Suffix(inner),
                (true, true) => LikePattern::Contains(inner),
            });
        }

        let mut re = String::from("(?is)^");
        for ch in pattern.chars() {
            match ch {
                '%' => re.push_str(".*"),
                '_' => re.push('.'),
                c => re.push_str(&regex::escape(&c.to_string())),
            }
        }
        re.push('$');
        Ok(LikePattern::Regex(Regex::new(&re)?))
    }

    /// Cached [`LikePattern::compile`].
    pub fn cached(pattern: &str) -> Result<Self, regex::Error> {
        if let Some(compiled) = PATTERNS
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
        {
            return Ok(compiled.clone());
        }

        let compiled = LikePattern::compile(pattern)?;
        let mut cache = PATTERNS.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() >= MAX_CACHED_PATTERNS {
            cache.clear();
        }
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            LikePattern::MatchAll => true,
            LikePattern::Regex(re) => re.is_match(text),
            LikePattern::Exact(s) => text.to_lowercase() == *s,
            LikePattern::Prefix(p) => text.to_lowercase().starts_with(p.as_str()),
            LikePattern::Suffix(s) => text.to_lowercase().ends_with(s.as_str()),
            LikePattern::Contains(c) => text.to_lowercase().contains(c.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn like(text: &str, pattern: &str) -> bool {
        LikePattern::compile(pattern).unwrap().matches(text)
    }

    #[test]
    fn test_simple_patterns_skip_regex() {
        assert!(matches!(LikePattern::compile("%").unwrap(), LikePattern::MatchAll));
        assert!(matches!(LikePattern::compile("Rent").unwrap(), LikePattern::Exact(s) if s == "rent"));
        assert!(matches!(LikePattern::compile("co%").unwrap(), LikePattern::Prefix(_)));
        assert!(matches!(LikePattern::compile("%co").unwrap(), LikePattern::Suffix(_)));
        assert!(matches!(LikePattern::compile("%mart%").unwrap(), LikePattern::Contains(_)));
        assert!(matches!(LikePattern::compile("a_c").unwrap(), LikePattern::Regex(_)));
        assert!(matches!(LikePattern::compile("a%c").unwrap(), LikePattern::Regex(_)));
    }

    #[test]
    fn test_matching() {
        assert!(like("Walmart Store", "%MART%"));
        assert!(like("Coffee", "co%"));
        assert!(!like("Decaf Coffee", "co%"));
        assert!(like("Decaf Coffee", "%ffee"));
        assert!(like("RENT", "rent"));
        assert!(!like("rental", "rent"));
        assert!(like("", ""));
        assert!(like("anything", "%%"));
        assert!(like("abc", "a%c"));
        assert!(!like("abd", "a%c"));
    }

    #[test]
    fn test_cached_pattern_is_reused() {
        let first = LikePattern::cached("%groceries%").unwrap();
        let second = LikePattern::cached("%groceries%").unwrap();
        assert!(first.matches("Weekly groceries") && second.matches("GROCERIES"));
    }
}
