//! Glob-style key patterns for scan-based invalidation.
//!
//! Supports `*` (any run of characters, including none) and `?` (exactly
//! one character). Everything else matches literally. The literal text up
//! to the first wildcard is kept separately so ordered tiers can seek
//! straight to the candidate range instead of walking every key.

use assoc_core::StorageError;
use regex::Regex;
use std::fmt;

/// A compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    glob: String,
    prefix: String,
    matcher: Regex,
}

impl KeyPattern {
    /// Compile a glob pattern.
    pub fn new(glob: impl Into<String>) -> Result<Self, StorageError> {
        let glob = glob.into();
        let prefix: String = glob.chars().take_while(|c| *c != '*' && *c != '?').collect();

        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push('^');
        let mut literal = String::new();
        for c in glob.chars() {
            match c {
                '*' | '?' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str(if c == '*' { ".*" } else { "." });
                }
                _ => literal.push(c),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let matcher = Regex::new(&expr)
            .map_err(|e| StorageError::cache(format!("bad key pattern {glob:?}: {e}")))?;
        Ok(Self {
            glob,
            prefix,
            matcher,
        })
    }

    /// Whether `key` matches the whole pattern.
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.prefix) && self.matcher.is_match(key)
    }

    /// Literal text every matching key starts with.
    pub fn literal_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glob)
    }
}
