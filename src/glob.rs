//! Shell-style glob matching
//!
//! Compiles patterns made of literals, `*` and `?` into anchored regular
//! expressions. There is no globstar or separator handling: `*` is a plain
//! "any run of characters" wildcard, so `https://*.example.com` also matches
//! `https://a.b.example.com`.

use regex::Regex;

/// A compiled glob pattern that matches candidates over their entire length.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    regex: Regex,
}

impl GlobMatcher {
    /// Compile a glob pattern. Every string is a valid pattern.
    pub fn compile(pattern: &str) -> Self {
        let regex = Regex::new(&glob_to_regex(pattern))
            .expect("escaped glob always forms a valid regex");

        Self {
            pattern: pattern.to_string(),
            regex,
        }
    }

    /// Whether `candidate` matches the whole pattern.
    pub fn test(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The source pattern this matcher was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Translate a glob into an anchored regex source string.
///
/// Literal runs are escaped with [`regex::escape`]; `(?s)` lets the
/// wildcards cross newlines the same way they cross `.` and `/`.
pub fn glob_to_regex(glob: &str) -> String {
    let mut source = String::with_capacity(glob.len() + 8);
    source.push_str("(?s)^");

    let mut literal = String::new();
    for ch in glob.chars() {
        match ch {
            '*' | '?' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    source
}
