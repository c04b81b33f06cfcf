//! Wildcard matching against stored report paths

use glob::{MatchOptions, Pattern, PatternError};

/// A shell-style wildcard matched against whole file paths.
///
/// Only `*` and `?` are special. `*` also matches `/`, so paths are treated
/// as flat strings rather than directory trees. Everything else, including
/// `[` and `]`, matches itself.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    glob: Pattern,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let glob = Pattern::new(&translate(pattern))?;

        Ok(Self { glob })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.glob.matches_with(path, MATCH_OPTIONS)
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Rewrite a wildcard into `glob` syntax, escaping literal runs.
///
/// Runs of `*` collapse to a single `*`: `glob` rejects `**` unless it is a
/// whole path component, and it means the same thing here anyway.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut literal = String::new();

    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                if !literal.is_empty() {
                    out.push_str(&Pattern::escape(&literal));
                    literal.clear();
                }
                if !(c == '*' && out.ends_with('*')) {
                    out.push(c);
                }
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        out.push_str(&Pattern::escape(&literal));
    }

    out
}
