//! Hostname glob matching.
//!
//! # Responsibilities
//! - Compile hostname patterns once at startup
//! - Match a request host against a pattern
//!
//! # Design Decisions
//! - Matching is case-insensitive (host names are)
//! - `*` matches any run of characters, dots included, so
//!   `*.example.com` also matches `a.b.example.com`
//! - No regex; matching is linear in pattern and host length

use std::fmt;

/// A compiled hostname glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    source: String,
    kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    Exact(String),
    /// Literal segments separated by `*`. The first must prefix the host,
    /// the last must suffix it, the rest appear in order in between.
    Glob(Vec<String>),
}

impl HostPattern {
    /// Compile a pattern. The pattern is normalized to lowercase.
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let normalized = source.to_ascii_lowercase();
        let kind = if normalized.contains('*') {
            PatternKind::Glob(normalized.split('*').map(str::to_string).collect())
        } else {
            PatternKind::Exact(normalized)
        };
        Self { source, kind }
    }

    /// Returns true if `host` (already lowercase) matches this pattern.
    pub fn matches(&self, host: &str) -> bool {
        match &self.kind {
            PatternKind::Exact(expected) => expected == host,
            PatternKind::Glob(parts) => glob_match(parts, host),
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn glob_match(parts: &[String], subject: &str) -> bool {
    // `split('*')` yields at least two parts whenever a `*` is present.
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return false,
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return subject == first,
    };

    if subject.len() < first.len() + last.len()
        || !subject.starts_with(first.as_str())
        || !subject.ends_with(last.as_str())
    {
        return false;
    }

    let mut remaining = &subject[first.len()..subject.len() - last.len()];
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    true
}
