//! Route matching logic.
//!
//! # Responsibilities
//! - Match a request path against a literal prefix (case-sensitive)
//! - Rewrite the matched path by stripping a literal prefix
//!
//! # Design Decisions
//! - No regex: prefixes are literal, so matching is a single `starts_with`
//! - The strip rule is independent of the match prefix (match `/api/ocr`,
//!   strip only `/api`)

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if `path` starts with this prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Path rewrite applied to matched requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRewrite {
    /// Forward the path unchanged.
    Keep,
    /// Remove this literal prefix.
    Strip(String),
}

impl PathRewrite {
    pub fn from_strip(strip: Option<&str>) -> Self {
        match strip {
            Some(strip) if !strip.is_empty() => PathRewrite::Strip(strip.to_string()),
            _ => PathRewrite::Keep,
        }
    }

    /// Apply the rewrite. The result always starts with `/`.
    pub fn apply<'a>(&self, path: &'a str) -> std::borrow::Cow<'a, str> {
        use std::borrow::Cow;

        let rewritten = match self {
            PathRewrite::Keep => path,
            PathRewrite::Strip(strip) => path.strip_prefix(strip.as_str()).unwrap_or(path),
        };

        if rewritten.starts_with('/') {
            Cow::Borrowed(rewritten)
        } else {
            Cow::Owned(format!("/{}", rewritten))
        }
    }
}
