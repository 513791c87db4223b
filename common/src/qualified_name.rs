//! Package-qualified names such as `com.google.common`.
//!
//! JVM names appear in two spellings: dotted (`com.google.common.Foo`) in
//! source-level text and service files, and internal (`com/google/common/Foo`)
//! inside class files and archive paths. [`QualifiedName`] stores the segments
//! once and renders either spelling.

use crate::error::{CoordinateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that terminate or break a name segment.
const FORBIDDEN: &[char] = &[';', '[', ']', '<', '>', '(', ')', ':', '\\', '*'];

/// A dot-delimited package or class name.
///
/// # Examples
///
/// ```
/// use jarshade_common::QualifiedName;
///
/// let name = QualifiedName::parse("com.google.common").expect("valid name");
/// assert_eq!(name.segments(), &["com", "google", "common"]);
/// assert_eq!(name.internal(), "com/google/common");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    segments: Vec<String>,
}

impl QualifiedName {
    /// Parse a dotted name.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidQualifiedName`] for empty names,
    /// empty segments, whitespace, or descriptor punctuation.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| CoordinateError::InvalidQualifiedName {
            value: raw.to_owned(),
            reason: reason.to_owned(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if trimmed.contains('/') {
            return Err(invalid("unexpected separator '/'"));
        }
        let segments: Vec<String> = trimmed.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid("empty segment"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || FORBIDDEN.contains(c))
        {
            return Err(invalid(&format!("unexpected character '{bad}'")));
        }
        Ok(Self { segments })
    }

    /// Returns the name segments as a slice.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Render with `.` separators.
    #[must_use]
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Render with `/` separators, as used in class files and archive paths.
    #[must_use]
    pub fn internal(&self) -> String {
        self.segments.join("/")
    }

    /// Returns `true` when `self` equals `other` or is a whole-segment prefix
    /// of it. `com.google` covers `com.google.common` but not `com.googlex`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Returns the segments of `other` that follow `self`, when `self`
    /// covers `other`.
    #[must_use]
    pub fn suffix_of<'a>(&self, other: &'a Self) -> Option<&'a [String]> {
        if self.covers(other) {
            other.segments.get(self.segments.len()..)
        } else {
            None
        }
    }

    /// Returns `true` when either name covers the other.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.covers(other) || other.covers(self)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<QualifiedName> for String {
    fn from(value: QualifiedName) -> Self {
        value.dotted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn name(raw: &str) -> QualifiedName {
        QualifiedName::parse(raw).expect("valid name")
    }

    #[rstest]
    #[case("com.google", "com.google", true)]
    #[case("com.google", "com.google.common", true)]
    #[case("com.google", "com.googlex", false)]
    #[case("com.google.common", "com.google", false)]
    fn covers_whole_segments_only(#[case] prefix: &str, #[case] other: &str, #[case] expected: bool) {
        assert_eq!(name(prefix).covers(&name(other)), expected);
    }

    #[test]
    fn suffix_of_returns_trailing_segments() {
        let prefix = name("org.apache");
        let full = name("org.apache.commons.lang3");
        assert_eq!(
            prefix.suffix_of(&full),
            Some(&["commons".to_owned(), "lang3".to_owned()][..])
        );
        assert_eq!(full.suffix_of(&prefix), None);
    }

    #[rstest]
    #[case("")]
    #[case("com..google")]
    #[case(".com")]
    #[case("com.google/common")]
    #[case("com.goo gle")]
    #[case("Lcom.google;")]
    fn rejects_malformed_names(#[case] raw: &str) {
        assert!(QualifiedName::parse(raw).is_err());
    }

    #[test]
    fn overlaps_is_symmetric() {
        assert!(name("a.b").overlaps(&name("a.b.c")));
        assert!(name("a.b.c").overlaps(&name("a.b")));
        assert!(!name("a.b").overlaps(&name("a.c")));
    }
}
