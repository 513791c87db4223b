//! Glob patterns over coordinates and archive entry paths.
//!
//! Coordinate patterns take the form `group:name[:version]` where each part
//! is a glob (`org.slf4j:*`, `*:slf4j-api`). The single token `*` matches
//! every module. Entry patterns are path globs where `*` stops at `/` and
//! `**` spans directories (`org/slf4j/**`, `META-INF/*.SF`).

use glob::{MatchOptions, Pattern};
use jarshade_common::{Coordinate, ModuleId};
use std::fmt;
use thiserror::Error;

/// Error raised for malformed patterns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pattern \"{pattern}\": {reason}")]
pub struct PatternError {
    /// The rejected pattern text.
    pub pattern: String,
    /// Description of the parse failure.
    pub reason: String,
}

const ENTRY_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn compile(whole: &str, part: &str) -> Result<Pattern, PatternError> {
    if part.is_empty() {
        return Err(PatternError {
            pattern: whole.to_owned(),
            reason: "empty pattern segment".to_owned(),
        });
    }
    Pattern::new(part).map_err(|err| PatternError {
        pattern: whole.to_owned(),
        reason: err.msg.to_owned(),
    })
}

/// A glob over `group:name[:version]`.
///
/// # Examples
///
/// ```
/// use jarshade::pattern::CoordinatePattern;
/// use jarshade_common::ModuleId;
///
/// let pattern = CoordinatePattern::parse("org.slf4j:*").expect("valid pattern");
/// let id = ModuleId::parse("org.slf4j:slf4j-api").expect("valid id");
/// assert!(pattern.matches_module(&id));
/// ```
#[derive(Debug, Clone)]
pub struct CoordinatePattern {
    raw: String,
    group: Pattern,
    name: Pattern,
    version: Option<Pattern>,
}

impl CoordinatePattern {
    /// Parse a coordinate pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for the wrong number of parts, empty parts,
    /// or invalid glob syntax.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim();
        if trimmed == "*" {
            return Self::parse("*:*");
        }
        let parts: Vec<&str> = trimmed.split(':').collect();
        let (group, name, version) = match parts.as_slice() {
            [group, name] => (*group, *name, None),
            [group, name, version] => (*group, *name, Some(*version)),
            _ => {
                return Err(PatternError {
                    pattern: raw.to_owned(),
                    reason: "expected group:name or group:name:version".to_owned(),
                });
            }
        };
        Ok(Self {
            raw: trimmed.to_owned(),
            group: compile(raw, group)?,
            name: compile(raw, name)?,
            version: version.map(|v| compile(raw, v)).transpose()?,
        })
    }

    /// Returns `true` when the pattern matches the module regardless of
    /// version. A version-qualified pattern never matches a bare module.
    #[must_use]
    pub fn matches_module(&self, module: &ModuleId) -> bool {
        self.version.is_none() && self.matches_parts(module)
    }

    /// Returns `true` when the pattern matches the coordinate.
    #[must_use]
    pub fn matches(&self, coordinate: &Coordinate) -> bool {
        self.matches_parts(coordinate.module())
            && self
                .version
                .as_ref()
                .is_none_or(|version| version.matches(coordinate.version().as_str()))
    }

    fn matches_parts(&self, module: &ModuleId) -> bool {
        self.group.matches(module.group()) && self.name.matches(module.name())
    }

    /// Return the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CoordinatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A glob over archive entry paths.
///
/// # Examples
///
/// ```
/// use jarshade::pattern::EntryPattern;
///
/// let pattern = EntryPattern::parse("META-INF/*.SF").expect("valid pattern");
/// assert!(pattern.matches("META-INF/BC.SF"));
/// assert!(!pattern.matches("META-INF/sub/BC.SF"));
/// ```
#[derive(Debug, Clone)]
pub struct EntryPattern {
    raw: String,
    pattern: Pattern,
}

impl EntryPattern {
    /// Parse an entry path glob.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for empty or syntactically invalid globs.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim();
        Ok(Self {
            raw: trimmed.to_owned(),
            pattern: compile(raw, trimmed)?,
        })
    }

    /// Returns `true` when `path` matches.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(path, ENTRY_OPTIONS)
    }

    /// Return the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for EntryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn coordinate(raw: &str) -> Coordinate {
        Coordinate::parse(raw).expect("valid coordinate")
    }

    #[rstest]
    #[case("org.slf4j:slf4j-api", "org.slf4j:slf4j-api:2.0.9", true)]
    #[case("org.slf4j:*", "org.slf4j:jul-to-slf4j:2.0.9", true)]
    #[case("*:slf4j-api", "org.slf4j:slf4j-api:1.7.36", true)]
    #[case("org.slf4j:slf4j-api:1.*", "org.slf4j:slf4j-api:1.7.36", true)]
    #[case("org.slf4j:slf4j-api:1.*", "org.slf4j:slf4j-api:2.0.9", false)]
    #[case("*", "com.google.guava:guava:33.0.0-jre", true)]
    #[case("org.slf4j:*", "org.slf4jx:slf4j-api:2.0.9", false)]
    fn coordinate_patterns_match(#[case] pattern: &str, #[case] target: &str, #[case] expected: bool) {
        let parsed = CoordinatePattern::parse(pattern).expect("valid pattern");
        assert_eq!(parsed.matches(&coordinate(target)), expected);
    }

    #[test]
    fn versioned_pattern_does_not_match_bare_module() {
        let parsed = CoordinatePattern::parse("a:b:1.0").expect("valid");
        let module = ModuleId::parse("a:b").expect("valid");
        assert!(!parsed.matches_module(&module));
    }

    #[rstest]
    #[case("slf4j")]
    #[case("a::b")]
    #[case("a:b:c:d")]
    #[case("a:[b")]
    fn rejects_malformed_coordinate_patterns(#[case] raw: &str) {
        assert!(CoordinatePattern::parse(raw).is_err());
    }

    #[rstest]
    #[case("org/slf4j/**", "org/slf4j/impl/StaticLoggerBinder.class", true)]
    #[case("org/slf4j/*", "org/slf4j/impl/StaticLoggerBinder.class", false)]
    #[case("org/slf4j/*", "org/slf4j/Logger.class", true)]
    #[case("**/module-info.class", "META-INF/versions/9/module-info.class", true)]
    #[case("META-INF/*.SF", "META-INF/MANIFEST.MF", false)]
    fn entry_patterns_respect_separators(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        let parsed = EntryPattern::parse(pattern).expect("valid pattern");
        assert_eq!(parsed.matches(path), expected);
    }
}
