//! Artifact coordinates in `group:name[:version]` form.

use crate::error::{CoordinateError, Result};
use crate::version::{Version, VersionConstraint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that may not appear in a group or artifact name.
const FORBIDDEN: &[char] = &[':', '/', '\\', '[', ']', '(', ')', ',', '*'];

/// A module identity: group and artifact name without a version.
///
/// # Examples
///
/// ```
/// use jarshade_common::ModuleId;
///
/// let id = ModuleId::parse("org.slf4j:slf4j-api").expect("valid module id");
/// assert_eq!(id.group(), "org.slf4j");
/// assert_eq!(id.to_string(), "org.slf4j:slf4j-api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId {
    group: String,
    name: String,
}

impl ModuleId {
    /// Build a module id from validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidIdentifier`] if either part is empty
    /// or contains a forbidden character.
    pub fn new(group: &str, name: &str) -> Result<Self> {
        Ok(Self {
            group: validate_identifier("group", group)?,
            name: validate_identifier("name", name)?,
        })
    }

    /// Parse `group:name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidCoordinate`] for the wrong number of
    /// parts and [`CoordinateError::InvalidIdentifier`] for bad parts.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().split(':').collect::<Vec<_>>().as_slice() {
            [group, name] => Self::new(group, name),
            _ => Err(CoordinateError::InvalidCoordinate {
                value: raw.to_owned(),
                expected: "group:name",
            }),
        }
    }

    /// Return the group part.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Return the artifact name part.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl TryFrom<String> for ModuleId {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ModuleId> for String {
    fn from(value: ModuleId) -> Self {
        value.to_string()
    }
}

fn validate_identifier(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    let reason = if trimmed.is_empty() {
        Some("must not be empty".to_owned())
    } else if let Some(bad) = trimmed
        .chars()
        .find(|c| c.is_whitespace() || FORBIDDEN.contains(c))
    {
        Some(format!("unexpected character '{bad}'"))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CoordinateError::InvalidIdentifier {
            field,
            value: value.to_owned(),
            reason,
        }),
        None => Ok(trimmed.to_owned()),
    }
}

/// A fully resolved coordinate: module plus a concrete version.
///
/// # Examples
///
/// ```
/// use jarshade_common::Coordinate;
///
/// let coordinate = Coordinate::parse("com.google.guava:guava:33.0.0-jre").expect("valid");
/// assert_eq!(coordinate.module().name(), "guava");
/// assert_eq!(coordinate.version().as_str(), "33.0.0-jre");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    module: ModuleId,
    version: Version,
}

impl Coordinate {
    /// Pair a module with a concrete version.
    #[must_use]
    pub fn new(module: ModuleId, version: Version) -> Self {
        Self { module, version }
    }

    /// Parse `group:name:version`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when any part is malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().split(':').collect::<Vec<_>>().as_slice() {
            [group, name, version] => Ok(Self {
                module: ModuleId::new(group, name)?,
                version: Version::parse(version)?,
            }),
            _ => Err(CoordinateError::InvalidCoordinate {
                value: raw.to_owned(),
                expected: "group:name:version",
            }),
        }
    }

    /// Return the module identity.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Return the concrete version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.version)
    }
}

impl TryFrom<String> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Coordinate> for String {
    fn from(value: Coordinate) -> Self {
        value.to_string()
    }
}

/// A declared dependency: module plus a version constraint.
///
/// The constraint may be a range containing commas, so only the first two
/// `:` separators split the string.
///
/// # Examples
///
/// ```
/// use jarshade_common::Requirement;
///
/// let req = Requirement::parse("io.netty:netty-common:[4.1,4.2)").expect("valid");
/// assert!(req.constraint().is_hard());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    module: ModuleId,
    constraint: VersionConstraint,
}

impl Requirement {
    /// Pair a module with a constraint.
    #[must_use]
    pub fn new(module: ModuleId, constraint: VersionConstraint) -> Self {
        Self { module, constraint }
    }

    /// Parse `group:name:constraint`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when any part is malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.trim().splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(name), Some(constraint)) => Ok(Self {
                module: ModuleId::new(group, name)?,
                constraint: VersionConstraint::parse(constraint)?,
            }),
            _ => Err(CoordinateError::InvalidCoordinate {
                value: raw.to_owned(),
                expected: "group:name:version-or-range",
            }),
        }
    }

    /// Return the requested module.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Return the version constraint.
    #[must_use]
    pub fn constraint(&self) -> &VersionConstraint {
        &self.constraint
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.constraint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_full_coordinate() {
        let coordinate = Coordinate::parse("org.apache.httpcomponents:httpclient:4.5.14")
            .expect("valid coordinate");
        assert_eq!(coordinate.module().group(), "org.apache.httpcomponents");
        assert_eq!(coordinate.module().name(), "httpclient");
        assert_eq!(coordinate.to_string(), "org.apache.httpcomponents:httpclient:4.5.14");
    }

    #[rstest]
    #[case("guava")]
    #[case("com.google:guava")]
    #[case("a:b:c:d")]
    fn rejects_coordinates_with_wrong_arity(#[case] raw: &str) {
        assert!(matches!(
            Coordinate::parse(raw),
            Err(CoordinateError::InvalidCoordinate { .. })
        ));
    }

    #[rstest]
    #[case(":guava")]
    #[case("com google:guava")]
    #[case("com.google:gu*ava")]
    fn rejects_bad_identifiers(#[case] raw: &str) {
        assert!(matches!(
            ModuleId::parse(raw),
            Err(CoordinateError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn requirement_keeps_commas_in_ranges() {
        let req = Requirement::parse("com.squareup.okio:okio:[1.0,2.0)").expect("valid");
        assert_eq!(req.module().name(), "okio");
        assert_eq!(req.constraint().to_string(), "[1.0,2.0)");
    }

    #[test]
    fn module_ids_order_by_group_then_name() {
        let a = ModuleId::parse("a.b:z").expect("valid");
        let b = ModuleId::parse("a.c:a").expect("valid");
        assert!(a < b);
    }

    #[test]
    fn coordinate_round_trips_through_json() {
        let coordinate = Coordinate::parse("org.slf4j:slf4j-api:2.0.9").expect("valid");
        let json = serde_json::to_string(&coordinate).expect("serialize");
        assert_eq!(json, "\"org.slf4j:slf4j-api:2.0.9\"");
    }
}
