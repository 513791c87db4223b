//! Version ordering and version constraints.
//!
//! Versions compare the way Maven orders them: numeric components compare
//! numerically, well-known qualifiers rank below a release (`alpha` < `beta`
//! < `milestone` < `rc` < `snapshot` < release < `sp`), and trailing zero or
//! release components are ignored so `1.0` and `1.0.0` are equal.
//!
//! A [`VersionConstraint`] is either a soft preference (a bare version), a
//! set of hard ranges (`[1.0,2.0)`), or a wildcard.

use crate::error::{CoordinateError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Bound;

/// Rank of a release (no qualifier).
const RELEASE_RANK: u8 = 5;

/// Rank given to qualifiers outside the well-known set.
const UNKNOWN_RANK: u8 = 7;

/// One parsed component of a version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Item {
    /// Digits with leading zeros stripped (`"0"` for zero).
    Number(String),
    /// Lowercase qualifier with aliases normalised; empty for a release.
    Qualifier(String),
}

impl Item {
    fn number(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Self::Number("0".to_owned())
        } else {
            Self::Number(trimmed.to_owned())
        }
    }

    fn qualifier(text: &str) -> Self {
        let lower = text.to_ascii_lowercase();
        let canonical = match lower.as_str() {
            "a" => "alpha",
            "b" => "beta",
            "m" => "milestone",
            "cr" => "rc",
            "ga" | "final" | "release" => "",
            other => other,
        };
        Self::Qualifier(canonical.to_owned())
    }

    /// Returns `true` for components that trailing-trim away.
    fn is_null(&self) -> bool {
        match self {
            Self::Number(digits) => digits == "0",
            Self::Qualifier(text) => text.is_empty(),
        }
    }

    fn rank(text: &str) -> u8 {
        match text {
            "alpha" => 0,
            "beta" => 1,
            "milestone" => 2,
            "rc" => 3,
            "snapshot" => 4,
            "" => RELEASE_RANK,
            "sp" => 6,
            _ => UNKNOWN_RANK,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Self::Number(_), Self::Qualifier(_)) => Ordering::Greater,
            (Self::Qualifier(_), Self::Number(_)) => Ordering::Less,
            (Self::Qualifier(a), Self::Qualifier(b)) => {
                let (rank_a, rank_b) = (Self::rank(a), Self::rank(b));
                rank_a.cmp(&rank_b).then_with(|| {
                    if rank_a == UNKNOWN_RANK {
                        a.cmp(b)
                    } else {
                        Ordering::Equal
                    }
                })
            }
        }
    }

    /// Compare against a missing component in the shorter version.
    fn compare_to_absent(&self) -> Ordering {
        match self {
            Self::Number(digits) if digits == "0" => Ordering::Equal,
            Self::Number(_) => Ordering::Greater,
            Self::Qualifier(text) => Self::rank(text).cmp(&RELEASE_RANK),
        }
    }
}

/// A parsed, comparable version string.
///
/// # Examples
///
/// ```
/// use jarshade_common::Version;
///
/// let older: Version = "1.9".parse().expect("valid version");
/// let newer: Version = "1.10.0-rc1".parse().expect("valid version");
/// assert!(older < newer);
/// assert_eq!(Version::parse("2.0").ok(), Version::parse("2").ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    items: Vec<Item>,
}

impl Version {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidVersion`] when the string is empty or
    /// contains characters that cannot appear in a version.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid_version(raw, "version must not be empty"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+')))
        {
            return Err(invalid_version(raw, &format!("unexpected character '{bad}'")));
        }
        Ok(Self {
            raw: trimmed.to_owned(),
            items: tokenize(trimmed),
        })
    }

    /// Return the version exactly as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn invalid_version(value: &str, reason: &str) -> CoordinateError {
    CoordinateError::InvalidVersion {
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Split a version into numeric and qualifier items.
///
/// Separators are `.`, `-`, `_` and `+`; a switch between digits and letters
/// also starts a new item (`1rc2` -> `1`, `rc`, `2`). Zero components are
/// dropped at the end and ahead of a qualifier, so `1.0.0-alpha` and
/// `1-alpha` tokenize alike.
fn tokenize(raw: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    let flush = |current: &mut String, is_digit: bool, items: &mut Vec<Item>| {
        if current.is_empty() {
            return;
        }
        if is_digit {
            items.push(Item::number(current));
        } else {
            // Zero release components before a qualifier are padding.
            while items.last().is_some_and(Item::is_null) {
                items.pop();
            }
            items.push(Item::qualifier(current));
        }
        current.clear();
    };

    for ch in raw.chars() {
        if matches!(ch, '.' | '-' | '_' | '+') {
            flush(&mut current, current_is_digit, &mut items);
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            flush(&mut current, current_is_digit, &mut items);
        }
        current_is_digit = is_digit;
        current.push(ch);
    }
    flush(&mut current, current_is_digit, &mut items);

    while items.last().is_some_and(Item::is_null) {
        items.pop();
    }
    items
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.items.iter();
        let mut right = other.items.iter();
        loop {
            let ordering = match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (Some(a), Some(b)) => a.compare(b),
                (Some(a), None) => a.compare_to_absent(),
                (None, Some(b)) => b.compare_to_absent().reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

impl std::str::FromStr for Version {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A contiguous interval of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Bound<Version>,
    upper: Bound<Version>,
}

impl VersionRange {
    /// Construct a range from explicit bounds.
    #[must_use]
    pub fn new(lower: Bound<Version>, upper: Bound<Version>) -> Self {
        Self { lower, upper }
    }

    /// Returns `true` when `version` lies within the range.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(low) => version >= low,
            Bound::Excluded(low) => version > low,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(high) => version <= high,
            Bound::Excluded(high) => version < high,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Bound::Included(low), Bound::Included(high)) = (&self.lower, &self.upper) {
            if low == high {
                return write!(f, "[{low}]");
            }
        }
        match &self.lower {
            Bound::Included(low) => write!(f, "[{low},")?,
            Bound::Excluded(low) => write!(f, "({low},")?,
            Bound::Unbounded => f.write_str("(,")?,
        }
        match &self.upper {
            Bound::Included(high) => write!(f, "{high}]"),
            Bound::Excluded(high) => write!(f, "{high})"),
            Bound::Unbounded => f.write_str(")"),
        }
    }
}

/// A requested version: soft preference, hard ranges, or anything.
///
/// # Examples
///
/// ```
/// use jarshade_common::{Version, VersionConstraint};
///
/// let range = VersionConstraint::parse("[1.0,2.0)").expect("valid range");
/// assert!(range.is_hard());
/// assert!(range.allows(&Version::parse("1.5").expect("valid")));
/// assert!(!range.allows(&Version::parse("2.0").expect("valid")));
///
/// let soft = VersionConstraint::parse("1.2.3").expect("valid version");
/// assert!(!soft.is_hard());
/// assert!(VersionConstraint::Any.is_hard());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// A bare version: preferred, but overridable by conflict resolution.
    Prefer(Version),
    /// One or more ranges; the selected version must fall in at least one.
    Ranges(Vec<VersionRange>),
    /// `*` or `latest`: any available version.
    Any,
}

impl VersionConstraint {
    /// Parse a constraint expression.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::InvalidRange`] for malformed ranges and
    /// [`CoordinateError::InvalidVersion`] for malformed bare versions.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed == "*" || trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Any);
        }
        if trimmed.starts_with('[') || trimmed.starts_with('(') {
            return parse_ranges(trimmed).map(Self::Ranges);
        }
        Version::parse(trimmed).map(Self::Prefer)
    }

    /// Returns `true` for ranges and the wildcard, which conflict resolution
    /// must honour; only a bare version is soft.
    #[must_use]
    pub fn is_hard(&self) -> bool {
        !matches!(self, Self::Prefer(_))
    }

    /// Returns `true` when `version` does not violate the constraint.
    ///
    /// Soft preferences never reject a version; only ranges do.
    #[must_use]
    pub fn allows(&self, version: &Version) -> bool {
        match self {
            Self::Ranges(ranges) => ranges.iter().any(|range| range.contains(version)),
            Self::Prefer(_) | Self::Any => true,
        }
    }

    /// Return the preferred version of a soft constraint.
    #[must_use]
    pub fn preferred(&self) -> Option<&Version> {
        match self {
            Self::Prefer(version) => Some(version),
            Self::Ranges(_) | Self::Any => None,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefer(version) => write!(f, "{version}"),
            Self::Any => f.write_str("*"),
            Self::Ranges(ranges) => {
                for (index, range) in ranges.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{range}")?;
                }
                Ok(())
            }
        }
    }
}

fn invalid_range(value: &str, reason: &str) -> CoordinateError {
    CoordinateError::InvalidRange {
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Parse `[a,b)`-style ranges, optionally comma-separated into a union.
fn parse_ranges(raw: &str) -> Result<Vec<VersionRange>> {
    let mut ranges = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let lower_inclusive = match rest.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid_range(raw, "expected '[' or '('")),
        };
        let close = rest
            .find([']', ')'])
            .ok_or_else(|| invalid_range(raw, "unterminated range"))?;
        let upper_inclusive = rest.get(close..=close) == Some("]");
        let body = rest.get(1..close).unwrap_or_default();
        ranges.push(parse_one_range(raw, body, lower_inclusive, upper_inclusive)?);

        rest = rest.get(close + 1..).unwrap_or_default().trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
            if rest.is_empty() {
                return Err(invalid_range(raw, "trailing ','"));
            }
        } else if !rest.is_empty() {
            return Err(invalid_range(raw, "ranges must be separated by ','"));
        }
    }

    if ranges.is_empty() {
        return Err(invalid_range(raw, "no ranges found"));
    }
    Ok(ranges)
}

fn parse_one_range(
    raw: &str,
    body: &str,
    lower_inclusive: bool,
    upper_inclusive: bool,
) -> Result<VersionRange> {
    let Some((low, high)) = body.split_once(',') else {
        if !(lower_inclusive && upper_inclusive) {
            return Err(invalid_range(raw, "a single version must use '[v]'"));
        }
        let exact = Version::parse(body)?;
        return Ok(VersionRange::new(
            Bound::Included(exact.clone()),
            Bound::Included(exact),
        ));
    };

    let lower = bound(low, lower_inclusive)?;
    let upper = bound(high, upper_inclusive)?;
    if let (
        Bound::Included(l) | Bound::Excluded(l),
        Bound::Included(h) | Bound::Excluded(h),
    ) = (&lower, &upper)
    {
        if l > h {
            return Err(invalid_range(raw, "lower bound exceeds upper bound"));
        }
    }
    Ok(VersionRange::new(lower, upper))
}

fn bound(text: &str, inclusive: bool) -> Result<Bound<Version>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Bound::Unbounded);
    }
    let version = Version::parse(trimmed)?;
    Ok(if inclusive {
        Bound::Included(version)
    } else {
        Bound::Excluded(version)
    })
}
