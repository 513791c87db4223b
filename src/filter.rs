//! Exclusion of artifacts and entries before merging.
//!
//! Filtering is a pure function of its inputs. Rules that match nothing are
//! reported, not rejected, so a policy written for one dependency set keeps
//! working when the set changes.

use crate::model::{Artifact, EntryPath};
use crate::pattern::{CoordinatePattern, EntryPattern, PatternError};
use jarshade_common::Coordinate;
use serde::Serialize;
use std::fmt;

/// A single exclusion.
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    /// Drop whole artifacts whose coordinate matches.
    Artifact(CoordinatePattern),
    /// Drop matching entries from every artifact.
    Entry(EntryPattern),
}

impl ExclusionRule {
    /// Parse an artifact rule.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for malformed coordinate globs.
    pub fn artifact(raw: &str) -> Result<Self, PatternError> {
        CoordinatePattern::parse(raw).map(Self::Artifact)
    }

    /// Parse an entry rule.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for malformed path globs.
    pub fn entry(raw: &str) -> Result<Self, PatternError> {
        EntryPattern::parse(raw).map(Self::Entry)
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact(pattern) => write!(f, "artifact {pattern}"),
            Self::Entry(pattern) => write!(f, "entry {pattern}"),
        }
    }
}

/// An entry removed by an entry rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedEntry {
    /// The artifact that contained the entry.
    pub artifact: Coordinate,
    /// The removed path.
    pub path: EntryPath,
}

/// The result of filtering.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Surviving artifacts, in input order.
    pub artifacts: Vec<Artifact>,
    /// Coordinates removed by artifact rules.
    pub excluded: Vec<Coordinate>,
    /// Entries removed by entry rules.
    pub removed_entries: Vec<RemovedEntry>,
    /// Rules that matched nothing, as written.
    pub unmatched_rules: Vec<String>,
}

/// Apply `rules` to `artifacts`.
///
/// Artifact rules are evaluated first; entry rules then apply to whatever
/// survives.
///
/// # Examples
///
/// ```
/// use jarshade::filter::{ExclusionRule, apply_exclusions};
/// use jarshade::model::{Artifact, ArtifactKind};
/// use jarshade_common::Coordinate;
///
/// let slf4j = Artifact::new(
///     Coordinate::parse("org.slf4j:slf4j-api:2.0.9").expect("valid"),
///     ArtifactKind::Runtime,
///     2,
///     Vec::new(),
/// );
/// let rules = [ExclusionRule::artifact("org.slf4j:*").expect("valid")];
/// let outcome = apply_exclusions(vec![slf4j], &rules);
/// assert!(outcome.artifacts.is_empty());
/// assert_eq!(outcome.excluded.len(), 1);
/// ```
#[must_use]
pub fn apply_exclusions(artifacts: Vec<Artifact>, rules: &[ExclusionRule]) -> FilterOutcome {
    let mut matched = vec![false; rules.len()];
    let mut excluded = Vec::new();
    let mut kept = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let mut drop = false;
        for (rule, hit) in rules.iter().zip(matched.iter_mut()) {
            if let ExclusionRule::Artifact(pattern) = rule {
                if pattern.matches(artifact.coordinate()) {
                    *hit = true;
                    drop = true;
                }
            }
        }
        if drop {
            excluded.push(artifact.coordinate().clone());
        } else {
            kept.push(artifact);
        }
    }

    let mut removed_entries = Vec::new();
    let artifacts = kept
        .into_iter()
        .map(|artifact| {
            artifact.retain_entries(|entry| {
                let mut keep = true;
                for (rule, hit) in rules.iter().zip(matched.iter_mut()) {
                    if let ExclusionRule::Entry(pattern) = rule {
                        if pattern.matches(entry.path.as_str()) {
                            *hit = true;
                            keep = false;
                        }
                    }
                }
                if !keep {
                    removed_entries.push(RemovedEntry {
                        artifact: artifact.coordinate().clone(),
                        path: entry.path.clone(),
                    });
                }
                keep
            })
        })
        .collect();

    let unmatched_rules = rules
        .iter()
        .zip(&matched)
        .filter(|(_, hit)| !**hit)
        .map(|(rule, _)| rule.to_string())
        .collect();

    FilterOutcome {
        artifacts,
        excluded,
        removed_entries,
        unmatched_rules,
    }
}
