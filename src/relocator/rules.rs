//! Relocation rules and their validation.
//!
//! A rule maps a source package prefix to a target prefix. Matching happens
//! at segment boundaries in either spelling: `com.google` matches
//! `com.google.common.Foo` and `com/google/common/Foo` but never
//! `com.googlex`. When several rules match, the longest source wins.

use super::error::RelocationError;
use jarshade_common::QualifiedName;
use serde::Serialize;
use std::fmt;

/// One `from -> to` mapping with optional exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationRule {
    from: QualifiedName,
    to: QualifiedName,
    excludes: Vec<QualifiedName>,
}

impl RelocationRule {
    /// Build a rule from validated names.
    #[must_use]
    pub fn new(from: QualifiedName, to: QualifiedName) -> Self {
        Self {
            from,
            to,
            excludes: Vec::new(),
        }
    }

    /// Parse a rule from dotted package names.
    ///
    /// # Errors
    ///
    /// Returns [`RelocationError::InvalidRule`] when either name is not a
    /// valid dotted name.
    pub fn parse(from: &str, to: &str) -> Result<Self, RelocationError> {
        let invalid = |err: jarshade_common::CoordinateError| RelocationError::InvalidRule {
            rule: format!("{from} -> {to}"),
            reason: err.to_string(),
        };
        Ok(Self::new(
            QualifiedName::parse(from).map_err(invalid)?,
            QualifiedName::parse(to).map_err(invalid)?,
        ))
    }

    /// Exempt names under `excludes` from this rule.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<QualifiedName>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Return the source prefix.
    #[must_use]
    pub fn from(&self) -> &QualifiedName {
        &self.from
    }

    /// Return the target prefix.
    #[must_use]
    pub fn to(&self) -> &QualifiedName {
        &self.to
    }

    /// Return the exempted prefixes.
    #[must_use]
    pub fn excludes(&self) -> &[QualifiedName] {
        &self.excludes
    }
}

impl fmt::Display for RelocationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A rule with both spellings rendered once.
#[derive(Debug, Clone)]
struct Compiled {
    rule: RelocationRule,
    from: [String; 2],
    to: [String; 2],
    excludes: Vec<[String; 2]>,
}

fn spellings(name: &QualifiedName) -> [String; 2] {
    [name.dotted(), name.internal()]
}

fn slot(separator: char) -> usize {
    usize::from(separator == '/')
}

/// Returns `true` when `name` is `prefix` or starts with `prefix` followed
/// by `separator`.
fn covers(prefix: &str, name: &str, separator: char) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(separator))
}

/// A validated, ordered collection of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    compiled: Vec<Compiled>,
}

impl RuleSet {
    /// Validate `rules` and prepare them for matching.
    ///
    /// Exact duplicates are collapsed.
    ///
    /// # Errors
    ///
    /// Returns [`RelocationError::RelocationConflict`] when two rules share a
    /// source with different targets, when one target nests inside another
    /// without the sources nesting the same way, or when a target overlaps
    /// any source.
    pub fn new(rules: Vec<RelocationRule>) -> Result<Self, RelocationError> {
        let mut unique: Vec<RelocationRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            if !unique.contains(&rule) {
                unique.push(rule);
            }
        }
        validate(&unique)?;

        let mut compiled: Vec<Compiled> = unique
            .into_iter()
            .map(|rule| Compiled {
                from: spellings(&rule.from),
                to: spellings(&rule.to),
                excludes: rule.excludes.iter().map(spellings).collect(),
                rule,
            })
            .collect();
        compiled.sort_by(|left, right| {
            right
                .rule
                .from
                .segments()
                .len()
                .cmp(&left.rule.from.segments().len())
        });
        Ok(Self { compiled })
    }

    /// Returns `true` when there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Iterate over the rules, longest source first.
    pub fn rules(&self) -> impl Iterator<Item = &RelocationRule> {
        self.compiled.iter().map(|compiled| &compiled.rule)
    }

    /// Relocate a name spelled with `separator` (`.` or `/`).
    ///
    /// Returns `None` when no rule applies.
    ///
    /// # Examples
    ///
    /// ```
    /// use jarshade::relocator::{RelocationRule, RuleSet};
    ///
    /// let rules = RuleSet::new(vec![
    ///     RelocationRule::parse("com.google", "shaded.com.google").expect("valid"),
    /// ])
    /// .expect("no conflicts");
    /// assert_eq!(
    ///     rules.relocate_name("com/google/common/Foo", '/').as_deref(),
    ///     Some("shaded/com/google/common/Foo")
    /// );
    /// assert_eq!(rules.relocate_name("com.googlex.Foo", '.'), None);
    /// ```
    #[must_use]
    pub fn relocate_name(&self, name: &str, separator: char) -> Option<String> {
        let index = slot(separator);
        for compiled in &self.compiled {
            let (Some(from), Some(to)) = (compiled.from.get(index), compiled.to.get(index)) else {
                continue;
            };
            if !covers(from, name, separator) {
                continue;
            }
            let excluded = compiled.excludes.iter().any(|exclude| {
                exclude
                    .get(index)
                    .is_some_and(|prefix| covers(prefix, name, separator))
            });
            if excluded {
                continue;
            }
            let rest = name.get(from.len()..).unwrap_or_default();
            return Some(format!("{to}{rest}"));
        }
        None
    }
}

fn conflict(first: &RelocationRule, second: &RelocationRule, reason: &'static str) -> RelocationError {
    RelocationError::RelocationConflict {
        first: first.to_string(),
        second: second.to_string(),
        reason,
    }
}

fn validate(rules: &[RelocationRule]) -> Result<(), RelocationError> {
    for (index, first) in rules.iter().enumerate() {
        for second in rules {
            if first.to.overlaps(&second.from) {
                return Err(conflict(
                    first,
                    second,
                    "target overlaps a source, so relocation would not be idempotent",
                ));
            }
        }
        for second in rules.iter().skip(index + 1) {
            if first.from == second.from && first.to != second.to {
                return Err(conflict(first, second, "same source mapped to different targets"));
            }
            for (outer, inner) in [(first, second), (second, first)] {
                let Some(target_suffix) = outer.to.suffix_of(&inner.to) else {
                    continue;
                };
                if outer.from.suffix_of(&inner.from) != Some(target_suffix) {
                    return Err(conflict(
                        outer,
                        inner,
                        "nested targets without correspondingly nested sources",
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rule(from: &str, to: &str) -> RelocationRule {
        RelocationRule::parse(from, to).expect("valid rule")
    }

    fn gravitino() -> RuleSet {
        RuleSet::new(vec![
            rule("com.google", "org.apache.gravitino.cos.shaded.com.google"),
            rule(
                "com.google.common",
                "org.apache.gravitino.cos.shaded.com.google.common",
            ),
            rule("okio", "org.apache.gravitino.cos.shaded.okio"),
        ])
        .expect("valid rules")
    }

    #[rstest]
    #[case("com.google.common.base.Strings", '.', Some("org.apache.gravitino.cos.shaded.com.google.common.base.Strings"))]
    #[case("com/google/gson/Gson", '/', Some("org/apache/gravitino/cos/shaded/com/google/gson/Gson"))]
    #[case("com.google", '.', Some("org.apache.gravitino.cos.shaded.com.google"))]
    #[case("okio.Buffer", '.', Some("org.apache.gravitino.cos.shaded.okio.Buffer"))]
    #[case("okiox.Buffer", '.', None)]
    #[case("com.googleapis.Foo", '.', None)]
    #[case("com/google/common/Foo", '.', None)]
    fn relocates_at_segment_boundaries(
        #[case] name: &str,
        #[case] separator: char,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(gravitino().relocate_name(name, separator).as_deref(), expected);
    }

    #[test]
    fn longest_source_wins() {
        let rules = RuleSet::new(vec![
            rule("com.google", "a.google"),
            rule("com.google.common", "b.guava"),
        ])
        .expect("valid rules");
        assert_eq!(
            rules.relocate_name("com.google.common.Foo", '.').as_deref(),
            Some("b.guava.Foo")
        );
        assert_eq!(
            rules.relocate_name("com.google.gson.Gson", '.').as_deref(),
            Some("a.google.gson.Gson")
        );
    }

    #[test]
    fn excludes_fall_through_to_shorter_rules() {
        let rules = RuleSet::new(vec![
            rule("com.google", "shaded.google"),
            rule("com.google.common", "shaded.guava").with_excludes(vec![
                QualifiedName::parse("com.google.common.annotations").expect("valid"),
            ]),
        ])
        .expect("valid rules");
        assert_eq!(
            rules
                .relocate_name("com.google.common.annotations.Beta", '.')
                .as_deref(),
            Some("shaded.google.common.annotations.Beta")
        );
    }

    #[rstest]
    #[case::same_source(vec![rule("a.b", "x.b"), rule("a.b", "y.b")])]
    #[case::target_is_source(vec![rule("a.b", "c.d"), rule("c", "e.c")])]
    #[case::source_under_target(vec![rule("a", "x.a"), rule("x.a.y", "z.y")])]
    #[case::self_overlap(vec![rule("a.b", "a.b.shaded")])]
    #[case::nested_targets(vec![rule("a", "x"), rule("b", "x.y")])]
    fn conflicting_rules_are_rejected(#[case] rules: Vec<RelocationRule>) {
        assert!(matches!(
            RuleSet::new(rules),
            Err(RelocationError::RelocationConflict { .. })
        ));
    }

    #[test]
    fn duplicates_are_collapsed() {
        let rules = RuleSet::new(vec![rule("a.b", "x.b"), rule("a.b", "x.b")]).expect("valid");
        assert_eq!(rules.rules().count(), 1);
    }

    #[test]
    fn invalid_names_are_reported() {
        assert!(matches!(
            RelocationRule::parse("com..google", "x"),
            Err(RelocationError::InvalidRule { .. })
        ));
    }
}
