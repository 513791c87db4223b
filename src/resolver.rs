//! Dependency graph resolution.
//!
//! The resolver turns a module's declared dependencies into a flat,
//! conflict-resolved set of coordinates. Bare versions are soft preferences
//! and ranges are hard constraints. For each module the nearest soft
//! preference that satisfies every hard constraint wins, ties at equal depth
//! going to the highest version; without one, the highest satisfying version
//! is chosen.
//!
//! Selecting a version changes which descriptors are read, and therefore
//! which constraints are reachable, so resolution repeats the graph walk
//! until the selection stops changing.

use crate::model::{Artifact, ArtifactKind, Classpath, Dependency};
use crate::pattern::CoordinatePattern;
use crate::repository::{Descriptor, Repository, RepositoryError};
use jarshade_common::{Coordinate, ModuleId, Version, VersionConstraint};
use log::{debug, trace};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use thiserror::Error;

/// Upper bound on graph walks before resolution gives up.
pub const DEFAULT_MAX_ROUNDS: usize = 64;

/// Errors raised while resolving a dependency graph.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No acceptable version exists for a module.
    #[error("unresolvable dependency {module}: {reason}")]
    UnresolvableDependency {
        /// The module that could not be resolved.
        module: ModuleId,
        /// Why resolution failed.
        reason: String,
    },

    /// Version selection kept changing.
    #[error("unresolvable dependencies: selection did not converge after {rounds} rounds")]
    NotConverged {
        /// Number of graph walks performed.
        rounds: usize,
    },

    /// The repository could not be queried.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A module selected by resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNode {
    /// The selected coordinate.
    pub coordinate: Coordinate,
    /// The strongest classpath role through which the module is reached.
    pub kind: ArtifactKind,
    /// Shortest declaration depth; direct dependencies are at depth 1.
    pub depth: usize,
    /// The module whose descriptor first introduced this one, if transitive.
    pub requested_by: Option<ModuleId>,
}

/// The outcome of resolution, ordered by depth then first declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    nodes: Vec<ResolvedNode>,
}

impl Resolution {
    /// Return the resolved nodes in canonical order.
    #[must_use]
    pub fn nodes(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    /// Returns `true` when nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return the selected version of `module`, if it was resolved.
    #[must_use]
    pub fn version_of(&self, module: &ModuleId) -> Option<&Version> {
        self.nodes
            .iter()
            .find(|node| node.coordinate.module() == module)
            .map(|node| node.coordinate.version())
    }

    /// Load the payload of every resolved node.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when an artifact cannot be read.
    pub fn fetch(&self, repository: &dyn Repository) -> Result<Vec<Artifact>, RepositoryError> {
        self.nodes
            .iter()
            .map(|node| {
                let entries = repository.entries(&node.coordinate)?;
                Ok(Artifact::new(
                    node.coordinate.clone(),
                    node.kind,
                    node.depth,
                    entries,
                ))
            })
            .collect()
    }
}

/// Resolves dependency graphs against a [`Repository`].
pub struct Resolver<'a> {
    repository: &'a dyn Repository,
    root: Option<ModuleId>,
    max_rounds: usize,
}

/// Everything one graph walk learned about a module.
#[derive(Debug)]
struct Gathered {
    hard: Vec<VersionConstraint>,
    soft: Vec<(usize, Version)>,
    kind: ArtifactKind,
    depth: usize,
    requested_by: Option<ModuleId>,
}

#[derive(Debug, Default)]
struct Walk {
    order: Vec<ModuleId>,
    modules: BTreeMap<ModuleId, Gathered>,
    edges: Vec<(ModuleId, ModuleId)>,
}

struct Pending {
    dependency: Dependency,
    depth: usize,
    kind: ArtifactKind,
    inherited: Vec<CoordinatePattern>,
    parent: Option<ModuleId>,
}

/// Repository answers are stable within a resolution, so each is fetched
/// once.
#[derive(Default)]
struct Cache {
    versions: HashMap<ModuleId, Vec<Version>>,
    descriptors: HashMap<Coordinate, Descriptor>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over `repository`.
    #[must_use]
    pub fn new(repository: &'a dyn Repository) -> Self {
        Self {
            repository,
            root: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Name the module being resolved so dependency cycles back to it are
    /// ignored.
    #[must_use]
    pub fn with_root(mut self, root: ModuleId) -> Self {
        self.root = Some(root);
        self
    }

    /// Override the bound on graph walks.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Resolve `dependencies` for `classpath`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnresolvableDependency`] when a module is
    /// missing or no version satisfies its constraints,
    /// [`ResolveError::NotConverged`] when selection does not stabilise and
    /// [`ResolveError::Repository`] when the repository fails.
    pub fn resolve(
        &self,
        dependencies: &[Dependency],
        classpath: Classpath,
    ) -> Result<Resolution, ResolveError> {
        let mut cache = Cache::default();
        let mut selected: BTreeMap<ModuleId, Version> = BTreeMap::new();

        for round in 1..=self.max_rounds {
            let walk = self.walk(dependencies, classpath, &selected, &mut cache)?;
            let mut next = BTreeMap::new();
            for module in &walk.order {
                if let Some(gathered) = walk.modules.get(module) {
                    let version = self.select(module, gathered, &mut cache)?;
                    next.insert(module.clone(), version);
                }
            }
            trace!("resolution round {round} selected {} modules", next.len());
            if next == selected {
                debug!("resolution converged after {round} rounds");
                return Ok(assemble(walk, &selected));
            }
            selected = next;
        }
        Err(ResolveError::NotConverged {
            rounds: self.max_rounds,
        })
    }

    fn walk(
        &self,
        dependencies: &[Dependency],
        classpath: Classpath,
        selected: &BTreeMap<ModuleId, Version>,
        cache: &mut Cache,
    ) -> Result<Walk, ResolveError> {
        let mut walk = Walk::default();
        let mut expanded = BTreeSet::new();
        let mut queue: VecDeque<Pending> = dependencies
            .iter()
            .filter(|dependency| classpath.includes(dependency.scope))
            .map(|dependency| Pending {
                dependency: dependency.clone(),
                depth: 1,
                kind: ArtifactKind::for_scope(dependency.scope),
                inherited: Vec::new(),
                parent: None,
            })
            .collect();

        while let Some(pending) = queue.pop_front() {
            let module = pending.dependency.requirement.module().clone();
            if self.root.as_ref() == Some(&module) {
                trace!("ignoring dependency cycle back to {module}");
                continue;
            }
            if pending
                .inherited
                .iter()
                .any(|pattern| pattern.matches_module(&module))
            {
                trace!("{module} excluded below {:?}", pending.parent);
                continue;
            }
            if let Some(parent) = &pending.parent {
                walk.edges.push((parent.clone(), module.clone()));
            }
            record(&mut walk, &module, &pending);

            let Some(version) = selected.get(&module) else {
                continue;
            };
            if !expanded.insert(module.clone()) {
                continue;
            }
            let coordinate = Coordinate::new(module.clone(), version.clone());
            let descriptor = self.descriptor(&coordinate, cache)?;
            let mut inherited = pending.inherited.clone();
            inherited.extend(pending.dependency.exclusions.iter().cloned());
            for child in descriptor
                .dependencies
                .into_iter()
                .filter(|child| child.scope.is_transitive())
            {
                queue.push_back(Pending {
                    dependency: child,
                    depth: pending.depth + 1,
                    kind: pending.kind,
                    inherited: inherited.clone(),
                    parent: Some(module.clone()),
                });
            }
        }
        Ok(walk)
    }

    fn descriptor(&self, coordinate: &Coordinate, cache: &mut Cache) -> Result<Descriptor, ResolveError> {
        if let Some(descriptor) = cache.descriptors.get(coordinate) {
            return Ok(descriptor.clone());
        }
        let descriptor = self.repository.descriptor(coordinate)?;
        cache
            .descriptors
            .insert(coordinate.clone(), descriptor.clone());
        Ok(descriptor)
    }

    fn versions<'c>(&self, module: &ModuleId, cache: &'c mut Cache) -> Result<&'c [Version], ResolveError> {
        if !cache.versions.contains_key(module) {
            let versions = self.repository.versions(module)?;
            cache.versions.insert(module.clone(), versions);
        }
        Ok(cache
            .versions
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    fn select(&self, module: &ModuleId, gathered: &Gathered, cache: &mut Cache) -> Result<Version, ResolveError> {
        let unresolvable = |reason: String| ResolveError::UnresolvableDependency {
            module: module.clone(),
            reason,
        };
        let available = self.versions(module, cache)?;
        if available.is_empty() {
            return Err(unresolvable("not found in repository".to_owned()));
        }
        let satisfies_hard =
            |version: &Version| gathered.hard.iter().all(|constraint| constraint.allows(version));

        let Some(highest) = available.iter().filter(|v| satisfies_hard(*v)).max() else {
            let constraints: Vec<String> = gathered.hard.iter().map(ToString::to_string).collect();
            return Err(unresolvable(format!(
                "no available version satisfies {}",
                constraints.join(" and ")
            )));
        };

        let mut preferences: Vec<&(usize, Version)> = gathered
            .soft
            .iter()
            .filter(|(_, version)| satisfies_hard(version))
            .collect();
        preferences.sort_by(|(left_depth, left), (right_depth, right)| {
            left_depth.cmp(right_depth).then_with(|| right.cmp(left))
        });

        match preferences.first() {
            Some((_, preferred)) => available
                .iter()
                .find(|version| *version == preferred)
                .cloned()
                .ok_or_else(|| unresolvable(format!("version {preferred} not found in repository"))),
            None => Ok(highest.clone()),
        }
    }
}

fn record(walk: &mut Walk, module: &ModuleId, pending: &Pending) {
    if !walk.modules.contains_key(module) {
        walk.order.push(module.clone());
    }
    let gathered = walk.modules.entry(module.clone()).or_insert_with(|| Gathered {
        hard: Vec::new(),
        soft: Vec::new(),
        kind: pending.kind,
        depth: pending.depth,
        requested_by: pending.parent.clone(),
    });
    let constraint = pending.dependency.requirement.constraint();
    if constraint.is_hard() {
        if !gathered.hard.contains(constraint) {
            gathered.hard.push(constraint.clone());
        }
    } else if let Some(version) = constraint.preferred() {
        gathered.soft.push((pending.depth, version.clone()));
    }
    gathered.kind = gathered.kind.max(pending.kind);
    gathered.depth = gathered.depth.min(pending.depth);
}

fn assemble(mut walk: Walk, selected: &BTreeMap<ModuleId, Version>) -> Resolution {
    // Kinds flow down edges: anything reachable from a runtime artifact is
    // itself needed at runtime.
    let mut changed = true;
    while changed {
        changed = false;
        for (parent, child) in &walk.edges {
            let Some(parent_kind) = walk.modules.get(parent).map(|g| g.kind) else {
                continue;
            };
            if let Some(gathered) = walk.modules.get_mut(child) {
                if gathered.kind < parent_kind {
                    gathered.kind = parent_kind;
                    changed = true;
                }
            }
        }
    }

    let mut nodes: Vec<ResolvedNode> = walk
        .order
        .iter()
        .filter_map(|module| {
            let gathered = walk.modules.get(module)?;
            let version = selected.get(module)?;
            Some(ResolvedNode {
                coordinate: Coordinate::new(module.clone(), version.clone()),
                kind: gathered.kind,
                depth: gathered.depth,
                requested_by: gathered.requested_by.clone(),
            })
        })
        .collect();
    nodes.sort_by_key(|node| node.depth);
    Resolution { nodes }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
