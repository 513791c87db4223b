//! Build ordering for multi-module manifests.
//!
//! Modules are ordered with Kahn's algorithm over the `depends_on` and
//! project-dependency edges. Among modules that are ready at the same time
//! the one declared first wins, so the order is stable across runs.

use crate::config::{BuildManifest, ModuleConfig};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised while planning a workspace build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// A requested module is not declared in the manifest.
    #[error("module {name} is not declared in the manifest")]
    ModuleNotFound {
        /// The requested name.
        name: String,
    },

    /// A requested module has no `[module.shade]` section.
    #[error("module {name} has no shade configuration")]
    NotShaded {
        /// The requested name.
        name: String,
    },

    /// The module graph contains a cycle.
    #[error("dependency cycle between modules: {}", .modules.join(", "))]
    DependencyCycle {
        /// Modules that could not be ordered, in declaration order.
        modules: Vec<String>,
    },
}

/// Order every module after its prerequisites.
///
/// # Errors
///
/// Returns [`WorkspaceError::DependencyCycle`] when no such order exists.
pub fn build_order(modules: &[ModuleConfig]) -> Result<Vec<&ModuleConfig>, WorkspaceError> {
    let index: BTreeMap<&str, usize> = modules
        .iter()
        .enumerate()
        .map(|(position, module)| (module.name(), position))
        .collect();

    let mut pending = vec![0_usize; modules.len()];
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); modules.len()];
    for (position, module) in modules.iter().enumerate() {
        let prerequisites: BTreeSet<usize> = module
            .prerequisites()
            .filter_map(|name| index.get(name).copied())
            .collect();
        for prerequisite in prerequisites {
            if let Some(edges) = dependents.get_mut(prerequisite) {
                edges.insert(position);
            }
            if let Some(count) = pending.get_mut(position) {
                *count += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(position, _)| position)
        .collect();
    let mut ordered = Vec::with_capacity(modules.len());
    while let Some(position) = ready.pop_first() {
        let Some(module) = modules.get(position) else {
            continue;
        };
        ordered.push(module);
        for &dependent in dependents.get(position).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if ordered.len() != modules.len() {
        let modules = modules
            .iter()
            .zip(&pending)
            .filter(|(_, count)| **count > 0)
            .map(|(module, _)| module.name().to_owned())
            .collect();
        return Err(WorkspaceError::DependencyCycle { modules });
    }
    Ok(ordered)
}

/// Pick the modules to shade, in build order.
///
/// An empty `requested` list selects every module with a shade
/// configuration.
///
/// # Errors
///
/// Returns [`WorkspaceError::ModuleNotFound`] or
/// [`WorkspaceError::NotShaded`] for bad requests and
/// [`WorkspaceError::DependencyCycle`] when the manifest cannot be ordered.
pub fn plan_build_order<'a>(
    manifest: &'a BuildManifest,
    requested: &[String],
) -> Result<Vec<&'a ModuleConfig>, WorkspaceError> {
    for name in requested {
        let module = manifest
            .module(name)
            .ok_or_else(|| WorkspaceError::ModuleNotFound { name: name.clone() })?;
        if module.shade.is_none() {
            return Err(WorkspaceError::NotShaded { name: name.clone() });
        }
    }
    let ordered = build_order(&manifest.modules)?;
    Ok(ordered
        .into_iter()
        .filter(|module| module.shade.is_some())
        .filter(|module| requested.is_empty() || requested.iter().any(|name| name == module.name()))
        .collect())
}
