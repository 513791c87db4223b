//! Core data model shared by every pipeline stage.
//!
//! An [`Artifact`] is immutable once resolved: its coordinate, the kind of
//! classpath it was selected for, the depth at which the resolver found it,
//! and its payload of archive entries.

use crate::pattern::CoordinatePattern;
use jarshade_common::{Coordinate, ModuleId, Requirement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Component;
use thiserror::Error;

/// Errors raised when constructing model values from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// An archive entry path is absolute, empty, or escapes the archive root.
    #[error("invalid entry path \"{path}\": {reason}")]
    InvalidEntryPath {
        /// The rejected path.
        path: String,
        /// Description of the validation failure.
        reason: &'static str,
    },
}

/// How a dependency was declared by the module being shaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Needed to compile and at runtime; exported to consumers.
    #[default]
    Implementation,
    /// Needed only to compile; never packaged.
    CompileOnly,
    /// Needed only at runtime.
    RuntimeOnly,
    /// Needed to compile and run tests.
    TestImplementation,
    /// Needed only when running tests.
    TestRuntimeOnly,
}

impl Scope {
    /// Returns `true` when a dependency declared with this scope in a
    /// descriptor is followed transitively.
    #[must_use]
    pub fn is_transitive(self) -> bool {
        matches!(self, Self::Implementation | Self::RuntimeOnly)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Implementation => "implementation",
            Self::CompileOnly => "compile-only",
            Self::RuntimeOnly => "runtime-only",
            Self::TestImplementation => "test-implementation",
            Self::TestRuntimeOnly => "test-runtime-only",
        };
        f.write_str(text)
    }
}

/// The classpath a resolution is computed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classpath {
    /// `implementation` + `runtime-only`; what a shaded jar packages.
    #[default]
    Runtime,
    /// `implementation` + `compile-only`.
    Compile,
    /// Everything except `compile-only`.
    TestRuntime,
}

impl Classpath {
    /// Returns `true` when dependencies declared with `scope` belong on this
    /// classpath.
    #[must_use]
    pub fn includes(self, scope: Scope) -> bool {
        match self {
            Self::Runtime => matches!(scope, Scope::Implementation | Scope::RuntimeOnly),
            Self::Compile => matches!(scope, Scope::Implementation | Scope::CompileOnly),
            Self::TestRuntime => scope != Scope::CompileOnly,
        }
    }
}

/// The role an artifact plays in the resolved set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Only reachable through test scopes.
    TestOnly,
    /// Only reachable through `compile-only`.
    CompileOnly,
    /// Reachable through a runtime scope.
    Runtime,
}

impl ArtifactKind {
    /// Derive the kind of artifact a root declaration of `scope` produces.
    #[must_use]
    pub fn for_scope(scope: Scope) -> Self {
        match scope {
            Scope::Implementation | Scope::RuntimeOnly => Self::Runtime,
            Scope::CompileOnly => Self::CompileOnly,
            Scope::TestImplementation | Scope::TestRuntimeOnly => Self::TestOnly,
        }
    }
}

/// A validated, `/`-separated path of a file inside an archive.
///
/// Paths are relative, never empty, and never contain `..` segments, so they
/// cannot escape an extraction root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct EntryPath(String);

impl EntryPath {
    /// Validate and normalise an entry path.
    ///
    /// Backslashes are converted to `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidEntryPath`] for empty, absolute, directory
    /// or traversing paths.
    pub fn new(raw: &str) -> Result<Self, ModelError> {
        let normalised = raw.replace('\\', "/");
        let invalid = |reason| ModelError::InvalidEntryPath {
            path: raw.to_owned(),
            reason,
        };
        if normalised.is_empty() {
            return Err(invalid("path must not be empty"));
        }
        if normalised.starts_with('/') {
            return Err(invalid("path must be relative"));
        }
        if normalised.ends_with('/') {
            return Err(invalid("directories are not entries"));
        }
        let as_path = std::path::Path::new(&normalised);
        if as_path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(invalid("path must not contain '..'"));
        }
        Ok(Self(normalised))
    }

    /// Return the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EntryPath> for String {
    fn from(value: EntryPath) -> Self {
        value.0
    }
}

/// A single file inside an artifact payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Location inside the archive.
    pub path: EntryPath,
    /// File contents.
    pub data: Vec<u8>,
}

impl Entry {
    /// Pair a path with its contents.
    #[must_use]
    pub fn new(path: EntryPath, data: Vec<u8>) -> Self {
        Self { path, data }
    }
}

/// A resolved artifact with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    coordinate: Coordinate,
    kind: ArtifactKind,
    depth: usize,
    entries: Vec<Entry>,
}

impl Artifact {
    /// Assemble an artifact.
    ///
    /// Depth 0 is reserved for the module being shaded; its dependencies
    /// start at 1.
    #[must_use]
    pub fn new(coordinate: Coordinate, kind: ArtifactKind, depth: usize, entries: Vec<Entry>) -> Self {
        Self {
            coordinate,
            kind,
            depth,
            entries,
        }
    }

    /// Return the artifact coordinate.
    #[must_use]
    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    /// Return the artifact kind.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Return the selection depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the payload entries.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Return a copy of this artifact keeping only entries accepted by `keep`.
    #[must_use]
    pub fn retain_entries<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Entry) -> bool,
    {
        Self {
            coordinate: self.coordinate.clone(),
            kind: self.kind,
            depth: self.depth,
            entries: self.entries.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }
}

/// A declared dependency edge, either in a module manifest or in an
/// artifact descriptor.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// The requested module and version constraint.
    pub requirement: Requirement,
    /// How the dependency was declared.
    pub scope: Scope,
    /// Modules pruned from this dependency's transitive subtree.
    pub exclusions: Vec<CoordinatePattern>,
}

impl Dependency {
    /// Declare a dependency without exclusions.
    #[must_use]
    pub fn new(requirement: Requirement, scope: Scope) -> Self {
        Self {
            requirement,
            scope,
            exclusions: Vec::new(),
        }
    }

    /// Attach transitive exclusions.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: Vec<CoordinatePattern>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Returns `true` when `module` is pruned from this dependency's subtree.
    #[must_use]
    pub fn excludes(&self, module: &ModuleId) -> bool {
        self.exclusions
            .iter()
            .any(|pattern| pattern.matches_module(module))
    }
}
