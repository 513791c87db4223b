//! Artifact stores consulted by the resolver.
//!
//! A [`Repository`] answers three questions about a module: which versions
//! exist, what a given version depends on, and what files it contains. The
//! directory-backed [`LocalRepository`] reads the layout
//! `<root>/<group as dirs>/<name>/<version>/<name>-<version>.jar` with an
//! optional `<name>-<version>.toml` descriptor alongside the jar.
//! [`WorkspaceRepository`] overlays the modules of a manifest on top of
//! another store so project dependencies resolve like any other artifact.

use crate::archive::{self, ArchiveError};
use crate::model::{Dependency, Entry, EntryPath, Scope};
use crate::pattern::{CoordinatePattern, PatternError};
use camino::{Utf8Path, Utf8PathBuf};
use jarshade_common::{Coordinate, CoordinateError, ModuleId, Requirement, Version};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while querying a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested artifact is not present.
    #[error("artifact {coordinate} not found in repository")]
    NotFound {
        /// The missing artifact.
        coordinate: Coordinate,
    },

    /// A repository file or directory could not be read.
    #[error("failed to read {path}")]
    Io {
        /// The path being read.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// A dependency descriptor is malformed.
    #[error("invalid descriptor {path}: {reason}")]
    InvalidDescriptor {
        /// The descriptor file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// An artifact jar could not be decoded.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// The dependency metadata published with an artifact.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    /// Declared dependencies, in declaration order.
    pub dependencies: Vec<Dependency>,
}

/// Read access to an artifact store.
#[cfg_attr(test, mockall::automock)]
pub trait Repository {
    /// List the available versions of `module`, in ascending order.
    ///
    /// An unknown module yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the store cannot be read.
    fn versions(&self, module: &ModuleId) -> Result<Vec<Version>, RepositoryError>;

    /// Return the dependency descriptor of `coordinate`.
    ///
    /// Artifacts published without a descriptor have no dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the descriptor is unreadable or
    /// malformed.
    fn descriptor(&self, coordinate: &Coordinate) -> Result<Descriptor, RepositoryError>;

    /// Return the payload entries of `coordinate`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the artifact is absent and
    /// other variants when it cannot be read.
    fn entries(&self, coordinate: &Coordinate) -> Result<Vec<Entry>, RepositoryError>;
}

/// A dependency as written in TOML, shared by descriptors and manifests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDependency {
    pub(crate) coordinate: Option<String>,
    pub(crate) project: Option<String>,
    #[serde(default)]
    pub(crate) scope: Scope,
    #[serde(default)]
    pub(crate) exclude: Vec<String>,
}

/// Reasons a raw dependency cannot be converted.
#[derive(Debug, Error)]
pub(crate) enum RawDependencyError {
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

impl RawDependency {
    /// Parse the exclusion globs of this dependency.
    pub(crate) fn exclusions(&self) -> Result<Vec<CoordinatePattern>, PatternError> {
        self.exclude
            .iter()
            .map(|raw| CoordinatePattern::parse(raw))
            .collect()
    }

    /// Convert a `coordinate = ".."` dependency.
    pub(crate) fn to_dependency(&self, coordinate: &str) -> Result<Dependency, RawDependencyError> {
        let requirement = Requirement::parse(coordinate)?;
        Ok(Dependency::new(requirement, self.scope).with_exclusions(self.exclusions()?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(default)]
    dependencies: Vec<RawDependency>,
}

fn parse_descriptor(path: &Utf8Path, text: &str) -> Result<Descriptor, RepositoryError> {
    let invalid = |reason: String| RepositoryError::InvalidDescriptor {
        path: path.to_owned(),
        reason,
    };
    let raw: RawDescriptor = toml::from_str(text).map_err(|err| invalid(err.to_string()))?;
    let mut dependencies = Vec::with_capacity(raw.dependencies.len());
    for dependency in &raw.dependencies {
        let Some(coordinate) = dependency.coordinate.as_deref() else {
            return Err(invalid(
                "descriptor dependencies must name a coordinate".to_owned(),
            ));
        };
        dependencies.push(
            dependency
                .to_dependency(coordinate)
                .map_err(|err| invalid(err.to_string()))?,
        );
    }
    Ok(Descriptor { dependencies })
}

/// A repository stored in a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: Utf8PathBuf,
}

impl LocalRepository {
    /// Open the repository rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the repository root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn module_dir(&self, module: &ModuleId) -> Utf8PathBuf {
        let mut dir = self.root.clone();
        for part in module.group().split('.') {
            dir.push(part);
        }
        dir.push(module.name());
        dir
    }

    fn version_dir(&self, coordinate: &Coordinate) -> Utf8PathBuf {
        self.module_dir(coordinate.module())
            .join(coordinate.version().as_str())
    }

    fn artifact_file(&self, coordinate: &Coordinate, extension: &str) -> Utf8PathBuf {
        self.version_dir(coordinate).join(format!(
            "{}-{}.{extension}",
            coordinate.module().name(),
            coordinate.version()
        ))
    }
}

impl Repository for LocalRepository {
    fn versions(&self, module: &ModuleId) -> Result<Vec<Version>, RepositoryError> {
        let dir = self.module_dir(module);
        let io_error = |source| RepositoryError::Io {
            path: dir.clone(),
            source,
        };
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(err)),
        };

        let mut versions = Vec::new();
        for entry in listing {
            let entry = entry.map_err(io_error)?;
            if !entry.file_type().map_err(io_error)?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!("ignoring non-UTF-8 version directory under {dir}");
                continue;
            };
            match Version::parse(&name) {
                Ok(version) => versions.push(version),
                Err(err) => debug!("ignoring {dir}/{name}: {err}"),
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn descriptor(&self, coordinate: &Coordinate) -> Result<Descriptor, RepositoryError> {
        let path = self.artifact_file(coordinate, "toml");
        match fs::read_to_string(&path) {
            Ok(text) => parse_descriptor(&path, &text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Descriptor::default()),
            Err(source) => Err(RepositoryError::Io { path, source }),
        }
    }

    fn entries(&self, coordinate: &Coordinate) -> Result<Vec<Entry>, RepositoryError> {
        let path = self.artifact_file(coordinate, "jar");
        if !path.is_file() {
            return Err(RepositoryError::NotFound {
                coordinate: coordinate.clone(),
            });
        }
        Ok(archive::read_jar(&path)?)
    }
}

#[derive(Debug, Clone, Default)]
struct StoredArtifact {
    descriptor: Descriptor,
    entries: Vec<Entry>,
}

/// An in-memory repository, used by tests and by callers that assemble
/// artifacts programmatically.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    modules: BTreeMap<ModuleId, BTreeMap<Version, StoredArtifact>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an artifact, replacing any previous publication of the same
    /// coordinate.
    pub fn publish(&mut self, coordinate: Coordinate, dependencies: Vec<Dependency>, entries: Vec<Entry>) {
        let (module, version) = (coordinate.module().clone(), coordinate.version().clone());
        self.modules.entry(module).or_default().insert(
            version,
            StoredArtifact {
                descriptor: Descriptor { dependencies },
                entries,
            },
        );
    }

    fn stored(&self, coordinate: &Coordinate) -> Result<&StoredArtifact, RepositoryError> {
        self.modules
            .get(coordinate.module())
            .and_then(|versions| versions.get(coordinate.version()))
            .ok_or_else(|| RepositoryError::NotFound {
                coordinate: coordinate.clone(),
            })
    }
}

impl Repository for MemoryRepository {
    fn versions(&self, module: &ModuleId) -> Result<Vec<Version>, RepositoryError> {
        Ok(self
            .modules
            .get(module)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn descriptor(&self, coordinate: &Coordinate) -> Result<Descriptor, RepositoryError> {
        Ok(self.stored(coordinate)?.descriptor.clone())
    }

    fn entries(&self, coordinate: &Coordinate) -> Result<Vec<Entry>, RepositoryError> {
        Ok(self.stored(coordinate)?.entries.clone())
    }
}

/// A module of the manifest, exposed through [`WorkspaceRepository`].
#[derive(Debug, Clone)]
pub struct ProjectArtifact {
    /// The module coordinate; its version is the only version available.
    pub coordinate: Coordinate,
    /// Directory holding the module's own entries, if it has any.
    pub classes: Option<Utf8PathBuf>,
    /// The module's declared dependencies.
    pub dependencies: Vec<Dependency>,
}

/// A repository that serves manifest modules before consulting `fallback`.
pub struct WorkspaceRepository<'a> {
    projects: BTreeMap<ModuleId, ProjectArtifact>,
    fallback: &'a dyn Repository,
}

impl<'a> WorkspaceRepository<'a> {
    /// Overlay `projects` on top of `fallback`.
    #[must_use]
    pub fn new(projects: impl IntoIterator<Item = ProjectArtifact>, fallback: &'a dyn Repository) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|project| (project.coordinate.module().clone(), project))
                .collect(),
            fallback,
        }
    }

    fn project(&self, coordinate: &Coordinate) -> Option<&ProjectArtifact> {
        self.projects
            .get(coordinate.module())
            .filter(|project| project.coordinate.version() == coordinate.version())
    }
}

impl Repository for WorkspaceRepository<'_> {
    fn versions(&self, module: &ModuleId) -> Result<Vec<Version>, RepositoryError> {
        match self.projects.get(module) {
            Some(project) => Ok(vec![project.coordinate.version().clone()]),
            None => self.fallback.versions(module),
        }
    }

    fn descriptor(&self, coordinate: &Coordinate) -> Result<Descriptor, RepositoryError> {
        match self.project(coordinate) {
            Some(project) => Ok(Descriptor {
                dependencies: project.dependencies.clone(),
            }),
            None => self.fallback.descriptor(coordinate),
        }
    }

    fn entries(&self, coordinate: &Coordinate) -> Result<Vec<Entry>, RepositoryError> {
        match self.project(coordinate) {
            Some(project) => match &project.classes {
                Some(dir) => read_directory(dir),
                None => Ok(Vec::new()),
            },
            None => self.fallback.entries(coordinate),
        }
    }
}

/// Read every file below `dir` as an archive entry, in sorted path order.
///
/// # Errors
///
/// Returns [`RepositoryError::Io`] when the directory cannot be walked or a
/// file cannot be read.
pub fn read_directory(dir: &Utf8Path) -> Result<Vec<Entry>, RepositoryError> {
    let mut entries = Vec::new();
    for item in WalkDir::new(dir).sort_by_file_name() {
        let item = item.map_err(|err| RepositoryError::Io {
            path: dir.to_owned(),
            source: err.into(),
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let Ok(relative) = item.path().strip_prefix(dir) else {
            continue;
        };
        let Some(segments) = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
        else {
            warn!("skipping non-UTF-8 path {}", item.path().display());
            continue;
        };
        let entry_path = match EntryPath::new(&segments.join("/")) {
            Ok(entry_path) => entry_path,
            Err(err) => {
                warn!("skipping {}: {err}", item.path().display());
                continue;
            }
        };
        let data = fs::read(item.path()).map_err(|source| RepositoryError::Io {
            path: dir.join(entry_path.as_str()),
            source,
        })?;
        entries.push(Entry::new(entry_path, data));
    }
    debug!("read {} entries from {dir}", entries.len());
    Ok(entries)
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
