//! Build manifest loading.
//!
//! A `jarshade.toml` manifest names the artifact repository and declares one
//! or more modules. Each module lists its dependencies and, when it is to be
//! shaded, a `[module.shade]` policy. Loading validates everything up front
//! and produces explicit [`ModuleConfig`] and [`ShadeConfig`] values, so the
//! pipeline never consults raw TOML.

use crate::filter::ExclusionRule;
use crate::model::{Classpath, Dependency};
use crate::relocator::RelocationRule;
use crate::repository::{ProjectArtifact, RawDependency};
use camino::{Utf8Path, Utf8PathBuf};
use jarshade_common::{Coordinate, ModuleId, QualifiedName, Requirement, Version, VersionConstraint};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use thiserror::Error;

/// File name looked up when no manifest path is given.
pub const DEFAULT_MANIFEST: &str = "jarshade.toml";

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file does not exist.
    #[error("manifest {path} not found")]
    ManifestNotFound {
        /// The path that was looked up.
        path: Utf8PathBuf,
    },

    /// The manifest exists but could not be read.
    #[error("failed to read manifest {path}")]
    Io {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },

    /// The manifest is malformed or inconsistent.
    #[error("invalid manifest {path}: {reason}")]
    InvalidManifest {
        /// The manifest path.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    repository: RawRepository,
    #[serde(default, rename = "module")]
    modules: Vec<RawModule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    #[serde(default = "RawRepository::default_path")]
    path: Utf8PathBuf,
}

impl RawRepository {
    fn default_path() -> Utf8PathBuf {
        Utf8PathBuf::from("repo")
    }
}

impl Default for RawRepository {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModule {
    group: String,
    name: String,
    version: String,
    classes: Option<Utf8PathBuf>,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    shade: Option<RawShade>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShade {
    #[serde(default)]
    classpath: Classpath,
    #[serde(default)]
    classifier: String,
    #[serde(default = "RawShade::default_marker_classifier")]
    marker_classifier: String,
    #[serde(default)]
    zip64: bool,
    #[serde(default = "RawShade::default_merge_service_files")]
    merge_service_files: bool,
    #[serde(default)]
    strict: bool,
    main_class: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    exclude_entries: Vec<String>,
    #[serde(default)]
    relocate: Vec<RawRelocation>,
}

impl RawShade {
    fn default_marker_classifier() -> String {
        "empty".to_owned()
    }

    const fn default_merge_service_files() -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRelocation {
    from: String,
    to: String,
    #[serde(default)]
    exclude: Vec<String>,
}

/// A validated manifest.
#[derive(Debug, Clone)]
pub struct BuildManifest {
    /// Where the manifest was loaded from.
    pub path: Utf8PathBuf,
    /// Root directory of the artifact repository.
    pub repository_root: Utf8PathBuf,
    /// Modules in declaration order.
    pub modules: Vec<ModuleConfig>,
}

/// One module of the manifest.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// The module's own coordinate.
    pub coordinate: Coordinate,
    /// Directory of the module's own entries.
    pub classes: Option<Utf8PathBuf>,
    /// Modules that must be built first without being dependencies.
    pub depends_on: Vec<String>,
    /// Names of the manifest modules this module depends on.
    pub project_dependencies: Vec<String>,
    /// Declared dependencies, project dependencies included.
    pub dependencies: Vec<Dependency>,
    /// Shading policy; `None` for modules that are only depended upon.
    pub shade: Option<ShadeConfig>,
}

impl ModuleConfig {
    /// Return the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.coordinate.module().name()
    }

    /// Names of every module that must precede this one.
    pub fn prerequisites(&self) -> impl Iterator<Item = &str> {
        self.depends_on
            .iter()
            .chain(&self.project_dependencies)
            .map(String::as_str)
    }

    /// Describe this module as an artifact of the workspace.
    #[must_use]
    pub fn project_artifact(&self) -> ProjectArtifact {
        ProjectArtifact {
            coordinate: self.coordinate.clone(),
            classes: self.classes.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

/// How a module is shaded.
#[derive(Debug, Clone)]
pub struct ShadeConfig {
    /// Which declared scopes are packaged.
    pub classpath: Classpath,
    /// Classifier of the shaded jar.
    pub classifier: Option<String>,
    /// Classifier of the marker jar; `None` disables it.
    pub marker_classifier: Option<String>,
    /// Write zip64 records.
    pub zip64: bool,
    /// Union service-registration files instead of keeping the last copy.
    pub merge_service_files: bool,
    /// Treat relocation warnings as errors.
    pub strict: bool,
    /// `Main-Class` of the output manifest.
    pub main_class: Option<String>,
    /// Artifact and entry exclusions, artifact rules first.
    pub exclusions: Vec<ExclusionRule>,
    /// Relocation rules in declaration order.
    pub relocations: Vec<RelocationRule>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl BuildManifest {
    /// Load and validate the manifest at `path`.
    ///
    /// Relative paths inside the manifest are resolved against its
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ManifestNotFound`] when the file is missing and
    /// [`ConfigError::InvalidManifest`] when it does not validate.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::ManifestNotFound {
                    path: path.to_owned(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        })?;
        Self::parse(path, &text)
    }

    /// Validate manifest `text` as if it had been read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidManifest`] when the text does not
    /// validate.
    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidManifest {
            path: path.to_owned(),
            reason,
        };
        let raw: RawManifest = toml::from_str(text).map_err(|err| invalid(err.to_string()))?;
        let base = path.parent().unwrap_or_else(|| Utf8Path::new(""));

        let mut versions: BTreeMap<String, Coordinate> = BTreeMap::new();
        for module in &raw.modules {
            let coordinate = module_coordinate(module).map_err(&invalid)?;
            if versions.insert(module.name.clone(), coordinate).is_some() {
                return Err(invalid(format!("module {} is declared twice", module.name)));
            }
        }

        let modules = raw
            .modules
            .into_iter()
            .map(|module| validate_module(module, base, &versions))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(Self {
            path: path.to_owned(),
            repository_root: base.join(&raw.repository.path),
            modules,
        })
    }

    /// Look up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|module| module.name() == name)
    }
}

fn module_coordinate(module: &RawModule) -> Result<Coordinate, String> {
    let id = ModuleId::new(&module.group, &module.name).map_err(|err| err.to_string())?;
    let version = Version::parse(&module.version)
        .map_err(|err| format!("module {}: {err}", module.name))?;
    Ok(Coordinate::new(id, version))
}

fn validate_module(
    raw: RawModule,
    base: &Utf8Path,
    versions: &BTreeMap<String, Coordinate>,
) -> Result<ModuleConfig, String> {
    let name = raw.name.clone();
    let context = |reason: String| format!("module {name}: {reason}");
    let coordinate = versions
        .get(&raw.name)
        .cloned()
        .ok_or_else(|| context("missing coordinate".to_owned()))?;

    for prerequisite in &raw.depends_on {
        if !versions.contains_key(prerequisite) {
            return Err(context(format!("depends_on names unknown module {prerequisite}")));
        }
    }

    let mut dependencies = Vec::with_capacity(raw.dependencies.len());
    let mut project_dependencies = Vec::new();
    for dependency in &raw.dependencies {
        match (&dependency.coordinate, &dependency.project) {
            (Some(coordinate), None) => dependencies.push(
                dependency
                    .to_dependency(coordinate)
                    .map_err(|err| context(err.to_string()))?,
            ),
            (None, Some(project)) => {
                let target = versions
                    .get(project)
                    .ok_or_else(|| context(format!("unknown project {project}")))?;
                if *project == raw.name {
                    return Err(context("a module cannot depend on itself".to_owned()));
                }
                dependencies.push(project_dependency(dependency, target).map_err(&context)?);
                project_dependencies.push(project.clone());
            }
            _ => {
                return Err(context(
                    "a dependency needs exactly one of `coordinate` or `project`".to_owned(),
                ));
            }
        }
    }

    let shade = raw
        .shade
        .as_ref()
        .map(validate_shade)
        .transpose()
        .map_err(&context)?;

    Ok(ModuleConfig {
        coordinate,
        classes: raw.classes.map(|classes| base.join(classes)),
        depends_on: raw.depends_on,
        project_dependencies,
        dependencies,
        shade,
    })
}

/// A project dependency pins the exact version the workspace declares.
fn project_dependency(raw: &RawDependency, target: &Coordinate) -> Result<Dependency, String> {
    let constraint =
        VersionConstraint::parse(&format!("[{}]", target.version())).map_err(|err| err.to_string())?;
    let exclusions = raw.exclusions().map_err(|err| err.to_string())?;
    Ok(
        Dependency::new(Requirement::new(target.module().clone(), constraint), raw.scope)
            .with_exclusions(exclusions),
    )
}

fn validate_shade(raw: &RawShade) -> Result<ShadeConfig, String> {
    let mut exclusions = Vec::with_capacity(raw.exclude.len() + raw.exclude_entries.len());
    for pattern in &raw.exclude {
        exclusions.push(ExclusionRule::artifact(pattern).map_err(|err| err.to_string())?);
    }
    for pattern in &raw.exclude_entries {
        exclusions.push(ExclusionRule::entry(pattern).map_err(|err| err.to_string())?);
    }

    let mut relocations = Vec::with_capacity(raw.relocate.len());
    for rule in &raw.relocate {
        let excludes = rule
            .exclude
            .iter()
            .map(|name| QualifiedName::parse(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("relocation {} -> {}: {err}", rule.from, rule.to))?;
        relocations.push(
            RelocationRule::parse(&rule.from, &rule.to)
                .map_err(|err| err.to_string())?
                .with_excludes(excludes),
        );
    }

    Ok(ShadeConfig {
        classpath: raw.classpath,
        classifier: non_empty(&raw.classifier),
        marker_classifier: non_empty(&raw.marker_classifier),
        zip64: raw.zip64,
        merge_service_files: raw.merge_service_files,
        strict: raw.strict,
        main_class: raw.main_class.as_deref().and_then(non_empty),
        exclusions,
        relocations,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
