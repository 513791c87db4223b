//! The shading pipeline.
//!
//! A build runs the stages in a fixed order and hands each stage's output to
//! the next: the [`Resolution`] is fetched into artifacts, filtered into a
//! [`FilterOutcome`], merged into a [`MergedArchive`], relocated into a
//! [`RelocatedArchive`], and finally written as a jar, a marker jar, and a
//! [`BuildReport`].
//!
//! [`MergedArchive`]: crate::merger::MergedArchive

use crate::archive::{self, WriteOptions};
use crate::config::{BuildManifest, ModuleConfig, ShadeConfig};
use crate::digest::{Sha256Digest, compute_sha256};
use crate::error::{Result, ShadeError};
use crate::filter::{FilterOutcome, apply_exclusions};
use crate::merger::{Collision, MergeOptions, merge};
use crate::model::{Artifact, ArtifactKind, Classpath};
use crate::naming::ArtifactName;
use crate::relocator::{RelocateOptions, RelocatedArchive, RuleSet, relocate};
use crate::report::{BuildReport, IncludedArtifact};
use crate::repository::{Repository, WorkspaceRepository};
use crate::resolver::{Resolution, Resolver};
use crate::workspace::{WorkspaceError, plan_build_order};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};

/// Options that apply to every module of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Directory receiving jars and reports.
    pub output_dir: Utf8PathBuf,
    /// Relocation worker threads; `None` uses rayon's default.
    pub jobs: Option<usize>,
    /// Force strict relocation regardless of the manifest.
    pub strict: bool,
}

/// A module taken through every stage except writing.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The module being shaded.
    pub coordinate: jarshade_common::Coordinate,
    /// The resolved dependency closure.
    pub resolution: Resolution,
    /// Artifacts that survived filtering, the module itself first.
    pub included: Vec<IncludedArtifact>,
    /// What the exclusion rules removed.
    pub filtered: FilterOutcome,
    /// Paths claimed by several artifacts.
    pub collisions: Vec<Collision>,
    /// The relocation rules applied.
    pub rules: RuleSet,
    /// The relocated archive.
    pub archive: RelocatedArchive,
}

/// Paths and digest of a written build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The shaded jar.
    pub jar_path: Utf8PathBuf,
    /// The marker jar, when one was written.
    pub marker_path: Option<Utf8PathBuf>,
    /// The JSON build report.
    pub report_path: Utf8PathBuf,
    /// SHA-256 of the shaded jar.
    pub digest: Sha256Digest,
    /// The report contents.
    pub report: BuildReport,
}

/// Runs builds for the modules of one manifest.
pub struct Pipeline<'a> {
    manifest: &'a BuildManifest,
    repository: &'a dyn Repository,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline reading artifacts from `repository`.
    #[must_use]
    pub fn new(manifest: &'a BuildManifest, repository: &'a dyn Repository, options: PipelineOptions) -> Self {
        Self {
            manifest,
            repository,
            options,
        }
    }

    fn workspace(&self) -> WorkspaceRepository<'a> {
        WorkspaceRepository::new(
            self.manifest.modules.iter().map(ModuleConfig::project_artifact),
            self.repository,
        )
    }

    /// Resolve `module` without fetching any payload.
    ///
    /// `classpath` defaults to the module's shade classpath, or the runtime
    /// classpath for modules that are not shaded.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeError::Resolve`] when resolution fails.
    pub fn resolve(&self, module: &ModuleConfig, classpath: Option<Classpath>) -> Result<Resolution> {
        let classpath = classpath
            .or_else(|| module.shade.as_ref().map(|shade| shade.classpath))
            .unwrap_or_default();
        let workspace = self.workspace();
        let resolution = Resolver::new(&workspace)
            .with_root(module.coordinate.module().clone())
            .resolve(&module.dependencies, classpath)?;
        Ok(resolution)
    }

    /// Run every stage for `module` except writing.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeError`] when the module is not shaded, relocation
    /// rules conflict, resolution fails, an artifact cannot be read, or
    /// strict relocation raises a warning.
    pub fn assemble(&self, module: &ModuleConfig) -> Result<Assembly> {
        let shade = shade_config(module)?;
        let rules = RuleSet::new(shade.relocations.clone())?;
        let workspace = self.workspace();

        info!("resolving {}", module.coordinate);
        let resolution = Resolver::new(&workspace)
            .with_root(module.coordinate.module().clone())
            .resolve(&module.dependencies, shade.classpath)?;
        debug!("resolved {} artifacts", resolution.nodes().len());

        let own = Artifact::new(
            module.coordinate.clone(),
            ArtifactKind::Runtime,
            0,
            workspace.entries(&module.coordinate)?,
        );
        let mut artifacts = vec![own];
        artifacts.extend(resolution.fetch(&workspace)?);

        let filtered = apply_exclusions(artifacts, &shade.exclusions);
        for rule in &filtered.unmatched_rules {
            debug!("exclusion {rule} matched nothing");
        }
        let included = filtered
            .artifacts
            .iter()
            .map(|artifact| IncludedArtifact {
                coordinate: artifact.coordinate().clone(),
                kind: artifact.kind(),
                depth: artifact.depth(),
            })
            .collect();

        let merged = merge(
            &filtered.artifacts,
            MergeOptions {
                merge_service_files: shade.merge_service_files,
            },
        );
        let collisions = merged.collisions.clone();

        let archive = relocate(
            merged,
            &rules,
            RelocateOptions {
                strict: shade.strict || self.options.strict,
                jobs: self.options.jobs,
                merge_service_files: shade.merge_service_files,
            },
        )?;

        Ok(Assembly {
            coordinate: module.coordinate.clone(),
            resolution,
            included,
            filtered: FilterOutcome {
                artifacts: Vec::new(),
                ..filtered
            },
            collisions,
            rules,
            archive,
        })
    }

    /// Build `module` and write its outputs.
    ///
    /// # Errors
    ///
    /// Returns [`ShadeError`] when any stage fails.
    pub fn build(&self, module: &ModuleConfig) -> Result<BuildOutput> {
        let shade = shade_config(module)?;
        let assembly = self.assemble(module)?;
        self.write(shade, assembly)
    }

    /// Build the requested modules, or every shaded module, in dependency
    /// order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ShadeError`] raised; later modules are not built.
    pub fn build_all(&self, requested: &[String]) -> Result<Vec<BuildOutput>> {
        plan_build_order(self.manifest, requested)?
            .into_iter()
            .map(|module| self.build(module))
            .collect()
    }

    fn write(&self, shade: &ShadeConfig, assembly: Assembly) -> Result<BuildOutput> {
        let options = WriteOptions { zip64: shade.zip64 };
        let name = ArtifactName::new(&assembly.coordinate, shade.classifier.as_deref());
        let jar_path = self.options.output_dir.join(name.filename());

        archive::write_jar(
            &jar_path,
            &archive::render_manifest(shade.main_class.as_deref()),
            assembly
                .archive
                .entries
                .iter()
                .map(|(path, data)| (path, data.as_slice())),
            options,
        )?;

        let marker_path = match shade.marker_classifier.as_deref() {
            Some(classifier) if name.classifier() == Some(classifier) => {
                warn!("marker classifier {classifier} matches the jar classifier; skipping marker");
                None
            }
            Some(classifier) => {
                let marker = ArtifactName::new(&assembly.coordinate, Some(classifier));
                let path = self.options.output_dir.join(marker.filename());
                archive::write_jar(&path, &archive::render_manifest(None), [], options)?;
                Some(path)
            }
            None => None,
        };

        let digest = hash(&jar_path)?;
        let report = BuildReport {
            coordinate: assembly.coordinate,
            jar: name.filename(),
            marker: marker_path
                .as_deref()
                .and_then(Utf8Path::file_name)
                .map(str::to_owned),
            sha256: digest.clone(),
            entries: assembly.archive.entries.len(),
            included: assembly.included,
            excluded: assembly.filtered.excluded,
            removed_entries: assembly.filtered.removed_entries,
            unmatched_exclusions: assembly.filtered.unmatched_rules,
            relocations: assembly.rules.rules().map(ToString::to_string).collect(),
            collisions: assembly.collisions,
            warnings: assembly.archive.warnings,
        };
        let report_path = self.options.output_dir.join(name.report_filename());
        report.write(&report_path)?;

        info!("wrote {jar_path} (sha256 {digest})");
        Ok(BuildOutput {
            jar_path,
            marker_path,
            report_path,
            digest,
            report,
        })
    }
}

fn shade_config(module: &ModuleConfig) -> Result<&ShadeConfig> {
    module.shade.as_ref().ok_or_else(|| {
        ShadeError::Workspace(WorkspaceError::NotShaded {
            name: module.name().to_owned(),
        })
    })
}

fn hash(path: &Utf8Path) -> Result<Sha256Digest> {
    compute_sha256(path.as_std_path()).map_err(|source| ShadeError::Digest {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
