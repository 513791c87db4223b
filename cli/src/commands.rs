//! Command handlers for the `jarshade` binary.
//!
//! Handlers take their output streams as parameters. Machine-readable output
//! goes to `stdout`; progress and dry-run summaries go to `stderr`.

use crate::cli::{BuildArgs, Command, ResolveArgs};
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use jarshade::config::BuildManifest;
use jarshade::model::{ArtifactKind, Classpath};
use jarshade::naming::ArtifactName;
use jarshade::pipeline::Assembly;
use jarshade::repository::LocalRepository;
use jarshade::resolver::ResolvedNode;
use jarshade::workspace::{WorkspaceError, plan_build_order};
use jarshade::{ModuleConfig, Pipeline, PipelineOptions, ShadeError};
use jarshade_common::Coordinate;
use log::{debug, warn};
use serde::Serialize;
use std::io::Write;

/// Output directory used when `--output-dir` is absent, relative to the
/// manifest's directory.
pub const DEFAULT_OUTPUT_DIR: &str = "build/shaded";

/// Run `command`.
///
/// # Errors
///
/// Returns [`crate::error::CliError`] when the manifest cannot be loaded,
/// any build stage fails, or output cannot be written.
pub fn run(
    command: &Command,
    quiet: bool,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Build(args) => build(args, quiet, stderr),
        Command::Resolve(args) => resolve(args, stdout),
    }
}

/// Resolve the output directory for `args`.
#[must_use]
pub fn output_dir(args: &BuildArgs, manifest: &BuildManifest) -> Utf8PathBuf {
    args.output_dir.clone().unwrap_or_else(|| {
        manifest
            .path
            .parent()
            .unwrap_or_else(|| Utf8Path::new(""))
            .join(DEFAULT_OUTPUT_DIR)
    })
}

fn build(args: &BuildArgs, quiet: bool, stderr: &mut dyn Write) -> Result<()> {
    let manifest = BuildManifest::load(&args.manifest)?;
    let repository = LocalRepository::new(manifest.repository_root.clone());
    let output_dir = output_dir(args, &manifest);
    debug!("output directory {output_dir}");
    let pipeline = Pipeline::new(
        &manifest,
        &repository,
        PipelineOptions {
            output_dir: output_dir.clone(),
            jobs: args.jobs,
            strict: args.strict,
        },
    );

    if args.dry_run {
        return dry_run(&pipeline, &manifest, &repository, args, &output_dir, stderr);
    }

    let outputs = pipeline.build_all(&args.module)?;
    if outputs.is_empty() {
        warn!("{} declares no shaded modules", manifest.path);
    }
    if !quiet {
        for output in &outputs {
            write_stderr_line(
                stderr,
                format!(
                    "Shaded {} into {} ({} entries, sha256 {})",
                    output.report.coordinate, output.jar_path, output.report.entries, output.digest
                ),
            );
        }
    }
    Ok(())
}

fn dry_run(
    pipeline: &Pipeline<'_>,
    manifest: &BuildManifest,
    repository: &LocalRepository,
    args: &BuildArgs,
    output_dir: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<()> {
    let modules = plan_build_order(manifest, &args.module).map_err(ShadeError::from)?;
    write_stderr_line(stderr, "Dry run - no files will be written.");
    write_stderr_line(stderr, format!("Manifest: {}", manifest.path));
    write_stderr_line(stderr, format!("Repository: {}", repository.root()));
    write_stderr_line(stderr, format!("Output directory: {output_dir}"));
    for module in modules {
        let assembly = pipeline.assemble(module)?;
        print_assembly(module, &assembly, output_dir, stderr);
    }
    Ok(())
}

fn print_assembly(
    module: &ModuleConfig,
    assembly: &Assembly,
    output_dir: &Utf8Path,
    stderr: &mut dyn Write,
) {
    let classifier = module
        .shade
        .as_ref()
        .and_then(|shade| shade.classifier.as_deref());
    let name = ArtifactName::new(&assembly.coordinate, classifier);

    write_stderr_line(stderr, "");
    write_stderr_line(stderr, format!("Module: {}", assembly.coordinate));
    write_stderr_line(
        stderr,
        format!("  Jar: {}", output_dir.join(name.filename())),
    );
    for artifact in &assembly.included {
        write_stderr_line(
            stderr,
            format!(
                "  Include: {} ({}, depth {})",
                artifact.coordinate,
                kind_label(artifact.kind),
                artifact.depth
            ),
        );
    }
    for coordinate in &assembly.filtered.excluded {
        write_stderr_line(stderr, format!("  Exclude: {coordinate}"));
    }
    for rule in assembly.rules.rules() {
        write_stderr_line(stderr, format!("  Relocate: {rule}"));
    }
    write_stderr_line(
        stderr,
        format!(
            "  Entries: {} ({} renamed, {} rewritten, {} warnings)",
            assembly.archive.entries.len(),
            assembly.archive.renamed,
            assembly.archive.rewritten,
            assembly.archive.warnings.len()
        ),
    );
}

#[derive(Debug, Serialize)]
struct ModuleResolution<'a> {
    module: &'a Coordinate,
    classpath: Classpath,
    artifacts: &'a [ResolvedNode],
}

fn resolve(args: &ResolveArgs, stdout: &mut dyn Write) -> Result<()> {
    let manifest = BuildManifest::load(&args.manifest)?;
    let repository = LocalRepository::new(manifest.repository_root.clone());
    let pipeline = Pipeline::new(&manifest, &repository, PipelineOptions::default());

    let modules: Vec<&ModuleConfig> = match &args.module {
        Some(name) => vec![manifest.module(name).ok_or_else(|| {
            ShadeError::from(WorkspaceError::ModuleNotFound { name: name.clone() })
        })?],
        None => manifest.modules.iter().collect(),
    };

    let requested = args.classpath.map(Classpath::from);
    let mut resolved = Vec::with_capacity(modules.len());
    for module in modules {
        let classpath = requested
            .or_else(|| module.shade.as_ref().map(|shade| shade.classpath))
            .unwrap_or_default();
        let resolution = pipeline.resolve(module, Some(classpath))?;
        resolved.push((module, classpath, resolution));
    }

    if args.json {
        let report: Vec<ModuleResolution<'_>> = resolved
            .iter()
            .map(|(module, classpath, resolution)| ModuleResolution {
                module: &module.coordinate,
                classpath: *classpath,
                artifacts: resolution.nodes(),
            })
            .collect();
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    for (module, classpath, resolution) in &resolved {
        writeln!(
            stdout,
            "{} ({})",
            module.coordinate,
            classpath_label(*classpath)
        )?;
        for node in resolution.nodes() {
            writeln!(
                stdout,
                "  {} ({}, depth {})",
                node.coordinate,
                kind_label(node.kind),
                node.depth
            )?;
        }
    }
    Ok(())
}

fn classpath_label(classpath: Classpath) -> &'static str {
    match classpath {
        Classpath::Runtime => "runtime",
        Classpath::Compile => "compile",
        Classpath::TestRuntime => "test-runtime",
    }
}

fn kind_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Runtime => "runtime",
        ArtifactKind::CompileOnly => "compile-only",
        ArtifactKind::TestOnly => "test-only",
    }
}

/// Write a progress line, ignoring failures to write it.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; the build result is unaffected.
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
