//! Relocation of package-qualified symbols.
//!
//! Every entry of a merged archive is transformed independently: class
//! files have their constant pools rewritten, service files and text
//! resources have qualified names replaced, and paths inside relocated
//! packages are renamed. The transforms are pure, so they run on a rayon
//! pool and the results are gathered back into canonical path order.
//!
//! Because no rule target overlaps any rule source, relocating an already
//! relocated archive changes nothing.

pub(crate) mod class_file;
mod error;
mod rules;
mod text;

pub use error::{RelocationError, RelocationWarning};
pub use rules::{RelocationRule, RuleSet};

use crate::merger::{MergedArchive, SERVICES_DIR, is_service_file, union_service_lines};
use crate::model::EntryPath;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

const VERSIONS_DIR: &str = "META-INF/versions/";

/// Options controlling relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocateOptions {
    /// Fail on any per-entry warning.
    pub strict: bool,
    /// Worker threads; `None` uses rayon's global pool.
    pub jobs: Option<usize>,
    /// Union service files that relocation renames onto the same path.
    pub merge_service_files: bool,
}

impl Default for RelocateOptions {
    fn default() -> Self {
        Self {
            strict: false,
            jobs: None,
            merge_service_files: true,
        }
    }
}

/// The relocated archive, keyed in canonical path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocatedArchive {
    /// Entry payloads by final path.
    pub entries: BTreeMap<EntryPath, Vec<u8>>,
    /// Per-entry problems, in entry order.
    pub warnings: Vec<RelocationWarning>,
    /// Number of entries whose path changed.
    pub renamed: usize,
    /// Number of entries whose contents changed.
    pub rewritten: usize,
}

impl RelocatedArchive {
    /// Return the payload stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        let path = EntryPath::new(path).ok()?;
        self.entries.get(&path).map(Vec::as_slice)
    }
}

struct Transformed {
    original: EntryPath,
    path: EntryPath,
    data: Vec<u8>,
    rewritten: bool,
    warnings: Vec<RelocationWarning>,
}

/// Split `META-INF/versions/<n>/` off a multi-release path.
fn split_versioned(path: &str) -> (&str, &str) {
    let Some(rest) = path.strip_prefix(VERSIONS_DIR) else {
        return ("", path);
    };
    match rest.split_once('/') {
        Some((version, tail)) if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) => {
            path.split_at(path.len() - tail.len())
        }
        _ => ("", path),
    }
}

fn relocate_path(path: &str, rules: &RuleSet) -> Option<String> {
    if is_service_file(path) {
        let service = path.get(SERVICES_DIR.len()..)?;
        return rules
            .relocate_name(service, '.')
            .map(|relocated| format!("{SERVICES_DIR}{relocated}"));
    }
    let (prefix, rest) = split_versioned(path);
    rules
        .relocate_name(rest, '/')
        .map(|relocated| format!("{prefix}{relocated}"))
}

fn transform(original: EntryPath, data: Vec<u8>, rules: &RuleSet) -> Transformed {
    let mut warnings = Vec::new();
    let raw = original.as_str();

    let path = match relocate_path(raw, rules).map(|relocated| EntryPath::new(&relocated)) {
        Some(Ok(path)) => path,
        Some(Err(err)) => {
            warnings.push(RelocationWarning::new(raw, format!("path not relocated: {err}")));
            original.clone()
        }
        None => original.clone(),
    };

    let relocated = if raw.ends_with(".class") {
        match class_file::relocate_class(&data, rules) {
            Ok(relocated) => relocated,
            Err(err) => {
                warnings.push(RelocationWarning::new(
                    raw,
                    format!("class file left unchanged: {err}"),
                ));
                None
            }
        }
    } else if is_service_file(raw) || text::is_text_resource(raw) {
        match std::str::from_utf8(&data) {
            Ok(content) => text::relocate_text(content, rules).map(String::into_bytes),
            Err(_) => {
                warnings.push(RelocationWarning::new(
                    raw,
                    "text resource is not valid UTF-8; left unchanged",
                ));
                None
            }
        }
    } else {
        None
    };

    let rewritten = relocated.is_some();
    Transformed {
        original,
        path,
        data: relocated.unwrap_or(data),
        rewritten,
        warnings,
    }
}

/// Relocate every entry of `archive` under `rules`.
///
/// Service files renamed onto an existing service file are unioned when
/// `options.merge_service_files` is set; any other path claimed twice keeps
/// the later entry and raises a warning.
///
/// # Errors
///
/// Returns [`RelocationError::StrictRelocation`] when `options.strict` is set
/// and any entry raised a warning, and [`RelocationError::ThreadPool`] when
/// the worker pool cannot be started.
pub fn relocate(
    archive: MergedArchive,
    rules: &RuleSet,
    options: RelocateOptions,
) -> Result<RelocatedArchive, RelocationError> {
    let entries: Vec<(EntryPath, Vec<u8>)> = archive
        .entries
        .into_iter()
        .map(|(path, entry)| (path, entry.data))
        .collect();
    if rules.is_empty() {
        return Ok(RelocatedArchive {
            entries: entries.into_iter().collect(),
            ..RelocatedArchive::default()
        });
    }

    let run = move || {
        entries
            .into_par_iter()
            .map(|(path, data)| transform(path, data, rules))
            .collect::<Vec<_>>()
    };
    let transformed = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|index| format!("jarshade-relocate-{index}"))
            .build()?
            .install(run),
        None => run(),
    };

    let mut relocated = RelocatedArchive::default();
    let mut sources: BTreeMap<EntryPath, EntryPath> = BTreeMap::new();
    for item in transformed {
        relocated.warnings.extend(item.warnings);
        if item.path != item.original {
            relocated.renamed += 1;
        }
        if item.rewritten {
            relocated.rewritten += 1;
        }
        if let Some(previous) = sources.insert(item.path.clone(), item.original.clone()) {
            if options.merge_service_files
                && is_service_file(item.path.as_str())
                && let Some(existing) = relocated.entries.get_mut(&item.path)
            {
                debug!("merging {} into {} from {previous}", item.original, item.path);
                *existing = union_service_lines(item.path.as_str(), existing.as_slice(), &item.data);
                continue;
            }
            relocated.warnings.push(RelocationWarning::new(
                item.original.as_str(),
                format!("relocated onto {}, replacing {previous}", item.path),
            ));
        }
        relocated.entries.insert(item.path, item.data);
    }

    for warning in &relocated.warnings {
        warn!("{warning}");
    }
    if options.strict {
        if let Some(first) = relocated.warnings.first() {
            return Err(RelocationError::StrictRelocation {
                count: relocated.warnings.len(),
                first: first.clone(),
            });
        }
    }
    debug!(
        "relocated {} entries: {} renamed, {} rewritten",
        relocated.entries.len(),
        relocated.renamed,
        relocated.rewritten
    );
    Ok(relocated)
}

#[cfg(test)]
#[path = "relocator_tests.rs"]
mod tests;
