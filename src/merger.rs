//! Merging artifact payloads into a single archive model.
//!
//! Entries are visited in artifact order, the module's own entries first.
//! A path claimed twice keeps the later payload and records a collision,
//! except for service-registration files under `META-INF/services/`, whose
//! lines are unioned.

use crate::archive::MANIFEST_PATH;
use crate::model::{Artifact, EntryPath};
use jarshade_common::Coordinate;
use log::{debug, warn};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Directory holding `ServiceLoader` registrations.
pub const SERVICES_DIR: &str = "META-INF/services/";

/// Entries that never survive a merge.
const DROPPED_ENTRIES: &[&str] = &[MANIFEST_PATH, "module-info.class"];

/// Options controlling the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Union service-registration files instead of letting the last one win.
    pub merge_service_files: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            merge_service_files: true,
        }
    }
}

/// Returns `true` for a `ServiceLoader` registration file path.
#[must_use]
pub fn is_service_file(path: &str) -> bool {
    path.strip_prefix(SERVICES_DIR)
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// A merged entry and the artifacts it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEntry {
    /// The final payload.
    pub data: Vec<u8>,
    /// Contributing artifacts, in merge order.
    pub origins: Vec<Coordinate>,
}

/// A path claimed by more than one artifact with different payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// The contested path.
    pub path: EntryPath,
    /// The artifact whose payload was kept.
    pub kept: Coordinate,
    /// The artifact whose payload was discarded.
    pub replaced: Coordinate,
}

/// The merged archive, keyed in canonical path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedArchive {
    /// Entries by path.
    pub entries: BTreeMap<EntryPath, MergedEntry>,
    /// Non-service collisions, in the order they occurred.
    pub collisions: Vec<Collision>,
}

impl MergedArchive {
    /// Return the payload stored at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        let path = EntryPath::new(path).ok()?;
        self.entries.get(&path).map(|entry| entry.data.as_slice())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Union service file lines: trimmed, blank lines dropped, first occurrence
/// kept.
/// Union the registrations of two service files at `path`.
///
/// Lines are trimmed, blank lines dropped, and duplicates removed keeping
/// first-seen order. Undecodable bytes are replaced and logged.
pub(crate) fn union_service_lines(path: &str, existing: &[u8], incoming: &[u8]) -> Vec<u8> {
    let existing = decode_service_file(path, existing);
    let incoming = decode_service_file(path, incoming);
    let mut lines: Vec<&str> = Vec::new();
    for line in existing.lines().chain(incoming.lines()) {
        let line = line.trim();
        if !line.is_empty() && !lines.contains(&line) {
            lines.push(line);
        }
    }
    let mut merged = lines.join("\n");
    if !merged.is_empty() {
        merged.push('\n');
    }
    merged.into_bytes()
}

fn decode_service_file<'a>(path: &str, data: &'a [u8]) -> Cow<'a, str> {
    let text = String::from_utf8_lossy(data);
    if matches!(text, Cow::Owned(_)) {
        warn!("{path} is not valid UTF-8; invalid bytes were replaced");
    }
    text
}

/// Merge `artifacts` into one archive.
///
/// `artifacts` must already be in merge order: the module's own artifact
/// first, then dependencies in resolution order.
///
/// # Examples
///
/// ```
/// use jarshade::merger::{MergeOptions, merge};
/// use jarshade::model::{Artifact, ArtifactKind, Entry, EntryPath};
/// use jarshade_common::Coordinate;
///
/// let service = |coordinate: &str, line: &str| {
///     Artifact::new(
///         Coordinate::parse(coordinate).expect("valid"),
///         ArtifactKind::Runtime,
///         1,
///         vec![Entry::new(
///             EntryPath::new("META-INF/services/org.example.Spi").expect("valid"),
///             line.as_bytes().to_vec(),
///         )],
///     )
/// };
/// let merged = merge(
///     &[service("g:a:1", "a.Impl\n"), service("g:b:1", "b.Impl\na.Impl\n")],
///     MergeOptions::default(),
/// );
/// assert_eq!(
///     merged.get("META-INF/services/org.example.Spi"),
///     Some(&b"a.Impl\nb.Impl\n"[..])
/// );
/// ```
#[must_use]
pub fn merge(artifacts: &[Artifact], options: MergeOptions) -> MergedArchive {
    let mut archive = MergedArchive::default();

    for artifact in artifacts {
        let origin = artifact.coordinate();
        for entry in artifact.entries() {
            let path = entry.path.as_str();
            if DROPPED_ENTRIES.contains(&path) {
                debug!("dropping {path} from {origin}");
                continue;
            }
            let service = options.merge_service_files && is_service_file(path);
            let Some(existing) = archive.entries.get_mut(&entry.path) else {
                archive.entries.insert(
                    entry.path.clone(),
                    MergedEntry {
                        data: if service {
                            union_service_lines(path, &[], &entry.data)
                        } else {
                            entry.data.clone()
                        },
                        origins: vec![origin.clone()],
                    },
                );
                continue;
            };

            if service {
                existing.data = union_service_lines(path, &existing.data, &entry.data);
                existing.origins.push(origin.clone());
                continue;
            }
            if existing.data == entry.data {
                existing.origins.push(origin.clone());
                continue;
            }
            let replaced = existing
                .origins
                .last()
                .cloned()
                .unwrap_or_else(|| origin.clone());
            warn!("{path} from {origin} replaces the copy from {replaced}");
            existing.data.clone_from(&entry.data);
            existing.origins.push(origin.clone());
            archive.collisions.push(Collision {
                path: entry.path.clone(),
                kept: origin.clone(),
                replaced,
            });
        }
    }
    debug!(
        "merged {} artifacts into {} entries with {} collisions",
        artifacts.len(),
        archive.entries.len(),
        archive.collisions.len()
    );
    archive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactKind, Entry};
    use rstest::rstest;

    /// `logtest::Logger::start` installs a process-global logger and may only
    /// be called once per test binary, so tests share one instance and hold
    /// the lock for their duration.
    fn test_logger() -> std::sync::MutexGuard<'static, logtest::Logger> {
        static LOGGER: std::sync::OnceLock<std::sync::Mutex<logtest::Logger>> =
            std::sync::OnceLock::new();
        LOGGER
            .get_or_init(|| std::sync::Mutex::new(logtest::Logger::start()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn artifact(coordinate: &str, entries: &[(&str, &str)]) -> Artifact {
        Artifact::new(
            Coordinate::parse(coordinate).expect("valid coordinate"),
            ArtifactKind::Runtime,
            1,
            entries
                .iter()
                .map(|(path, data)| {
                    Entry::new(
                        EntryPath::new(path).expect("valid path"),
                        data.as_bytes().to_vec(),
                    )
                })
                .collect(),
        )
    }

    const SPI: &str = "META-INF/services/org.apache.hadoop.fs.FileSystem";

    #[test]
    fn service_files_are_unioned_without_duplicates() {
        let merged = merge(
            &[
                artifact("g:a:1", &[(SPI, "org.a.CosFs\n\n  org.a.Other \n")]),
                artifact("g:b:1", &[(SPI, "org.a.CosFs\norg.b.S3Fs\n")]),
            ],
            MergeOptions::default(),
        );
        assert_eq!(
            merged.get(SPI),
            Some(&b"org.a.CosFs\norg.a.Other\norg.b.S3Fs\n"[..])
        );
        assert!(merged.collisions.is_empty());
    }

    #[test]
    fn disabled_service_merging_falls_back_to_last_writer() {
        let merged = merge(
            &[
                artifact("g:a:1", &[(SPI, "org.a.CosFs\n")]),
                artifact("g:b:1", &[(SPI, "org.b.S3Fs\n")]),
            ],
            MergeOptions {
                merge_service_files: false,
            },
        );
        assert_eq!(merged.get(SPI), Some(&b"org.b.S3Fs\n"[..]));
        assert_eq!(merged.collisions.len(), 1);
    }

    #[test]
    fn later_artifacts_win_collisions() {
        let merged = merge(
            &[
                artifact("g:a:1", &[("config.properties", "a=1")]),
                artifact("g:b:1", &[("config.properties", "b=2")]),
            ],
            MergeOptions::default(),
        );
        assert_eq!(merged.get("config.properties"), Some(&b"b=2"[..]));
        let collision = merged.collisions.first().expect("one collision");
        assert_eq!(collision.kept.to_string(), "g:b:1");
        assert_eq!(collision.replaced.to_string(), "g:a:1");
    }

    #[test]
    fn collisions_are_logged() {
        let mut logger = test_logger();
        let _ = merge(
            &[
                artifact("g:a:1", &[("collision-probe.txt", "a")]),
                artifact("g:b:1", &[("collision-probe.txt", "b")]),
            ],
            MergeOptions::default(),
        );

        let mut warned = false;
        while let Some(record) = logger.pop() {
            if record.level() == log::Level::Warn
                && record.args().to_string().contains("collision-probe.txt")
            {
                warned = true;
                break;
            }
        }
        assert!(warned, "expected the collision to be logged");
    }

    #[test]
    fn undecodable_service_lines_are_logged() {
        let mut logger = test_logger();
        let merged = merge(
            &[Artifact::new(
                Coordinate::parse("g:a:1").expect("valid coordinate"),
                ArtifactKind::Runtime,
                1,
                vec![Entry::new(
                    EntryPath::new("META-INF/services/org.example.Undecodable").expect("valid path"),
                    b"org.a.Impl\n\xff\n".to_vec(),
                )],
            )],
            MergeOptions::default(),
        );
        assert_eq!(
            merged.get("META-INF/services/org.example.Undecodable"),
            Some("org.a.Impl\n\u{fffd}\n".as_bytes())
        );

        let mut warned = false;
        while let Some(record) = logger.pop() {
            if record.level() == log::Level::Warn
                && record.args().to_string().contains("org.example.Undecodable")
            {
                warned = true;
                break;
            }
        }
        assert!(warned, "expected the replaced bytes to be logged");
    }

    #[test]
    fn identical_payloads_collide_silently() {
        let merged = merge(
            &[
                artifact("g:a:1", &[("LICENSE", "same")]),
                artifact("g:b:1", &[("LICENSE", "same")]),
            ],
            MergeOptions::default(),
        );
        assert!(merged.collisions.is_empty());
        let entry = merged.entries.values().next().expect("one entry");
        assert_eq!(entry.origins.len(), 2);
    }

    #[rstest]
    #[case(MANIFEST_PATH)]
    #[case("module-info.class")]
    fn manifests_and_module_descriptors_are_dropped(#[case] path: &str) {
        let merged = merge(&[artifact("g:a:1", &[(path, "x")])], MergeOptions::default());
        assert!(merged.is_empty());
    }

    #[test]
    fn entries_are_kept_in_canonical_order() {
        let merged = merge(
            &[artifact("g:a:1", &[("z/Z.class", "z"), ("a/A.class", "a")])],
            MergeOptions::default(),
        );
        let paths: Vec<&str> = merged.entries.keys().map(EntryPath::as_str).collect();
        assert_eq!(paths, vec!["a/A.class", "z/Z.class"]);
    }

    #[rstest]
    #[case("META-INF/services/org.example.Spi", true)]
    #[case("META-INF/services/", false)]
    #[case("META-INF/services/nested/org.example.Spi", false)]
    #[case("META-INF/spring.factories", false)]
    fn recognises_service_files(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_service_file(path), expected);
    }
}
