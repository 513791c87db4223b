//! The JSON build report written next to each shaded jar.

use crate::digest::Sha256Digest;
use crate::filter::RemovedEntry;
use crate::merger::Collision;
use crate::model::ArtifactKind;
use crate::relocator::RelocationWarning;
use camino::{Utf8Path, Utf8PathBuf};
use jarshade_common::Coordinate;
use serde::Serialize;
use std::fs;
use thiserror::Error;

/// Errors raised while writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report could not be rendered as JSON.
    #[error("failed to serialise build report")]
    Serialise(#[from] serde_json::Error),

    /// The report file could not be written.
    #[error("failed to write build report {path}")]
    Write {
        /// The report path.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },
}

/// An artifact packaged into the shaded jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludedArtifact {
    /// The artifact coordinate.
    pub coordinate: Coordinate,
    /// Its classpath role.
    pub kind: ArtifactKind,
    /// Its selection depth; 0 is the module itself.
    pub depth: usize,
}

/// Everything a consumer needs to audit a shaded jar.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Coordinate of the shaded module.
    pub coordinate: Coordinate,
    /// File name of the shaded jar.
    pub jar: String,
    /// File name of the marker jar, when one was written.
    pub marker: Option<String>,
    /// SHA-256 of the shaded jar.
    pub sha256: Sha256Digest,
    /// Number of entries in the shaded jar, manifest excluded.
    pub entries: usize,
    /// Packaged artifacts, in resolution order.
    pub included: Vec<IncludedArtifact>,
    /// Artifacts dropped by exclusion rules.
    pub excluded: Vec<Coordinate>,
    /// Entries dropped by entry rules.
    pub removed_entries: Vec<RemovedEntry>,
    /// Exclusion rules that matched nothing.
    pub unmatched_exclusions: Vec<String>,
    /// Relocation rules applied.
    pub relocations: Vec<String>,
    /// Paths claimed by several artifacts.
    pub collisions: Vec<Collision>,
    /// Relocation warnings.
    pub warnings: Vec<RelocationWarning>,
}

impl BuildReport {
    /// Render the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialise`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the report cannot be rendered or written.
    pub fn write(&self, path: &Utf8Path) -> Result<(), ReportError> {
        let mut json = self.to_json()?;
        json.push('\n');
        fs::write(path, json).map_err(|source| ReportError::Write {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::compute_sha256;
    use crate::model::EntryPath;
    use rstest::{fixture, rstest};
    use serde_json::Value;
    use tempfile::TempDir;

    fn coordinate(raw: &str) -> Coordinate {
        Coordinate::parse(raw).expect("valid coordinate")
    }

    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn empty_digest() -> Sha256Digest {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("empty.jar");
        fs::write(&path, b"").expect("write");
        compute_sha256(&path).expect("sha256 succeeds")
    }

    #[fixture]
    fn report() -> BuildReport {
        BuildReport {
            coordinate: coordinate("org.example:cos-bundle:1.0.0"),
            jar: "cos-bundle-1.0.0.jar".to_owned(),
            marker: Some("cos-bundle-1.0.0-empty.jar".to_owned()),
            sha256: empty_digest(),
            entries: 3,
            included: vec![IncludedArtifact {
                coordinate: coordinate("com.qcloud:cos_api:5.6.69"),
                kind: ArtifactKind::Runtime,
                depth: 1,
            }],
            excluded: vec![coordinate("org.slf4j:slf4j-api:1.7.36")],
            removed_entries: vec![RemovedEntry {
                artifact: coordinate("com.qcloud:cos_api:5.6.69"),
                path: EntryPath::new("META-INF/COS.SF").expect("valid path"),
            }],
            unmatched_exclusions: vec!["artifact log4j:*".to_owned()],
            relocations: vec!["com.google -> shaded.com.google".to_owned()],
            collisions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[rstest]
    fn report_serialises_coordinates_as_strings(report: BuildReport) {
        let json: Value =
            serde_json::from_str(&report.to_json().expect("serialises")).expect("valid JSON");
        let field = |pointer: &str| json.pointer(pointer).and_then(Value::as_str).map(str::to_owned);
        assert_eq!(field("/coordinate").as_deref(), Some("org.example:cos-bundle:1.0.0"));
        assert_eq!(field("/included/0/kind").as_deref(), Some("runtime"));
        assert_eq!(field("/excluded/0").as_deref(), Some("org.slf4j:slf4j-api:1.7.36"));
        assert_eq!(field("/removed_entries/0/path").as_deref(), Some("META-INF/COS.SF"));
        assert_eq!(field("/sha256").as_deref(), Some(EMPTY_SHA256));
    }

    #[rstest]
    fn report_is_written_with_trailing_newline(report: BuildReport) {
        let dir = TempDir::new().expect("temp dir");
        let path =
            Utf8PathBuf::from_path_buf(dir.path().join("out.shade.json")).expect("utf-8 path");
        report.write(&path).expect("report written");
        let text = fs::read_to_string(&path).expect("report readable");
        assert!(text.ends_with("}\n"));
    }

    #[rstest]
    fn unwritable_destinations_are_reported(report: BuildReport) {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("missing").join("out.json"))
            .expect("utf-8 path");
        assert!(matches!(report.write(&path), Err(ReportError::Write { .. })));
    }
}
