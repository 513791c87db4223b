//! Jar reading and deterministic jar writing.
//!
//! Output archives are reproducible: entries are written in the order given
//! (callers pass canonical order), every entry carries the zip epoch
//! timestamp (1980-01-01) and fixed permissions, and the manifest is always
//! the first entry so `JarInputStream` finds it.

use crate::model::{Entry, EntryPath};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use std::io::{BufReader, Read, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Path of the jar manifest inside an archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Value written to the `Created-By` manifest attribute.
const CREATED_BY: &str = concat!("jarshade ", env!("CARGO_PKG_VERSION"));

/// Errors arising while reading or writing archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An archive could not be opened or decoded.
    #[error("failed to read archive {path}: {reason}")]
    Read {
        /// The archive being read.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An archive could not be written.
    #[error("failed to write archive {path}")]
    Write {
        /// The archive being written.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },
}

/// Options for [`write_jar`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Emit zip64 records so archives may exceed 4 GiB or 65 535 entries.
    pub zip64: bool,
}

/// Read every file entry of the jar at `path`.
///
/// Directory entries are skipped. Entries whose names would escape the
/// archive root are skipped with a warning rather than failing the read.
///
/// # Errors
///
/// Returns [`ArchiveError::Read`] when the file cannot be opened or is not a
/// valid zip archive.
pub fn read_jar(path: &Utf8Path) -> Result<Vec<Entry>, ArchiveError> {
    let read_error = |reason: String| ArchiveError::Read {
        path: path.to_owned(),
        reason,
    };
    let file = fs::File::open(path).map_err(|err| read_error(err.to_string()))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|err| read_error(err.to_string()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|err| read_error(err.to_string()))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_owned();
        let entry_path = match EntryPath::new(&name) {
            Ok(entry_path) => entry_path,
            Err(err) => {
                warn!("skipping entry in {path}: {err}");
                continue;
            }
        };
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
        file.read_to_end(&mut data)
            .map_err(|err| read_error(format!("{name}: {err}")))?;
        entries.push(Entry::new(entry_path, data));
    }
    debug!("read {} entries from {path}", entries.len());
    Ok(entries)
}

/// Render a jar manifest.
///
/// # Examples
///
/// ```
/// use jarshade::archive::render_manifest;
///
/// let manifest = render_manifest(Some("org.example.Main"));
/// assert!(manifest.starts_with("Manifest-Version: 1.0\r\n"));
/// assert!(manifest.contains("Main-Class: org.example.Main\r\n"));
/// ```
#[must_use]
pub fn render_manifest(main_class: Option<&str>) -> String {
    let mut manifest = String::from("Manifest-Version: 1.0\r\n");
    manifest.push_str(&format!("Created-By: {CREATED_BY}\r\n"));
    if let Some(main_class) = main_class {
        manifest.push_str(&format!("Main-Class: {main_class}\r\n"));
    }
    manifest.push_str("\r\n");
    manifest
}

fn file_options(options: WriteOptions) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
        .large_file(options.zip64)
}

/// Write a jar at `path` containing `manifest` followed by `entries`.
///
/// Any `META-INF/MANIFEST.MF` among `entries` is ignored in favour of
/// `manifest`.
///
/// # Errors
///
/// Returns [`ArchiveError::Write`] when the file cannot be created or any
/// entry fails to write.
pub fn write_jar<'a, I>(
    path: &Utf8Path,
    manifest: &str,
    entries: I,
    options: WriteOptions,
) -> Result<(), ArchiveError>
where
    I: IntoIterator<Item = (&'a EntryPath, &'a [u8])>,
{
    let write_error = |source: std::io::Error| ArchiveError::Write {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }
    let file = fs::File::create(path).map_err(write_error)?;
    let mut writer = ZipWriter::new(file);
    let file_options = file_options(options);

    writer
        .start_file(MANIFEST_PATH, file_options)
        .map_err(|err| write_error(zip_to_io(err)))?;
    writer
        .write_all(manifest.as_bytes())
        .map_err(write_error)?;

    for (entry_path, data) in entries {
        if entry_path.as_str() == MANIFEST_PATH {
            continue;
        }
        writer
            .start_file(entry_path.as_str(), file_options)
            .map_err(|err| write_error(zip_to_io(err)))?;
        writer.write_all(data).map_err(write_error)?;
    }

    writer
        .finish()
        .map_err(|err| write_error(zip_to_io(err)))?;
    Ok(())
}

fn zip_to_io(err: zip::result::ZipError) -> std::io::Error {
    match err {
        zip::result::ZipError::Io(io) => io,
        other => std::io::Error::other(other),
    }
}
