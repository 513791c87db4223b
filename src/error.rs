//! Error type for a whole shading build.
//!
//! Each stage reports its own error enum; [`ShadeError`] gathers them so the
//! pipeline and the CLI can propagate any failure with `?`.

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::relocator::RelocationError;
use crate::report::ReportError;
use crate::repository::RepositoryError;
use crate::resolver::ResolveError;
use crate::workspace::WorkspaceError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum ShadeError {
    /// The manifest is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The requested modules cannot be planned.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Dependency resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An artifact could not be fetched.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Relocation rules conflict or strict relocation failed.
    #[error(transparent)]
    Relocation(#[from] RelocationError),

    /// An archive could not be read or written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The build report could not be written.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The written jar could not be hashed.
    #[error("failed to hash {path}")]
    Digest {
        /// The jar being hashed.
        path: Utf8PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for build operations.
pub type Result<T> = std::result::Result<T, ShadeError>;
