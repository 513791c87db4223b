//! Errors surfaced by the `jarshade` binary.

use jarshade::ShadeError;
use thiserror::Error;

/// Failures that end a CLI invocation with exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// A build stage failed.
    #[error(transparent)]
    Shade(#[from] ShadeError),

    /// Resolution output could not be serialised.
    #[error("failed to serialise output")]
    Json(#[from] serde_json::Error),

    /// Standard output could not be written.
    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}

impl From<jarshade::config::ConfigError> for CliError {
    fn from(err: jarshade::config::ConfigError) -> Self {
        Self::Shade(err.into())
    }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
