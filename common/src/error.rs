//! Error types for coordinate, version, and name parsing.
//!
//! Each variant names the rejected input and the rule it broke so manifest
//! errors can be reported verbatim to the user.

use thiserror::Error;

/// Errors arising from invalid coordinate-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// A coordinate string does not have the expected number of parts.
    #[error("invalid coordinate \"{value}\": expected {expected}")]
    InvalidCoordinate {
        /// The rejected coordinate string.
        value: String,
        /// Shape the parser expected.
        expected: &'static str,
    },

    /// A group or artifact name is empty or contains forbidden characters.
    #[error("invalid {field} \"{value}\": {reason}")]
    InvalidIdentifier {
        /// Which coordinate part was rejected (`group` or `name`).
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A version string is empty or contains forbidden characters.
    #[error("invalid version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A version range could not be parsed.
    #[error("invalid version range \"{value}\": {reason}")]
    InvalidRange {
        /// The rejected range expression.
        value: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// A package-qualified name is malformed.
    #[error("invalid qualified name \"{value}\": {reason}")]
    InvalidQualifiedName {
        /// The rejected name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`CoordinateError`].
pub type Result<T> = std::result::Result<T, CoordinateError>;
