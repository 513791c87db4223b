//! Error types for relocation.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A per-entry problem that does not abort a lenient build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationWarning {
    /// The entry the warning concerns.
    pub path: String,
    /// What went wrong.
    pub message: String,
}

impl RelocationWarning {
    pub(crate) fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RelocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors that abort relocation.
#[derive(Debug, Error)]
pub enum RelocationError {
    /// A rule could not be parsed.
    #[error("invalid relocation rule {rule}: {reason}")]
    InvalidRule {
        /// The rule as written.
        rule: String,
        /// Description of the problem.
        reason: String,
    },

    /// Two rules cannot be applied together.
    #[error("relocation conflict between {first} and {second}: {reason}")]
    RelocationConflict {
        /// The first rule.
        first: String,
        /// The second rule.
        second: String,
        /// Why the rules conflict.
        reason: &'static str,
    },

    /// Strict mode turned warnings into a failure.
    #[error("strict relocation failed with {count} warning(s), first: {first}")]
    StrictRelocation {
        /// Number of warnings raised.
        count: usize,
        /// The first warning, in entry order.
        first: RelocationWarning,
    },

    /// The worker pool could not be started.
    #[error("failed to start relocation workers")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Structural problems in a class file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ClassFileError {
    #[error("not a class file (bad magic)")]
    BadMagic,
    #[error("truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },
    #[error("constant pool index {index} out of range")]
    BadIndex { index: u16 },
    #[error("relocated constant is {length} bytes, over the 65535 byte limit")]
    ConstantTooLong { length: usize },
}
