//! SHA-256 digests of produced archives.
//!
//! The build report records the digest of the shaded jar so consumers can
//! verify the artifact they download is the one that was built.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

/// A lowercase hex-encoded SHA-256 digest.
///
/// Digests are only produced by hashing, so the string is always 64
/// lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl From<Sha256Digest> for String {
    fn from(value: Sha256Digest) -> Self {
        value.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the SHA-256 digest of a file, reading it in chunks.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be read.
pub fn compute_sha256(path: &Path) -> std::io::Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(Sha256Digest::from_hasher(hasher))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_file_is_well_known() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").expect("write");
        let digest = compute_sha256(&path).expect("sha256 succeeds");
        assert_eq!(
            digest.as_str(),
            concat!(
                "e3b0c44298fc1c149afbf4c8996fb924",
                "27ae41e4649b934ca495991b7852b855"
            )
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(compute_sha256(&dir.path().join("absent")).is_err());
    }
}
