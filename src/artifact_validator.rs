//! Validates downloaded artifact integrity using SHA-256 checksums.
//!
//! When an expected digest is configured, the downloaded bytes must match it
//! before they are parsed.

use sha2::{Digest, Sha256};
use std::fmt;

/// Downloaded bytes did not hash to the pinned digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityError {
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checksum mismatch: expected sha256 {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for IntegrityError {}

/// Computes the hex-encoded SHA-256 of `data`.
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Checks `data` against an optional pinned digest.
///
/// Returns the computed digest so callers can log it; comparison ignores case.
pub fn verify(data: &[u8], expected: Option<&str>) -> Result<String, IntegrityError> {
    let actual = compute_checksum(data);

    match expected {
        Some(expected) if !expected.eq_ignore_ascii_case(&actual) => {
            tracing::warn!(
                "Artifact validation failed: checksum mismatch. Expected: {}, Data length: {}",
                expected,
                data.len()
            );
            Err(IntegrityError {
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
        _ => Ok(actual),
    }
}
