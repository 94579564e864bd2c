//! Source archive verification.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::formula::Formula;
use crate::util::hash::{HashError, hash_file, sha1_file};

#[derive(Debug, Error)]
pub enum VerifyError {
  #[error("formula '{0}' declares no source checksum")]
  NoChecksum(String),

  #[error("checksum mismatch: expected {expected}, got {actual}")]
  Mismatch { expected: String, actual: String },

  #[error(transparent)]
  Io(#[from] HashError),
}

/// Check an archive against the formula's declared checksum.
///
/// SHA-256 is used when declared, SHA-1 otherwise. Returns the verified
/// digest. Comparison ignores case.
pub fn verify_archive(formula: &Formula, archive: &Path) -> Result<String, VerifyError> {
  let source = formula.source.as_ref();
  let (algorithm, expected, digest): (&str, &str, fn(&Path) -> Result<String, HashError>) = match (
    source.and_then(|s| s.sha256.as_deref()),
    source.and_then(|s| s.sha1.as_deref()),
  ) {
    (Some(sum), _) => ("sha256", sum, |path| hash_file(path).map(|h| h.0)),
    (None, Some(sum)) => ("sha1", sum, sha1_file),
    (None, None) => return Err(VerifyError::NoChecksum(formula.name.clone())),
  };

  debug!(archive = %archive.display(), algorithm, "hashing source archive");
  let actual = digest(archive)?;

  if !actual.eq_ignore_ascii_case(expected.trim()) {
    return Err(VerifyError::Mismatch {
      expected: expected.to_string(),
      actual,
    });
  }

  info!(formula = %formula.name, algorithm, digest = %actual, "source archive verified");
  Ok(actual)
}
