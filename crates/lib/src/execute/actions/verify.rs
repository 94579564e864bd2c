//! Checksum checks for local inputs such as patch files.

use std::path::Path;

use tracing::debug;

use crate::util::hash::hash_file;

/// Compare the SHA-256 of `file` with `expected`, ignoring case.
pub fn execute_verify(file: &Path, expected: &str) -> Result<(), String> {
  let actual = hash_file(file).map_err(|e| e.to_string())?.0;
  if !actual.eq_ignore_ascii_case(expected.trim()) {
    return Err(format!("{}: expected {expected}, got {actual}", file.display()));
  }
  debug!(file = %file.display(), "checksum verified");
  Ok(())
}
