//! In-place file edits.

use std::path::Path;

use tracing::debug;

/// Replace every occurrence of `find` in `file` with `replace`.
///
/// Fails when the file cannot be read or written, or when `find` does not
/// occur in it.
pub async fn execute_edit(file: &Path, find: &str, replace: &str) -> Result<usize, String> {
  let contents = tokio::fs::read_to_string(file)
    .await
    .map_err(|e| format!("cannot read {}: {e}", file.display()))?;

  let count = contents.matches(find).count();
  if count == 0 {
    return Err(format!("search text not found in {}", file.display()));
  }

  tokio::fs::write(file, contents.replace(find, replace))
    .await
    .map_err(|e| format!("cannot write {}: {e}", file.display()))?;

  debug!(file = %file.display(), replacements = count, "edited file");
  Ok(count)
}
