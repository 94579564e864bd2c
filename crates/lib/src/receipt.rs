//! Install receipts.
//!
//! A receipt records what was installed into a prefix and how: the flags the
//! user passed, which options were switched off because a recommended
//! dependency was missing, the dependencies the build used and a content hash
//! of every staged file. It is written as `INSTALL_RECEIPT.json` at the
//! prefix root after a successful install.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::RECEIPT_FILE;
use crate::deps::ResolvedDependency;
use crate::execute::ExecutionReport;
use crate::plan::BuildPlan;
use crate::util::hash::{ContentHash, HashError, hash_file};

#[derive(Debug, Error)]
pub enum ReceiptError {
  #[error(transparent)]
  Hash(#[from] HashError),

  #[error("failed to write receipt {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read receipt {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed receipt: {0}")]
  Json(#[from] serde_json::Error),
}

/// A staged file and its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
  /// Path relative to the prefix.
  pub path: PathBuf,
  pub sha256: ContentHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
  pub formula: String,
  pub version: String,
  /// Option flags exactly as passed.
  pub options: Vec<String>,
  /// Options switched off because a recommended dependency was missing.
  #[serde(default)]
  pub degraded: Vec<String>,
  pub dependencies: Vec<ResolvedDependency>,
  pub files: Vec<StagedFile>,
  /// Seconds since the Unix epoch.
  pub installed_at: u64,
}

impl InstallReceipt {
  /// Build a receipt from an executed plan, hashing every staged file.
  ///
  /// A path staged more than once is recorded once, with its final content.
  pub fn from_report(
    plan: &BuildPlan,
    flags: &[String],
    degraded: Vec<String>,
    report: &ExecutionReport,
  ) -> Result<Self, ReceiptError> {
    let prefix = plan.prefix();
    let mut files: Vec<StagedFile> = Vec::new();

    for staged in report.staged_files() {
      // Test fixtures land in the scratch directory, outside the prefix
      let Ok(relative) = staged.strip_prefix(prefix) else {
        continue;
      };
      // Symlinks are recorded by their target's content; linked directories are skipped.
      // A later rule may have replaced the tree this file was staged into.
      match staged.metadata() {
        Ok(meta) if meta.is_dir() => continue,
        Ok(_) => {}
        Err(_) => {
          debug!(path = %staged.display(), "staged file no longer present, skipping");
          continue;
        }
      }
      let sha256 = hash_file(staged)?;
      let path = relative.to_path_buf();
      match files.iter_mut().find(|f| f.path == path) {
        Some(existing) => existing.sha256 = sha256,
        None => files.push(StagedFile { path, sha256 }),
      }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(Self {
      formula: plan.formula.clone(),
      version: plan.version.clone(),
      options: flags.to_vec(),
      degraded,
      dependencies: plan.dependencies.clone(),
      files,
      installed_at: now_secs(),
    })
  }

  pub fn path_in(prefix: &Path) -> PathBuf {
    prefix.join(RECEIPT_FILE)
  }

  /// Write the receipt at the prefix root.
  pub fn write(&self, prefix: &Path) -> Result<PathBuf, ReceiptError> {
    let path = Self::path_in(prefix);
    let json = serde_json::to_string_pretty(self)?;
    let write_err = |source| ReceiptError::Write {
      path: path.clone(),
      source,
    };
    std::fs::create_dir_all(prefix).map_err(write_err)?;
    std::fs::write(&path, json).map_err(write_err)?;
    info!(path = %path.display(), files = self.files.len(), "wrote install receipt");
    Ok(path)
  }

  pub fn load(prefix: &Path) -> Result<Self, ReceiptError> {
    let path = Self::path_in(prefix);
    let content = std::fs::read_to_string(&path).map_err(|source| ReceiptError::Read { path, source })?;
    Ok(serde_json::from_str(&content)?)
  }
}

fn now_secs() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or_default()
}
