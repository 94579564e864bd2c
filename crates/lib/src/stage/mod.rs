//! Install staging.
//!
//! Places build outputs into the install prefix. Each pattern is expanded
//! relative to the rule's base directory and every match lands in the
//! destination under its own file name. A pattern that matches nothing is a
//! [`StageError::MissingArtifact`]; nothing from that rule is written.
//!
//! Existing destinations are replaced, so the last rule to write a path wins.

pub mod glob;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::formula::StageMode;
use crate::plan::StagingRule;

#[derive(Debug, Error)]
pub enum StageError {
  #[error("missing artifact: '{pattern}' matched nothing under {}", .base.display())]
  MissingArtifact { pattern: String, base: PathBuf },

  #[error("invalid pattern '{pattern}': {reason}")]
  InvalidPattern { pattern: String, reason: String },

  #[error("failed to stage {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Files written by a staging step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedPaths {
  /// Destination paths of every regular file or link created, in write order.
  pub files: Vec<PathBuf>,
}

impl StagedPaths {
  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

/// Expand every pattern of a rule without touching the destination.
///
/// # Errors
///
/// Fails on the first pattern with no matches.
pub fn collect(rule: &StagingRule) -> Result<Vec<PathBuf>, StageError> {
  let mut sources = Vec::new();
  for pattern in &rule.patterns {
    let matched = glob::expand(&rule.base, pattern)?;
    if matched.is_empty() {
      return Err(StageError::MissingArtifact {
        pattern: pattern.clone(),
        base: rule.base.clone(),
      });
    }
    sources.extend(matched);
  }
  Ok(sources)
}

/// Stage a rule into its destination directory.
pub fn stage(rule: &StagingRule) -> Result<StagedPaths, StageError> {
  let sources = collect(rule)?;

  fs::create_dir_all(&rule.dest).map_err(|source| StageError::Io {
    path: rule.dest.clone(),
    source,
  })?;

  let mut staged = StagedPaths::default();
  for source in &sources {
    let Some(name) = source.file_name() else {
      continue;
    };
    let target = rule.dest.join(name);
    remove_existing(&target)?;

    match rule.mode {
      StageMode::Copy if source.is_dir() => copy_tree(source, &target, &mut staged)?,
      StageMode::Copy => {
        copy_file(source, &target)?;
        staged.files.push(target);
      }
      StageMode::Symlink => {
        symlink(source, &target)?;
        staged.files.push(target);
      }
    }
    debug!(source = %source.display(), dest = %rule.dest.display(), "staged");
  }

  info!(dest = %rule.dest.display(), files = staged.len(), "staging complete");
  Ok(staged)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StageError + '_ {
  move |source| StageError::Io {
    path: path.to_path_buf(),
    source,
  }
}

fn remove_existing(target: &Path) -> Result<(), StageError> {
  let Ok(meta) = target.symlink_metadata() else {
    return Ok(());
  };
  if meta.is_dir() {
    fs::remove_dir_all(target).map_err(io_error(target))
  } else {
    fs::remove_file(target).map_err(io_error(target))
  }
}

fn copy_file(source: &Path, target: &Path) -> Result<(), StageError> {
  if source.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
    let link = fs::read_link(source).map_err(io_error(source))?;
    return symlink(&link, target);
  }
  fs::copy(source, target).map_err(io_error(target))?;
  Ok(())
}

fn copy_tree(source: &Path, target: &Path, staged: &mut StagedPaths) -> Result<(), StageError> {
  for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
    let entry = entry.map_err(|e| StageError::Io {
      path: source.to_path_buf(),
      source: e.into(),
    })?;
    let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
    let dest = target.join(relative);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&dest).map_err(io_error(&dest))?;
    } else {
      copy_file(entry.path(), &dest)?;
      staged.files.push(dest);
    }
  }
  Ok(())
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> Result<(), StageError> {
  std::os::unix::fs::symlink(source, target).map_err(io_error(target))
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> Result<(), StageError> {
  if source.is_dir() {
    std::os::windows::fs::symlink_dir(source, target).map_err(io_error(target))
  } else {
    std::os::windows::fs::symlink_file(source, target).map_err(io_error(target))
  }
}
