//! Types for plan execution.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::plan::Phase;
use crate::stage::StageError;

/// Configuration for executing a build plan.
#[derive(Debug, Clone, Default)]
pub struct ExecuteConfig {
  /// Record every step as planned without running anything.
  pub dry_run: bool,
  /// Log captured stdout/stderr of every run step.
  pub verbose: bool,
  /// Deadline for the whole plan. The running child is killed when it passes.
  pub timeout: Option<Duration>,
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
  /// The process exited unsuccessfully. `None` when killed by a signal.
  Exit(Option<i32>),
  /// The overall deadline passed while the step was running.
  Timeout(Duration),
  /// The process could not be started.
  Spawn(String),
  /// A file edit could not be applied.
  Edit(String),
  /// A file did not match its declared checksum.
  Checksum(String),
}

impl fmt::Display for FailureCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureCause::Exit(Some(code)) => write!(f, "exited with status {code}"),
      FailureCause::Exit(None) => f.write_str("terminated by signal"),
      FailureCause::Timeout(after) => write!(f, "timed out after {}s", after.as_secs_f64()),
      FailureCause::Spawn(message) => write!(f, "failed to start: {message}"),
      FailureCause::Edit(message) => write!(f, "edit failed: {message}"),
      FailureCause::Checksum(message) => write!(f, "checksum failed: {message}"),
    }
  }
}

/// Errors that abort plan execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("step {index} ({name}) failed: {cause}{}", format_tail(.stderr_tail))]
  StepFailed {
    index: usize,
    name: String,
    cause: FailureCause,
    stderr_tail: Vec<String>,
  },

  #[error("step {index} ({name}): {source}")]
  Staging {
    index: usize,
    name: String,
    #[source]
    source: StageError,
  },
}

impl ExecuteError {
  /// Index of the failing step within the plan.
  pub fn index(&self) -> usize {
    match self {
      ExecuteError::StepFailed { index, .. } | ExecuteError::Staging { index, .. } => *index,
    }
  }
}

fn format_tail(tail: &[String]) -> String {
  if tail.is_empty() {
    return String::new();
  }
  let mut out = String::from("\n--- stderr (tail) ---");
  for line in tail {
    out.push('\n');
    out.push_str(line);
  }
  out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Completed,
  /// Dry run; nothing was executed.
  Planned,
}

/// Result of a single step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
  pub index: usize,
  pub name: String,
  pub phase: Phase,
  pub status: StepStatus,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub stdout: String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub stderr: String,
  pub duration: Duration,
  /// Files written by a staging step.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub staged: Vec<PathBuf>,
}

/// Outcome of executing a whole plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
  pub steps: Vec<StepOutcome>,
}

impl ExecutionReport {
  /// Every file staged into the prefix, in write order.
  pub fn staged_files(&self) -> impl Iterator<Item = &PathBuf> {
    self.steps.iter().flat_map(|s| s.staged.iter())
  }

  pub fn is_dry_run(&self) -> bool {
    self.steps.iter().any(|s| s.status == StepStatus::Planned)
  }
}
