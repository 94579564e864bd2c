//! Run step implementation.
//!
//! Spawns an [`Invocation`] directly (no shell), inheriting the caller's
//! environment plus the step's own variables. Output is captured in full.
//! On unix the child leads its own process group so a timeout can take down
//! everything it spawned.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::execute::types::FailureCause;
use crate::plan::Invocation;

/// Absolute deadline for the whole plan, plus the budget it was derived from.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  pub at: Instant,
  pub budget: Duration,
}

impl Deadline {
  pub fn after(budget: Duration) -> Self {
    Self {
      at: Instant::now() + budget,
      budget,
    }
  }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
}

/// A failed run, with whatever stderr was captured.
#[derive(Debug, Clone)]
pub struct CommandFailure {
  pub cause: FailureCause,
  pub stderr: String,
}

impl CommandFailure {
  fn without_output(cause: FailureCause) -> Self {
    Self {
      cause,
      stderr: String::new(),
    }
  }
}

/// Run an invocation to completion.
pub async fn execute_cmd(invocation: &Invocation, deadline: Option<Deadline>) -> Result<CommandOutput, CommandFailure> {
  info!(cmd = %invocation.command_line(), "executing command");

  let program = resolve_program(&invocation.program, &invocation.cwd);
  let mut command = Command::new(&program);
  command
    .args(&invocation.args)
    .current_dir(&invocation.cwd)
    .envs(&invocation.env)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  #[cfg(unix)]
  command.process_group(0);

  debug!(program = %program.display(), working_dir = ?invocation.cwd, "spawning process");

  let child = command
    .spawn()
    .map_err(|e| CommandFailure::without_output(FailureCause::Spawn(format!("{}: {e}", invocation.program))))?;
  let pid = child.id();

  let waited = child.wait_with_output();
  let output = match deadline {
    Some(deadline) => match tokio::time::timeout_at(deadline.at, waited).await {
      Ok(result) => result,
      Err(_) => {
        warn!(cmd = %invocation.program, "deadline passed, killing process group");
        kill_group(pid);
        return Err(CommandFailure::without_output(FailureCause::Timeout(deadline.budget)));
      }
    },
    None => waited.await,
  }
  .map_err(|e| CommandFailure::without_output(FailureCause::Spawn(e.to_string())))?;

  let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
  let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

  if !output.status.success() {
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    return Err(CommandFailure {
      cause: FailureCause::Exit(output.status.code()),
      stderr,
    });
  }

  Ok(CommandOutput { stdout, stderr })
}

/// Relative programs with a directory part (`./configure`) are looked up in
/// the working directory; bare names go through `PATH`.
fn resolve_program(program: &str, cwd: &Path) -> PathBuf {
  let path = Path::new(program);
  if path.is_relative() && path.components().count() > 1 {
    cwd.join(path)
  } else {
    path.to_path_buf()
  }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
  if let Some(pid) = pid
    && let Ok(pgid) = libc::pid_t::try_from(pid)
  {
    // SAFETY: killpg only sends a signal; the group was created for this child.
    unsafe {
      libc::killpg(pgid, libc::SIGKILL);
    }
  }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Last `limit` lines of captured output.
pub fn tail_lines(output: &str, limit: usize) -> Vec<String> {
  let lines: Vec<&str> = output.lines().collect();
  let start = lines.len().saturating_sub(limit);
  lines[start..].iter().map(|l| l.to_string()).collect()
}
