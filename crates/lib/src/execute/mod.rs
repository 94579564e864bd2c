//! Build plan execution.
//!
//! Steps run strictly in plan order, one at a time. The first failure aborts
//! the rest of the plan; nothing already done is rolled back. In dry-run mode
//! every step is recorded as planned and nothing is spawned or written.

pub mod actions;
pub mod types;

use std::time::Instant;

use tracing::{debug, error, info};

use crate::consts::STDERR_TAIL_LINES;
use crate::plan::{BuildPlan, BuildStep, StepAction};
use crate::stage;

use actions::{Deadline, execute_cmd, execute_edit, execute_verify, tail_lines};

pub use types::{ExecuteConfig, ExecuteError, ExecutionReport, FailureCause, StepOutcome, StepStatus};

/// Execute every step of a plan.
///
/// # Errors
///
/// - [`ExecuteError::StepFailed`] when a run step exits unsuccessfully, times
///   out or cannot start, an edit step cannot be applied, or a verified file
///   does not match its checksum
/// - [`ExecuteError::Staging`] when a staging step fails
pub async fn execute(plan: &BuildPlan, config: &ExecuteConfig) -> Result<ExecutionReport, ExecuteError> {
  info!(
    formula = %plan.formula,
    steps = plan.len(),
    dry_run = config.dry_run,
    "starting plan execution"
  );

  let deadline = config.timeout.map(Deadline::after);
  let mut report = ExecutionReport::default();

  for (index, step) in plan.steps.iter().enumerate() {
    if config.dry_run {
      info!(index, step = %step.name, "would run: {}", step.describe());
      report.steps.push(outcome(index, step, StepStatus::Planned));
      continue;
    }

    if let Some(deadline) = deadline
      && tokio::time::Instant::now() >= deadline.at
    {
      return Err(step_failed(index, step, FailureCause::Timeout(deadline.budget), ""));
    }

    info!(index, phase = %step.phase, step = %step.name, "running step");
    let started = Instant::now();
    let mut result = outcome(index, step, StepStatus::Completed);

    match &step.action {
      StepAction::Run(invocation) => {
        tokio::fs::create_dir_all(&invocation.cwd).await.map_err(|e| {
          step_failed(
            index,
            step,
            FailureCause::Spawn(format!("cannot create {}: {e}", invocation.cwd.display())),
            "",
          )
        })?;

        let output = execute_cmd(invocation, deadline).await.map_err(|failure| {
          error!(index, step = %step.name, cause = %failure.cause, "step failed");
          step_failed(index, step, failure.cause, &failure.stderr)
        })?;

        if config.verbose {
          for line in output.stdout.lines() {
            info!(step = %step.name, "{line}");
          }
          for line in output.stderr.lines() {
            info!(step = %step.name, stream = "stderr", "{line}");
          }
        }
        result.stdout = output.stdout;
        result.stderr = output.stderr;
      }
      StepAction::Edit { file, find, replace } => {
        execute_edit(file, find, replace)
          .await
          .map_err(|message| step_failed(index, step, FailureCause::Edit(message), ""))?;
      }
      StepAction::Verify { file, sha256 } => {
        execute_verify(file, sha256).map_err(|message| {
          error!(index, step = %step.name, "{message}");
          step_failed(index, step, FailureCause::Checksum(message), "")
        })?;
      }
      StepAction::Stage(rule) => {
        let staged = stage::stage(rule).map_err(|source| {
          error!(index, step = %step.name, error = %source, "staging failed");
          ExecuteError::Staging {
            index,
            name: step.name.clone(),
            source,
          }
        })?;
        result.staged = staged.files;
      }
    }

    result.duration = started.elapsed();
    debug!(index, step = %step.name, duration = ?result.duration, "step complete");
    report.steps.push(result);
  }

  info!(formula = %plan.formula, steps = report.steps.len(), "plan execution complete");
  Ok(report)
}

fn outcome(index: usize, step: &BuildStep, status: StepStatus) -> StepOutcome {
  StepOutcome {
    index,
    name: step.name.clone(),
    phase: step.phase,
    status,
    stdout: String::new(),
    stderr: String::new(),
    duration: Default::default(),
    staged: Vec::new(),
  }
}

fn step_failed(index: usize, step: &BuildStep, cause: FailureCause, stderr: &str) -> ExecuteError {
  ExecuteError::StepFailed {
    index,
    name: step.name.clone(),
    cause,
    stderr_tail: tail_lines(stderr, STDERR_TAIL_LINES),
  }
}
