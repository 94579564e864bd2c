//! The install pipeline.
//!
//! Option resolution → dependency resolution → plan compilation → execution →
//! receipt. Each stage only sees the output of the previous one, and nothing
//! is executed until every earlier stage has succeeded.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::deps::{DependencyError, DependencyGraph, Probe, Resolution};
use crate::execute::{self, ExecuteConfig, ExecuteError, ExecutionReport};
use crate::formula::{Formula, FormulaError};
use crate::options::OptionError;
use crate::plan::{BuildLayout, BuildPlan, PlanCompiler, PlanError};
use crate::receipt::{InstallReceipt, ReceiptError};
use crate::source::VerifyError;

/// Any error the pipeline can end with.
#[derive(Debug, Error)]
pub enum InstallError {
  #[error(transparent)]
  Formula(#[from] FormulaError),

  #[error(transparent)]
  Option(#[from] OptionError),

  #[error(transparent)]
  Dependency(#[from] DependencyError),

  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Receipt(#[from] ReceiptError),

  #[error(transparent)]
  Verify(#[from] VerifyError),
}

impl InstallError {
  /// Process exit code for this error.
  ///
  /// | code | meaning |
  /// |------|---------|
  /// | 1 | invalid option or formula |
  /// | 2 | unsatisfied dependency |
  /// | 3 | build step failed, or checksum mismatch |
  /// | 4 | staging failed |
  pub fn exit_code(&self) -> i32 {
    match self {
      InstallError::Formula(_) | InstallError::Option(_) | InstallError::Plan(_) => 1,
      InstallError::Dependency(_) => 2,
      InstallError::Execute(ExecuteError::StepFailed { .. }) => 3,
      InstallError::Execute(ExecuteError::Staging { .. }) => 4,
      InstallError::Receipt(_) => 4,
      InstallError::Verify(VerifyError::Mismatch { .. }) => 3,
      InstallError::Verify(_) => 1,
    }
  }
}

/// Everything decided before execution starts.
#[derive(Debug, Clone)]
pub struct Prepared {
  pub resolution: Resolution,
  pub plan: BuildPlan,
}

/// Result of a completed install.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
  pub plan: BuildPlan,
  pub resolution: Resolution,
  pub report: ExecutionReport,
  /// Absent for dry runs.
  pub receipt: Option<(PathBuf, InstallReceipt)>,
}

/// Resolve options and dependencies, then compile the plan.
pub fn prepare<S: AsRef<str>>(
  formula: &Formula,
  flags: &[S],
  layout: &BuildLayout,
  probe: &dyn Probe,
) -> Result<Prepared, InstallError> {
  let options = formula.option_set().resolve(flags)?;
  let resolution = DependencyGraph::new(formula).resolve(&options, probe)?;
  let plan = PlanCompiler::new(formula, layout).compile(&resolution.options, &resolution.dependencies)?;
  Ok(Prepared { resolution, plan })
}

/// Run the whole pipeline.
pub async fn install<S: AsRef<str>>(
  formula: &Formula,
  flags: &[S],
  layout: &BuildLayout,
  probe: &dyn Probe,
  config: &ExecuteConfig,
) -> Result<InstallOutcome, InstallError> {
  let Prepared { resolution, plan } = prepare(formula, flags, layout, probe)?;
  let report = execute::execute(&plan, config).await?;

  let receipt = if config.dry_run {
    None
  } else {
    let receipt = InstallReceipt::from_report(&plan, resolution.options.flags(), resolution.degraded(), &report)?;
    let path = receipt.write(&layout.prefix)?;
    Some((path, receipt))
  };

  info!(
    formula = %formula.name,
    version = %formula.version,
    prefix = %layout.prefix.display(),
    "install finished"
  );

  Ok(InstallOutcome {
    plan,
    resolution,
    report,
    receipt,
  })
}
