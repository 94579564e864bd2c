//! Implementation of the `kiln install` command.
//!
//! Resolves options and dependencies, compiles the build plan and runs it,
//! staging outputs into the prefix and writing an install receipt.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::debug;

use kiln_lib::deps::HostProbe;
use kiln_lib::execute::ExecuteConfig;
use kiln_lib::install::{InstallError, install};
use kiln_lib::plan::{Phase, PlanCompiler};

use super::{build_layout, check_flag_order, load_formula, warn_degraded};
use crate::TargetArgs;
use crate::output::{format_duration, print_info, print_stat, print_step, print_success};

pub fn cmd_install(
  formula_path: &Path,
  target: &TargetArgs,
  flags: &[String],
  dry_run: bool,
  timeout: Option<Duration>,
  verbose: bool,
) -> Result<()> {
  check_flag_order(flags)?;
  let formula = load_formula(formula_path)?;
  let layout = build_layout(&formula, target)?;

  if !dry_run && !layout.source_dir.is_dir() {
    bail!("Source directory not found: {}", layout.source_dir.display());
  }

  let config = ExecuteConfig {
    dry_run,
    verbose,
    timeout,
  };
  let probe = HostProbe::from_env();

  print_info(&format!("Installing {} {}", formula.name, formula.version));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(install(&formula, flags, &layout, &probe, &config))?;

  warn_degraded(&outcome.resolution.degraded());

  if formula.test.is_some() && outcome.plan.steps_in(Phase::Test).next().is_none() {
    debug!("no test runtime was active, tests skipped");
  }

  if dry_run {
    for (index, step) in outcome.plan.steps.iter().enumerate() {
      print_step(index, step.phase.as_str(), &step.name, &step.describe());
    }
    print_success(&format!(
      "Dry run: {} step(s) planned, nothing executed",
      outcome.plan.len()
    ));
    return Ok(());
  }

  let elapsed: Duration = outcome.report.steps.iter().map(|s| s.duration).sum();
  print_success(&format!("Installed {} {}", formula.name, formula.version));
  print_stat("Prefix", &layout.prefix.display().to_string());
  print_stat("Steps", &outcome.report.steps.len().to_string());
  if let Some((path, receipt)) = &outcome.receipt {
    print_stat("Files", &receipt.files.len().to_string());
    print_stat("Receipt", &path.display().to_string());
  }
  print_stat("Time", &format_duration(elapsed));

  if let Some(caveats) = &formula.caveats {
    let text = PlanCompiler::new(&formula, &layout)
      .expand(caveats, &outcome.resolution.options)
      .map_err(InstallError::from)?;
    println!();
    println!("Caveats:");
    for line in text.trim_end().lines() {
      println!("  {line}");
    }
  }

  Ok(())
}
