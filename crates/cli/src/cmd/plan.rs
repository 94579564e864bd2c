//! Implementation of the `kiln plan` command.
//!
//! Compiles the build plan for the given flags and prints it without running
//! anything. Dependencies are still resolved against the host, so missing
//! ones fail here exactly as they would during install.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_lib::deps::HostProbe;
use kiln_lib::install::prepare;
use kiln_lib::util::hash::Hashable;

use super::{build_layout, check_flag_order, load_formula, warn_degraded};
use crate::TargetArgs;
use crate::output::{print_info, print_json, print_stat, print_step, truncate_hash};

pub fn cmd_plan(formula_path: &Path, target: &TargetArgs, flags: &[String], json: bool) -> Result<()> {
  check_flag_order(flags)?;
  let formula = load_formula(formula_path)?;
  let layout = build_layout(&formula, target)?;
  let prepared = prepare(&formula, flags, &layout, &HostProbe::from_env())?;
  let plan = &prepared.plan;

  if json {
    return print_json(plan);
  }

  let hash = plan.compute_hash().context("Failed to compute plan fingerprint")?;
  print_info(&format!("Plan for {} {} ({})", plan.formula, plan.version, truncate_hash(&hash.0)));
  print_stat("Prefix", &layout.prefix.display().to_string());
  print_stat("Source", &layout.source_dir.display().to_string());

  if !plan.dependencies.is_empty() {
    println!();
    println!("Dependencies:");
    for dep in &plan.dependencies {
      match &dep.variant {
        Some(variant) => println!("  {} [{}] ({})", dep.name, variant, dep.kind),
        None => println!("  {} ({})", dep.name, dep.kind),
      }
    }
  }

  println!();
  println!("Steps:");
  for (index, step) in plan.steps.iter().enumerate() {
    print_step(index, step.phase.as_str(), &step.name, &step.describe());
  }

  warn_degraded(&prepared.resolution.degraded());
  Ok(())
}
