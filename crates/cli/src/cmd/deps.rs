//! Implementation of the `kiln deps` command.

use std::path::Path;

use anyhow::Result;

use kiln_lib::deps::{DependencyGraph, HostProbe};
use kiln_lib::install::InstallError;

use super::{check_flag_order, load_formula, warn_degraded};
use crate::output::{print_info, print_json, symbols};

pub fn cmd_deps(formula_path: &Path, flags: &[String], json: bool) -> Result<()> {
  check_flag_order(flags)?;
  let formula = load_formula(formula_path)?;
  let options = formula.option_set().resolve(flags).map_err(InstallError::from)?;
  let resolution = DependencyGraph::new(&formula)
    .resolve(&options, &HostProbe::from_env())
    .map_err(InstallError::from)?;

  if json {
    return print_json(&resolution.dependencies);
  }

  if resolution.dependencies.is_empty() {
    print_info("No dependencies needed for these options");
  }
  for dep in &resolution.dependencies {
    let variant = dep.variant.as_deref().map(|v| format!(" [{v}]")).unwrap_or_default();
    println!("{}{} ({}) {} {}", dep.name, variant, dep.kind, symbols::ARROW, dep.location);
  }

  warn_degraded(&resolution.degraded());
  Ok(())
}
