mod deps;
mod info;
mod install;
mod options;
mod plan;
mod verify;

use std::path::Path;

use anyhow::{Context, Result, bail};

use kiln_lib::formula::Formula;
use kiln_lib::install::InstallError;
use kiln_lib::plan::BuildLayout;
use kiln_lib::platform::paths;

use crate::TargetArgs;
use crate::output::print_warning;

pub use deps::cmd_deps;
pub use info::cmd_info;
pub use install::cmd_install;
pub use options::cmd_options;
pub use plan::cmd_plan;
pub use verify::cmd_verify;

/// Kiln's own flags. Once the first formula option is seen, clap hands every
/// later argument to the formula, these included.
const KILN_FLAGS: &[&str] = &[
  "--prefix",
  "--source-dir",
  "--dry-run",
  "--timeout",
  "--json",
  "--verbose",
  "-v",
];

/// Reject kiln flags that ended up among the formula options.
fn check_flag_order(flags: &[String]) -> Result<()> {
  let misplaced = flags
    .iter()
    .find(|flag| KILN_FLAGS.contains(&flag.split_once('=').map_or(flag.as_str(), |(name, _)| name)));
  if let Some(flag) = misplaced {
    bail!("{flag} must come before the formula options");
  }
  Ok(())
}

/// Load a formula, keeping its error typed so the exit code survives.
fn load_formula(path: &Path) -> Result<Formula> {
  Ok(Formula::from_path(path).map_err(InstallError::from)?)
}

/// Resolve `--prefix` and `--source-dir` into absolute paths.
fn build_layout(formula: &Formula, target: &TargetArgs) -> Result<BuildLayout> {
  let prefix = match &target.prefix {
    Some(prefix) => std::path::absolute(prefix).with_context(|| format!("Invalid prefix: {}", prefix.display()))?,
    None => paths::default_prefix(&formula.name, &formula.version)
      .context("Cannot determine a default prefix; pass --prefix or set KILN_ROOT")?,
  };

  let source_dir = dunce::canonicalize(&target.source_dir)
    .or_else(|_| std::path::absolute(&target.source_dir))
    .with_context(|| format!("Invalid source directory: {}", target.source_dir.display()))?;

  Ok(BuildLayout::new(prefix, source_dir))
}

fn warn_degraded(degraded: &[String]) {
  for name in degraded {
    print_warning(&format!("{name} not found, building without it"));
  }
}
