use std::path::Path;

use anyhow::Result;

use kiln_lib::install::InstallError;
use kiln_lib::source::verify_archive;

use super::load_formula;
use crate::output::print_success;

pub fn cmd_verify(formula_path: &Path, archive: &Path) -> Result<()> {
  let formula = load_formula(formula_path)?;
  let digest = verify_archive(&formula, archive).map_err(InstallError::from)?;
  print_success(&format!("{} matches {} ({})", archive.display(), formula.name, digest));
  Ok(())
}
