use std::path::Path;

use anyhow::Result;

use kiln_lib::options::{OptionKind, OptionValue};

use super::load_formula;
use crate::output::print_info;

pub fn cmd_options(formula_path: &Path) -> Result<()> {
  let formula = load_formula(formula_path)?;
  let options = formula.option_set();

  if options.is_empty() {
    print_info(&format!("{} has no options", formula.name));
    return Ok(());
  }

  for spec in options.iter() {
    let default = match (&spec.kind, &spec.default) {
      (OptionKind::Boolean, OptionValue::Flag(true)) => " (default: on)",
      (OptionKind::Boolean, _) => " (default: off)",
      (OptionKind::Valued, _) => "",
    };
    println!("{}", spec.usage());
    println!("    {}{}", spec.help, default);
  }
  Ok(())
}
