use std::path::Path;

use anyhow::Result;

use super::load_formula;
use crate::output::{print_info, print_stat};

pub fn cmd_info(formula_path: &Path) -> Result<()> {
  let formula = load_formula(formula_path)?;

  print_info(&format!("{} {}", formula.name, formula.version));
  if let Some(description) = &formula.description {
    println!("  {description}");
  }
  if let Some(homepage) = &formula.homepage {
    print_stat("Homepage", homepage);
  }
  if let Some(source) = &formula.source {
    print_stat("Source", &source.url);
    if let Some(sha256) = &source.sha256 {
      print_stat("SHA-256", sha256);
    }
    if let Some(sha1) = &source.sha1 {
      print_stat("SHA-1", sha1);
    }
  }
  print_stat("Options", &formula.option_set().len().to_string());
  print_stat("Dependencies", &formula.dependencies.len().to_string());

  if let Some(caveats) = &formula.caveats {
    println!();
    println!("Caveats:");
    for line in caveats.trim_end().lines() {
      println!("  {line}");
    }
  }
  Ok(())
}
