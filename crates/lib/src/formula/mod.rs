//! Formula loading and validation.
//!
//! A formula is a TOML file describing one package: metadata, options,
//! dependencies, patches and the configure/build/docs/install/test sections. Every
//! conditional piece is data (a [`Condition`]) rather than control flow, so the
//! dependency graph and plan compiler evaluate them uniformly.
//!
//! Validation happens once at load time. Everything downstream may assume
//! that conditions and placeholders only reference declared options, that
//! install destinations stay inside the prefix, and that the dependency graph
//! is acyclic.

pub mod condition;
pub mod types;

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::deps::graph::order_dependencies;
use crate::options::{OptionKind, OptionSet, OptionSpec, OptionValue};
use crate::placeholder;

pub use condition::{Condition, holds};
pub use types::*;

#[derive(Debug, Error)]
pub enum FormulaError {
  #[error("failed to read formula {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse formula: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid formula: {0}")]
  Invalid(String),

  #[error("dependency cycle involving '{0}'")]
  DependencyCycle(String),
}

fn invalid(message: impl Into<String>) -> FormulaError {
  FormulaError::Invalid(message.into())
}

impl Formula {
  /// Load and validate a formula file.
  pub fn from_path(path: &Path) -> Result<Self, FormulaError> {
    let read_err = |source| FormulaError::Read {
      path: path.to_path_buf(),
      source,
    };
    let content = std::fs::read_to_string(path).map_err(read_err)?;
    debug!(path = %path.display(), "loaded formula file");
    let mut formula = Self::from_toml(&content)?;
    // Patch steps run inside the source tree, so the directory must be absolute
    let absolute = std::path::absolute(path).map_err(read_err)?;
    formula.dir = absolute.parent().map(Path::to_path_buf);
    Ok(formula)
  }

  /// Parse and validate formula TOML.
  pub fn from_toml(content: &str) -> Result<Self, FormulaError> {
    let formula: Formula = toml::from_str(content)?;
    formula.validate()?;
    Ok(formula)
  }

  /// All options this formula accepts, including the implicit ones that
  /// recommended and optional dependencies declare.
  pub fn option_set(&self) -> OptionSet {
    let mut specs: Vec<OptionSpec> = self
      .options
      .iter()
      .map(|decl| OptionSpec {
        name: decl.name.clone(),
        kind: decl.kind,
        default: decl.default.clone().unwrap_or_else(|| match decl.kind {
          OptionKind::Boolean => OptionValue::Flag(false),
          OptionKind::Valued => OptionValue::Text(String::new()),
        }),
        help: decl.help.clone(),
      })
      .collect();

    for dep in self.dependencies.iter().filter(|d| d.kind.has_option()) {
      if specs.iter().any(|s| s.name == dep.name) {
        continue;
      }
      let recommended = dep.kind == DependencyKind::Recommended;
      let help = if recommended {
        format!("Build without {} support", dep.name)
      } else {
        format!("Build with {} support", dep.name)
      };
      specs.push(OptionSpec::boolean(&dep.name, recommended, &help));
    }

    OptionSet::new(specs)
  }

  /// Check internal consistency.
  pub fn validate(&self) -> Result<(), FormulaError> {
    if !is_valid_name(&self.name) {
      return Err(invalid(format!("formula name '{}' is not a valid identifier", self.name)));
    }
    if self.version.trim().is_empty() {
      return Err(invalid("version must not be empty"));
    }

    let options = self.validate_options()?;
    self.validate_dependencies(&options)?;
    self.validate_sections(&options)?;
    Ok(())
  }

  fn validate_options(&self) -> Result<OptionSet, FormulaError> {
    let mut seen = HashSet::new();
    for decl in &self.options {
      if !is_valid_name(&decl.name) {
        return Err(invalid(format!("option name '{}' is not a valid identifier", decl.name)));
      }
      if !seen.insert(decl.name.as_str()) {
        return Err(invalid(format!("option '{}' is declared twice", decl.name)));
      }
    }

    let options = self.option_set();
    for spec in options.iter() {
      if !OptionSet::default_matches_kind(spec) {
        return Err(invalid(format!("default of option '{}' does not match its kind", spec.name)));
      }
    }
    Ok(options)
  }

  fn validate_dependencies(&self, options: &OptionSet) -> Result<(), FormulaError> {
    let mut seen = HashSet::new();
    for dep in &self.dependencies {
      if !is_valid_name(&dep.name) {
        return Err(invalid(format!("dependency name '{}' is not a valid identifier", dep.name)));
      }
      if !seen.insert(dep.name.as_str()) {
        return Err(invalid(format!("dependency '{}' is declared twice", dep.name)));
      }
      if dep.kind.has_option()
        && let Some(spec) = options.get(&dep.name)
        && spec.kind != OptionKind::Boolean
      {
        return Err(invalid(format!(
          "option '{}' controls a {} dependency and must be boolean",
          dep.name, dep.kind
        )));
      }
      check_condition(dep.when.as_ref(), options, &format!("dependency '{}'", dep.name))?;
      check_condition(dep.variant_when.as_ref(), options, &format!("variant of dependency '{}'", dep.name))?;
      if dep.variant_when.is_some() && dep.variant.is_none() {
        return Err(invalid(format!("dependency '{}' has variant_when but no variant", dep.name)));
      }
    }

    for dep in &self.dependencies {
      for after in &dep.after {
        if after == &dep.name {
          return Err(FormulaError::DependencyCycle(dep.name.clone()));
        }
        if !seen.contains(after.as_str()) {
          return Err(invalid(format!(
            "dependency '{}' comes after unknown dependency '{}'",
            dep.name, after
          )));
        }
      }
    }

    let all: Vec<&DependencyDecl> = self.dependencies.iter().collect();
    order_dependencies(&all).map_err(FormulaError::DependencyCycle)?;
    Ok(())
  }

  fn validate_sections(&self, options: &OptionSet) -> Result<(), FormulaError> {
    if let Some(caveats) = &self.caveats {
      check_strings(std::iter::once(caveats), options, "caveats")?;
    }
    for patch in &self.patches {
      let context = format!("patch '{}'", patch.file);
      check_relative(&patch.file, &context)?;
      if let Some(sum) = &patch.sha256
        && !(sum.len() == 64 && sum.chars().all(|c| c.is_ascii_hexdigit()))
      {
        return Err(invalid(format!("{context}: sha256 must be 64 hex digits")));
      }
      check_condition(patch.when.as_ref(), options, &context)?;
    }

    check_strings(
      std::iter::once(&self.configure.program)
        .chain(&self.configure.args)
        .chain(self.configure.env.values()),
      options,
      "configure",
    )?;
    for (i, switch) in self.configure.switches.iter().enumerate() {
      let context = format!("configure switch {}", i + 1);
      check_condition(Some(&switch.when), options, &context)?;
      check_strings(switch.enabled.iter().chain(&switch.disabled), options, &context)?;
    }

    check_strings(
      std::iter::once(&self.build.program)
        .chain(&self.build.args)
        .chain(self.build.env.values()),
      options,
      "build",
    )?;

    if let Some(docs) = &self.docs {
      match options.get(&docs.option) {
        Some(spec) if spec.kind == OptionKind::Boolean => {}
        Some(_) => return Err(invalid(format!("docs option '{}' must be boolean", docs.option))),
        None => return Err(invalid(format!("docs option '{}' is not declared", docs.option))),
      }
      for step in &docs.steps {
        match step {
          DocStepDecl::Run { program, args, env } => {
            check_strings(std::iter::once(program).chain(args).chain(env.values()), options, "docs")?;
          }
          DocStepDecl::Edit { file, find, .. } => {
            check_relative(file, "docs edit file")?;
            if find.is_empty() {
              return Err(invalid(format!("docs edit of '{file}' has an empty search text")));
            }
          }
        }
      }
    }

    for rule in &self.install {
      let context = format!("install rule for '{}'", rule.dest);
      check_relative(&rule.dest, &context)?;
      if rule.sources.is_empty() {
        return Err(invalid(format!("{context} has no sources")));
      }
      for source in &rule.sources {
        check_relative(source, &context)?;
      }
      check_condition(rule.when.as_ref(), options, &context)?;
    }

    if let Some(test) = &self.test {
      check_condition(test.when.as_ref(), options, "test")?;
      for fixture in &test.fixtures {
        check_relative(fixture, "test fixture")?;
      }
      for run in &test.runs {
        let context = format!("test run '{}'", run.name);
        check_condition(run.when.as_ref(), options, &context)?;
        check_strings(
          std::iter::once(&run.program).chain(&run.args).chain(run.env.values()),
          options,
          &context,
        )?;
      }
    }

    Ok(())
  }
}

fn is_valid_name(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with('-')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/'))
}

fn check_condition(condition: Option<&Condition>, options: &OptionSet, context: &str) -> Result<(), FormulaError> {
  let Some(condition) = condition else {
    return Ok(());
  };
  for name in condition.option_names() {
    if options.get(name).is_none() {
      return Err(invalid(format!("{context} references unknown option '{name}'")));
    }
  }
  Ok(())
}

fn check_strings<'a>(
  values: impl IntoIterator<Item = &'a String>,
  options: &OptionSet,
  context: &str,
) -> Result<(), FormulaError> {
  for value in values {
    let names = placeholder::referenced_options(value).map_err(|e| invalid(format!("{context}: {e}")))?;
    for name in names {
      if options.get(&name).is_none() {
        return Err(invalid(format!("{context} references unknown option '{name}'")));
      }
    }
  }
  Ok(())
}

/// Paths in rules must be relative and must not climb out of their root.
fn check_relative(path: &str, context: &str) -> Result<(), FormulaError> {
  let p = Path::new(path);
  if path.is_empty() || p.is_absolute() {
    return Err(invalid(format!("{context}: path '{path}' must be relative")));
  }
  if p.components().any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))) {
    return Err(invalid(format!("{context}: path '{path}' must not leave its root")));
  }
  Ok(())
}
