//! Gating conditions over resolved options.

use serde::{Deserialize, Serialize};

use crate::options::ResolvedOptions;

/// A predicate over resolved options.
///
/// Conditions are written as single-key tables in formulas:
///
/// ```toml
/// when = { with = "doc" }
/// when = { all = [{ with = "matlab" }, { with = "matlab-version" }] }
/// when = { not = { with = "octave" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
  /// The option is on (boolean true, or valued and non-empty).
  With(String),
  /// The option is off.
  Without(String),
  All(Vec<Condition>),
  Any(Vec<Condition>),
  Not(Box<Condition>),
}

impl Condition {
  pub fn evaluate(&self, options: &ResolvedOptions) -> bool {
    match self {
      Condition::With(name) => options.enabled(name),
      Condition::Without(name) => !options.enabled(name),
      Condition::All(conditions) => conditions.iter().all(|c| c.evaluate(options)),
      Condition::Any(conditions) => conditions.iter().any(|c| c.evaluate(options)),
      Condition::Not(inner) => !inner.evaluate(options),
    }
  }

  /// Every option name this condition mentions.
  pub fn option_names(&self) -> Vec<&str> {
    let mut names = Vec::new();
    self.collect_names(&mut names);
    names
  }

  fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
    match self {
      Condition::With(name) | Condition::Without(name) => names.push(name),
      Condition::All(conditions) | Condition::Any(conditions) => {
        for c in conditions {
          c.collect_names(names);
        }
      }
      Condition::Not(inner) => inner.collect_names(names),
    }
  }
}

/// Evaluate an optional condition; a missing condition always holds.
pub fn holds(condition: Option<&Condition>, options: &ResolvedOptions) -> bool {
  condition.is_none_or(|c| c.evaluate(options))
}
