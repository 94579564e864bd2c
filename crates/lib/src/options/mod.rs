//! Build options and flag resolution.
//!
//! A formula declares the options a user may toggle. Raw flags of the form
//! `--with-<name>`, `--with-<name>=<value>` and `--without-<name>` are resolved
//! against those declarations into an immutable [`ResolvedOptions`] that is
//! threaded through dependency resolution and plan compilation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Whether an option is a plain switch or carries a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
  #[default]
  Boolean,
  Valued,
}

/// The value of an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
  Flag(bool),
  Text(String),
}

impl OptionValue {
  /// Returns true for `Flag(true)` and for non-empty text.
  ///
  /// A valued option that is present but empty counts as off.
  pub fn is_enabled(&self) -> bool {
    match self {
      OptionValue::Flag(on) => *on,
      OptionValue::Text(text) => !text.is_empty(),
    }
  }

  fn matches_kind(&self, kind: OptionKind) -> bool {
    matches!(
      (self, kind),
      (OptionValue::Flag(_), OptionKind::Boolean) | (OptionValue::Text(_), OptionKind::Valued)
    )
  }
}

impl fmt::Display for OptionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OptionValue::Flag(on) => write!(f, "{on}"),
      OptionValue::Text(text) => write!(f, "{text}"),
    }
  }
}

/// Where a resolved option value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
  /// The option's declared default.
  Default,
  /// Set explicitly by a user flag.
  User,
  /// Turned off because a recommended dependency was missing.
  Degraded,
}

/// A declared option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSpec {
  pub name: String,
  pub kind: OptionKind,
  pub default: OptionValue,
  pub help: String,
}

impl OptionSpec {
  /// Create a boolean option with the given default.
  pub fn boolean(name: &str, default: bool, help: &str) -> Self {
    Self {
      name: name.to_string(),
      kind: OptionKind::Boolean,
      default: OptionValue::Flag(default),
      help: help.to_string(),
    }
  }

  /// Create a valued option with an empty default.
  pub fn valued(name: &str, help: &str) -> Self {
    Self {
      name: name.to_string(),
      kind: OptionKind::Valued,
      default: OptionValue::Text(String::new()),
      help: help.to_string(),
    }
  }

  /// The flag a user would pass to change this option from its default.
  pub fn usage(&self) -> String {
    match (self.kind, &self.default) {
      (OptionKind::Valued, _) => format!("--with-{}=<value>", self.name),
      (OptionKind::Boolean, OptionValue::Flag(true)) => format!("--without-{}", self.name),
      (OptionKind::Boolean, _) => format!("--with-{}", self.name),
    }
  }
}

/// Errors produced while resolving raw flags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
  #[error("invalid option '{flag}': {reason}")]
  InvalidOption { flag: String, reason: String },
}

impl OptionError {
  fn invalid(flag: &str, reason: impl Into<String>) -> Self {
    OptionError::InvalidOption {
      flag: flag.to_string(),
      reason: reason.into(),
    }
  }
}

/// The full set of options a formula accepts, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
  options: Vec<OptionSpec>,
}

impl OptionSet {
  pub fn new(options: Vec<OptionSpec>) -> Self {
    Self { options }
  }

  pub fn get(&self, name: &str) -> Option<&OptionSpec> {
    self.options.iter().find(|o| o.name == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
    self.options.iter()
  }

  pub fn len(&self) -> usize {
    self.options.len()
  }

  pub fn is_empty(&self) -> bool {
    self.options.is_empty()
  }

  /// Resolve raw command-line flags into option values.
  ///
  /// Every flag must name a declared option. Boolean options take no value;
  /// valued options require a non-empty one unless turned off with
  /// `--without-<name>`. Repeating a flag is allowed only if it agrees with
  /// the earlier occurrence.
  ///
  /// # Errors
  ///
  /// Returns [`OptionError::InvalidOption`] naming the first offending flag.
  pub fn resolve<S: AsRef<str>>(&self, raw_args: &[S]) -> Result<ResolvedOptions, OptionError> {
    let mut user: BTreeMap<String, OptionValue> = BTreeMap::new();
    let mut flags = Vec::new();

    for raw in raw_args {
      let flag = raw.as_ref();
      let (name, value) = self.parse_flag(flag)?;

      if let Some(previous) = user.get(&name)
        && *previous != value
      {
        return Err(OptionError::invalid(flag, "conflicts with an earlier flag for the same option"));
      }

      debug!(option = %name, value = %value, "option set by flag");
      if !user.contains_key(&name) {
        flags.push(flag.to_string());
      }
      user.insert(name, value);
    }

    let values = self
      .options
      .iter()
      .map(|spec| {
        let resolved = match user.remove(&spec.name) {
          Some(value) => ResolvedValue {
            value,
            origin: ValueOrigin::User,
          },
          None => ResolvedValue {
            value: spec.default.clone(),
            origin: ValueOrigin::Default,
          },
        };
        (spec.name.clone(), resolved)
      })
      .collect();

    Ok(ResolvedOptions { values, flags })
  }

  fn parse_flag(&self, flag: &str) -> Result<(String, OptionValue), OptionError> {
    if let Some(name) = flag.strip_prefix("--without-") {
      if name.contains('=') {
        return Err(OptionError::invalid(flag, "--without- flags do not take a value"));
      }
      let spec = self.lookup(flag, name)?;
      let value = match spec.kind {
        OptionKind::Boolean => OptionValue::Flag(false),
        OptionKind::Valued => OptionValue::Text(String::new()),
      };
      return Ok((spec.name.clone(), value));
    }

    let Some(rest) = flag.strip_prefix("--with-") else {
      return Err(OptionError::invalid(
        flag,
        "expected --with-<name>, --with-<name>=<value> or --without-<name>",
      ));
    };

    let (name, value) = match rest.split_once('=') {
      Some((name, value)) => (name, Some(value)),
      None => (rest, None),
    };
    let spec = self.lookup(flag, name)?;

    match (spec.kind, value) {
      (OptionKind::Boolean, None) => Ok((spec.name.clone(), OptionValue::Flag(true))),
      (OptionKind::Boolean, Some(_)) => Err(OptionError::invalid(flag, "option does not take a value")),
      (OptionKind::Valued, None) => Err(OptionError::invalid(flag, "option requires a value")),
      (OptionKind::Valued, Some(value)) if value.trim().is_empty() => {
        Err(OptionError::invalid(flag, "option value must not be empty"))
      }
      (OptionKind::Valued, Some(value)) => Ok((spec.name.clone(), OptionValue::Text(value.to_string()))),
    }
  }

  fn lookup(&self, flag: &str, name: &str) -> Result<&OptionSpec, OptionError> {
    if name.is_empty() {
      return Err(OptionError::invalid(flag, "missing option name"));
    }
    self.get(name).ok_or_else(|| OptionError::invalid(flag, "unknown option"))
  }

  /// Check that a default value matches its option kind.
  pub(crate) fn default_matches_kind(spec: &OptionSpec) -> bool {
    spec.default.matches_kind(spec.kind)
  }
}

/// A resolved value and its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
  pub value: OptionValue,
  pub origin: ValueOrigin,
}

/// Immutable option values for one build invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
  values: BTreeMap<String, ResolvedValue>,
  flags: Vec<String>,
}

impl ResolvedOptions {
  /// Whether the option is on. Unknown names are off.
  pub fn enabled(&self, name: &str) -> bool {
    self.values.get(name).is_some_and(|v| v.value.is_enabled())
  }

  /// The option's value as text: `"true"`/`"false"` for booleans.
  pub fn value(&self, name: &str) -> Option<String> {
    self.values.get(name).map(|v| v.value.to_string())
  }

  pub fn origin(&self, name: &str) -> Option<ValueOrigin> {
    self.values.get(name).map(|v| v.origin)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedValue)> {
    self.values.iter()
  }

  /// The flags exactly as the user passed them (first occurrence only).
  pub fn flags(&self) -> &[String] {
    &self.flags
  }

  /// Names of options turned off by degraded-mode resolution.
  pub fn degraded(&self) -> Vec<String> {
    self
      .values
      .iter()
      .filter(|(_, v)| v.origin == ValueOrigin::Degraded)
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Return a copy with `name` switched off and marked as degraded.
  pub fn degrade(&self, name: &str) -> Self {
    let mut next = self.clone();
    if let Some(entry) = next.values.get_mut(name) {
      entry.value = match entry.value {
        OptionValue::Flag(_) => OptionValue::Flag(false),
        OptionValue::Text(_) => OptionValue::Text(String::new()),
      };
      entry.origin = ValueOrigin::Degraded;
    }
    next
  }
}
