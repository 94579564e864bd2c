//! Formula declaration types, deserialized from TOML.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::condition::{Condition, holds};
use crate::options::{OptionKind, OptionValue, ResolvedOptions};

/// A complete formula: metadata plus everything needed to build one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Formula {
  pub name: String,
  pub version: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub homepage: Option<String>,
  /// Printed after a successful install.
  #[serde(default)]
  pub caveats: Option<String>,
  #[serde(default)]
  pub source: Option<SourceDecl>,
  #[serde(default)]
  pub options: Vec<OptionDecl>,
  #[serde(default)]
  pub dependencies: Vec<DependencyDecl>,
  /// Applied to the source tree, in order, before configure.
  #[serde(default)]
  pub patches: Vec<PatchDecl>,
  #[serde(default)]
  pub configure: ConfigureDecl,
  #[serde(default)]
  pub build: RunDecl,
  #[serde(default)]
  pub docs: Option<DocsDecl>,
  #[serde(default)]
  pub install: Vec<InstallRule>,
  #[serde(default)]
  pub test: Option<TestDecl>,
  /// Directory the formula was loaded from. Patch files resolve against it.
  #[serde(skip)]
  pub dir: Option<PathBuf>,
}

/// Where the source archive comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDecl {
  pub url: String,
  #[serde(default)]
  pub sha256: Option<String>,
  /// Older releases often publish only a SHA-1. `sha256` wins when both are set.
  #[serde(default)]
  pub sha1: Option<String>,
}

/// A user-toggleable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDecl {
  pub name: String,
  #[serde(default)]
  pub kind: OptionKind,
  #[serde(default)]
  pub default: Option<OptionValue>,
  #[serde(default)]
  pub help: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
  /// Must be present whenever its condition holds.
  #[default]
  Required,
  /// On by default (`--without-<name>` turns it off); missing means degraded.
  Recommended,
  /// Off by default (`--with-<name>` turns it on).
  Optional,
  /// Needed only while building.
  Build,
}

impl DependencyKind {
  /// Recommended and optional dependencies are controlled by an option of the same name.
  pub fn has_option(self) -> bool {
    matches!(self, DependencyKind::Recommended | DependencyKind::Optional)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      DependencyKind::Required => "required",
      DependencyKind::Recommended => "recommended",
      DependencyKind::Optional => "optional",
      DependencyKind::Build => "build",
    }
  }
}

impl std::fmt::Display for DependencyKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How to check that a dependency is present on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSpec {
  /// An executable on `PATH`.
  Executable(String),
  /// A file or directory that must exist.
  Path(PathBuf),
  /// A `pkg-config` module.
  PkgConfig(String),
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyDecl {
  pub name: String,
  #[serde(default)]
  pub kind: DependencyKind,
  #[serde(default)]
  pub when: Option<Condition>,
  /// Build variant the dependency must have been built with.
  #[serde(default)]
  pub variant: Option<String>,
  /// Limits the variant requirement; the dependency itself stays included.
  #[serde(default)]
  pub variant_when: Option<Condition>,
  /// Other dependencies that must come before this one.
  #[serde(default)]
  pub after: Vec<String>,
  #[serde(default)]
  pub probe: Option<ProbeSpec>,
}

impl DependencyDecl {
  /// The variant required under the given options, if any.
  pub fn active_variant(&self, options: &ResolvedOptions) -> Option<&str> {
    self
      .variant
      .as_deref()
      .filter(|_| holds(self.variant_when.as_ref(), options))
  }

  /// The probe to run; defaults to an executable named after the dependency.
  pub fn probe_spec(&self) -> ProbeSpec {
    self
      .probe
      .clone()
      .unwrap_or_else(|| ProbeSpec::Executable(self.name.clone()))
  }
}

/// The configure step: base arguments plus option-driven switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigureDecl {
  #[serde(default = "default_configure_program")]
  pub program: String,
  #[serde(default = "default_configure_args")]
  pub args: Vec<String>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
  #[serde(default)]
  pub switches: Vec<SwitchDecl>,
}

fn default_configure_program() -> String {
  "./configure".to_string()
}

fn default_configure_args() -> Vec<String> {
  vec!["--prefix=${prefix}".to_string()]
}

impl Default for ConfigureDecl {
  fn default() -> Self {
    Self {
      program: default_configure_program(),
      args: default_configure_args(),
      env: BTreeMap::new(),
      switches: Vec::new(),
    }
  }
}

/// Arguments chosen by a condition: `enabled` when it holds, `disabled` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchDecl {
  pub when: Condition,
  #[serde(default)]
  pub enabled: Vec<String>,
  #[serde(default)]
  pub disabled: Vec<String>,
}

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunDecl {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}

impl Default for RunDecl {
  fn default() -> Self {
    Self {
      program: "make".to_string(),
      args: Vec::new(),
      env: BTreeMap::new(),
    }
  }
}

/// A documentation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DocStepDecl {
  Run {
    program: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
  },
  /// Replace every occurrence of `find` in a source-tree file.
  Edit { file: String, find: String, replace: String },
}

/// Documentation steps gated by a single boolean option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocsDecl {
  pub option: String,
  #[serde(default)]
  pub steps: Vec<DocStepDecl>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageMode {
  #[default]
  Copy,
  Symlink,
}

/// A patch shipped next to the formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchDecl {
  /// Relative to the formula's directory, or to the source tree when the
  /// formula was not loaded from a file.
  pub file: String,
  #[serde(default)]
  pub sha256: Option<String>,
  /// Leading path components stripped, as in `patch -p`.
  #[serde(default = "default_strip")]
  pub strip: u32,
  #[serde(default)]
  pub when: Option<Condition>,
}

fn default_strip() -> u32 {
  1
}

/// Conditional placement of build outputs under the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallRule {
  /// Destination directory, relative to the prefix.
  pub dest: String,
  /// Source paths or glob patterns, relative to the source tree.
  pub sources: Vec<String>,
  #[serde(default)]
  pub when: Option<Condition>,
  #[serde(default)]
  pub mode: StageMode,
}

/// Post-install test runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDecl {
  #[serde(default)]
  pub when: Option<Condition>,
  /// Files under the prefix copied into the test sandbox first.
  #[serde(default)]
  pub fixtures: Vec<String>,
  #[serde(default)]
  pub runs: Vec<TestRunDecl>,
}

/// One test invocation against one runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestRunDecl {
  pub name: String,
  #[serde(default)]
  pub when: Option<Condition>,
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default)]
  pub env: BTreeMap<String, String>,
}
