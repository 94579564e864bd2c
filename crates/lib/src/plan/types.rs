//! Build plan types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::SCRATCH_DIR;
use crate::deps::ResolvedDependency;
use crate::formula::StageMode;
use crate::placeholder::DirKind;
use crate::util::hash::Hashable;

/// Where a build reads from and installs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLayout {
  /// Install prefix; the only tree staging writes to.
  pub prefix: PathBuf,
  /// Unpacked source tree; the working directory of build steps.
  pub source_dir: PathBuf,
  /// Sandbox test runs execute in.
  pub test_dir: PathBuf,
}

impl BuildLayout {
  pub fn new(prefix: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
    let source_dir = source_dir.into();
    let test_dir = source_dir.join(SCRATCH_DIR).join("test");
    Self {
      prefix: prefix.into(),
      source_dir,
      test_dir,
    }
  }

  pub fn bin(&self) -> PathBuf {
    self.prefix.join("bin")
  }

  pub fn lib(&self) -> PathBuf {
    self.prefix.join("lib")
  }

  pub fn share(&self) -> PathBuf {
    self.prefix.join("share")
  }

  pub fn doc(&self) -> PathBuf {
    self.prefix.join("doc")
  }

  pub fn dir(&self, kind: DirKind) -> PathBuf {
    match kind {
      DirKind::Prefix => self.prefix.clone(),
      DirKind::Bin => self.bin(),
      DirKind::Lib => self.lib(),
      DirKind::Share => self.share(),
      DirKind::Doc => self.doc(),
      DirKind::Source => self.source_dir.clone(),
      DirKind::TestPath => self.test_dir.clone(),
    }
  }
}

/// Build phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Patch,
  Configure,
  Build,
  Docs,
  Install,
  Test,
}

impl Phase {
  pub fn as_str(self) -> &'static str {
    match self {
      Phase::Patch => "patch",
      Phase::Configure => "configure",
      Phase::Build => "build",
      Phase::Docs => "docs",
      Phase::Install => "install",
      Phase::Test => "test",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A fully expanded external program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

impl Invocation {
  /// Human-readable command line. For display only; never passed to a shell.
  pub fn command_line(&self) -> String {
    std::iter::once(&self.program)
      .chain(&self.args)
      .map(|arg| display_quote(arg))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

fn display_quote(arg: &str) -> String {
  if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
    return arg.to_string();
  }
  format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Source patterns placed into a destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingRule {
  /// Directory the patterns are relative to.
  pub base: PathBuf,
  pub patterns: Vec<String>,
  pub dest: PathBuf,
  pub mode: StageMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
  Run(Invocation),
  /// Replace every occurrence of `find` in `file`.
  Edit { file: PathBuf, find: String, replace: String },
  /// Check a file's SHA-256 before it is used.
  Verify { file: PathBuf, sha256: String },
  Stage(StagingRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
  pub phase: Phase,
  pub name: String,
  pub action: StepAction,
}

impl BuildStep {
  pub fn describe(&self) -> String {
    match &self.action {
      StepAction::Run(invocation) => invocation.command_line(),
      StepAction::Edit { file, .. } => format!("edit {}", file.display()),
      StepAction::Verify { file, .. } => format!("verify sha256 of {}", file.display()),
      StepAction::Stage(rule) => format!("{} -> {}", rule.patterns.join(", "), rule.dest.display()),
    }
  }
}

/// The ordered steps for one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
  pub formula: String,
  pub version: String,
  pub layout: BuildLayout,
  pub dependencies: Vec<ResolvedDependency>,
  pub steps: Vec<BuildStep>,
}

impl Hashable for BuildPlan {}

impl BuildPlan {
  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn steps_in(&self, phase: Phase) -> impl Iterator<Item = (usize, &BuildStep)> {
    self.steps.iter().enumerate().filter(move |(_, s)| s.phase == phase)
  }

  pub fn prefix(&self) -> &Path {
    &self.layout.prefix
  }
}
