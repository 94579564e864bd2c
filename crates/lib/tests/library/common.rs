//! Shared helpers for library integration tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kiln_lib::deps::Probe;
use kiln_lib::formula::{Formula, ProbeSpec};

/// Path to a formula shipped in the repository's `formulas/` directory.
pub fn formula_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("..")
    .join("..")
    .join("formulas")
    .join(format!("{name}.toml"))
}

pub fn dynare() -> Formula {
  Formula::from_path(&formula_path("dynare")).unwrap_or_else(|e| panic!("Failed to load dynare formula: {}", e))
}

/// Probe that reports exactly the listed dependencies as present.
///
/// Matches on the dependency's probe target: the executable name, pkg-config
/// module or path.
pub struct FakeProbe {
  present: HashSet<String>,
}

impl FakeProbe {
  pub fn with(names: &[&str]) -> Self {
    Self {
      present: names.iter().map(|s| s.to_string()).collect(),
    }
  }

  /// Every probe target the dynare formula declares.
  pub fn everything() -> Self {
    Self::with(&[
      "octave",
      "gfortran",
      "fftw3",
      "gsl-config",
      "matio",
      "/usr/local/share/matlab2tikz",
      "gm",
      "xz",
      "/usr/local/include/boost",
      "/usr/local/lib/libslicot.a",
      "pdftex",
      "doxygen",
    ])
  }

  pub fn without(mut self, name: &str) -> Self {
    self.present.remove(name);
    self
  }
}

impl Probe for FakeProbe {
  fn locate(&self, spec: &ProbeSpec) -> Option<String> {
    let key = match spec {
      ProbeSpec::Executable(name) | ProbeSpec::PkgConfig(name) => name.clone(),
      ProbeSpec::Path(path) => path.display().to_string(),
    };
    self.present.contains(&key).then(|| format!("/fake/{key}"))
  }
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, format!("#!/bin/sh\nset -e\n{body}\n")).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
