//! Host availability checks for dependencies.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::formula::ProbeSpec;

/// Locates dependencies on the host.
///
/// Returns a short description of where the dependency was found, or `None`
/// when it is missing.
pub trait Probe {
  fn locate(&self, spec: &ProbeSpec) -> Option<String>;
}

/// Probe backed by the real host: `PATH` lookups, path existence and `pkg-config`.
#[derive(Debug, Clone, Default)]
pub struct HostProbe {
  search_path: Option<OsString>,
}

impl HostProbe {
  /// Capture the current `PATH`.
  pub fn from_env() -> Self {
    Self {
      search_path: std::env::var_os("PATH"),
    }
  }

  pub fn with_search_path(dirs: Vec<PathBuf>) -> Self {
    Self {
      search_path: std::env::join_paths(dirs).ok(),
    }
  }

  fn find_executable(&self, name: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(name, self.search_path.as_ref(), cwd).ok()
  }
}

impl Probe for HostProbe {
  fn locate(&self, spec: &ProbeSpec) -> Option<String> {
    let found = match spec {
      ProbeSpec::Executable(name) => self.find_executable(name).map(|p| p.display().to_string()),
      ProbeSpec::Path(path) => path.exists().then(|| path.display().to_string()),
      ProbeSpec::PkgConfig(module) => Command::new("pkg-config")
        .args(["--exists", module])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
        .then(|| format!("pkg-config:{module}")),
    };
    debug!(probe = ?spec, found = ?found, "probed host");
    found
  }
}
