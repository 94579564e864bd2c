//! Filesystem locations.
//!
//! Resolution order for the data root: `KILN_ROOT`, then the platform data
//! directory (`$XDG_DATA_HOME/kiln`, `~/.local/share/kiln`, `%APPDATA%\kiln`).
//! Install prefixes live under `KILN_PREFIX` when set, else `<root>/cellar`.

use std::path::PathBuf;

use crate::consts::{APP_NAME, PREFIX_ENV, ROOT_ENV};

fn env_path(name: &str) -> Option<PathBuf> {
  std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory, if it can be determined.
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  env_path("USERPROFILE")
}

/// Returns the user's home directory, if it can be determined.
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  env_path("HOME")
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> Option<PathBuf> {
  env_path("APPDATA").map(|appdata| appdata.join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> Option<PathBuf> {
  let data_home = env_path("XDG_DATA_HOME").or_else(|| home_dir().map(|home| home.join(".local").join("share")))?;
  Some(data_home.join(APP_NAME))
}

/// Root directory for everything kiln manages.
pub fn root_dir() -> Option<PathBuf> {
  env_path(ROOT_ENV).or_else(data_dir)
}

/// Directory per-formula prefixes are created under.
pub fn prefix_root() -> Option<PathBuf> {
  env_path(PREFIX_ENV).or_else(|| root_dir().map(|root| root.join("cellar")))
}

/// Default install prefix for a formula version: `<prefix root>/<name>/<version>`.
pub fn default_prefix(name: &str, version: &str) -> Option<PathBuf> {
  prefix_root().map(|root| root.join(name).join(version))
}
