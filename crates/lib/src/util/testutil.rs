//! Test utilities for kiln-lib.
//!
//! Helpers for tests that need to spawn real processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::plan::Invocation;

/// An invocation running `script` through the platform shell in `cwd`.
#[cfg(unix)]
pub fn shell_invocation(cwd: &Path, script: &str) -> Invocation {
  Invocation {
    program: "/bin/sh".to_string(),
    args: vec!["-c".to_string(), script.to_string()],
    cwd: cwd.to_path_buf(),
    env: BTreeMap::new(),
  }
}

#[cfg(windows)]
pub fn shell_invocation(cwd: &Path, script: &str) -> Invocation {
  Invocation {
    program: "cmd.exe".to_string(),
    args: vec!["/C".to_string(), script.to_string()],
    cwd: cwd.to_path_buf(),
    env: BTreeMap::new(),
  }
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, format!("#!/bin/sh\nset -e\n{body}\n")).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}
