//! End-to-end installs of a small formula against throwaway source trees.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use kiln_lib::consts::RECEIPT_FILE;
use kiln_lib::execute::{ExecuteConfig, ExecuteError, FailureCause};
use kiln_lib::formula::Formula;
use kiln_lib::install::{InstallError, install};
use kiln_lib::plan::BuildLayout;
use kiln_lib::receipt::InstallReceipt;
use kiln_lib::stage::StageError;

use super::common::{FakeProbe, write_script};

const HELLO: &str = r#"
name = "hello"
version = "1.0"

[[options]]
name = "greeting"
help = "Build with a greeting"

[configure]
args = ["--prefix=${prefix}"]

[[configure.switches]]
when = { with = "greeting" }
enabled = ["--greeting"]

[build]
program = "./build.sh"

[[install]]
dest = "bin"
sources = ["out/hello"]

[[install]]
dest = "share/hello"
sources = ["data/*.txt"]

[test]
fixtures = ["share/hello/a.txt"]

[[test.runs]]
name = "sh"
program = "sh"
args = ["-c", "test -f a.txt"]
"#;

struct Workspace {
  _temp: TempDir,
  source: PathBuf,
  prefix: PathBuf,
}

impl Workspace {
  fn new(build_body: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("src");
    let prefix = temp.path().join("prefix");
    fs::create_dir_all(&source).unwrap();

    write_script(&source, "configure", "echo \"$@\" > config.log");
    write_script(&source, "build.sh", build_body);

    Self {
      _temp: temp,
      source,
      prefix,
    }
  }

  fn layout(&self) -> BuildLayout {
    BuildLayout::new(&self.prefix, &self.source)
  }
}

const GOOD_BUILD: &str = "mkdir -p out data\nprintf hi > out/hello\necho a > data/a.txt\necho b > data/b.txt";

async fn run(formula: &str, ws: &Workspace, flags: &[&str], config: ExecuteConfig) -> Result<(), InstallError> {
  let formula = Formula::from_toml(formula).unwrap();
  install(&formula, flags, &ws.layout(), &FakeProbe::with(&[]), &config)
    .await
    .map(|_| ())
}

fn receipt_at(prefix: &Path) -> InstallReceipt {
  InstallReceipt::load(prefix).unwrap()
}

#[tokio::test]
async fn successful_install_writes_receipt() {
  let ws = Workspace::new(GOOD_BUILD);
  let formula = Formula::from_toml(HELLO).unwrap();

  let outcome = install(
    &formula,
    &["--with-greeting"],
    &ws.layout(),
    &FakeProbe::with(&[]),
    &ExecuteConfig::default(),
  )
  .await
  .unwrap();

  let config_log = fs::read_to_string(ws.source.join("config.log")).unwrap();
  assert!(config_log.contains("--greeting"));
  assert!(config_log.contains(&format!("--prefix={}", ws.prefix.display())));

  assert_eq!(fs::read_to_string(ws.prefix.join("bin/hello")).unwrap(), "hi");
  assert!(ws.prefix.join("share/hello/b.txt").exists());
  assert!(ws.source.join(".kiln/test/a.txt").exists());

  let (path, receipt) = outcome.receipt.unwrap();
  assert_eq!(path, ws.prefix.join(RECEIPT_FILE));
  assert_eq!(receipt, receipt_at(&ws.prefix));
  assert_eq!(receipt.options, vec!["--with-greeting".to_string()]);

  let files: Vec<PathBuf> = receipt.files.iter().map(|f| f.path.clone()).collect();
  assert_eq!(
    files,
    vec![
      PathBuf::from("bin/hello"),
      PathBuf::from("share/hello/a.txt"),
      PathBuf::from("share/hello/b.txt"),
    ]
  );
}

#[tokio::test]
async fn disabled_option_takes_other_arm() {
  let ws = Workspace::new(GOOD_BUILD);
  run(HELLO, &ws, &[], ExecuteConfig::default()).await.unwrap();

  let config_log = fs::read_to_string(ws.source.join("config.log")).unwrap();
  assert!(!config_log.contains("--greeting"));
}

#[tokio::test]
async fn dry_run_changes_nothing() {
  let ws = Workspace::new(GOOD_BUILD);
  let config = ExecuteConfig {
    dry_run: true,
    ..Default::default()
  };
  run(HELLO, &ws, &[], config).await.unwrap();

  assert!(!ws.source.join("config.log").exists());
  assert!(!ws.prefix.exists());
}

#[tokio::test]
async fn missing_artifact_fails_staging() {
  let ws = Workspace::new(GOOD_BUILD);
  let formula = HELLO.replace("sources = [\"out/hello\"]", "sources = [\"out/hello\", \"lib/*.so\"]");

  let err = run(&formula, &ws, &[], ExecuteConfig::default()).await.unwrap_err();

  assert_eq!(err.exit_code(), 4);
  match &err {
    InstallError::Execute(ExecuteError::Staging { name, source, .. }) => {
      assert_eq!(name, "install bin");
      assert!(matches!(source, StageError::MissingArtifact { pattern, .. } if pattern == "lib/*.so"));
    }
    other => panic!("expected staging failure, got {other:?}"),
  }

  // No partial install and no receipt.
  assert!(!ws.prefix.join("bin/hello").exists());
  assert!(!ws.prefix.join(RECEIPT_FILE).exists());
}

#[tokio::test]
async fn failing_build_stops_pipeline() {
  let ws = Workspace::new("echo 'compiler exploded' >&2\nexit 7");

  let err = run(HELLO, &ws, &[], ExecuteConfig::default()).await.unwrap_err();

  assert_eq!(err.exit_code(), 3);
  match &err {
    InstallError::Execute(ExecuteError::StepFailed {
      index,
      name,
      cause,
      stderr_tail,
    }) => {
      assert_eq!(*index, 1);
      assert_eq!(name, "build");
      assert_eq!(cause, &FailureCause::Exit(Some(7)));
      assert_eq!(stderr_tail, &vec!["compiler exploded".to_string()]);
    }
    other => panic!("expected step failure, got {other:?}"),
  }
  assert!(!ws.prefix.exists());
}

#[tokio::test]
async fn failing_test_run_is_a_step_failure() {
  let ws = Workspace::new(GOOD_BUILD);
  let formula = HELLO.replace("test -f a.txt", "test -f missing.txt");

  let err = run(&formula, &ws, &[], ExecuteConfig::default()).await.unwrap_err();

  assert_eq!(err.exit_code(), 3);
  assert!(matches!(
    err,
    InstallError::Execute(ExecuteError::StepFailed { ref name, .. }) if name == "test: sh"
  ));
  assert!(!ws.prefix.join(RECEIPT_FILE).exists());
}

#[tokio::test]
async fn later_rule_replaces_overlapping_tree() {
  let ws = Workspace::new("mkdir -p a/examples b/examples\necho old > a/examples/old.mod\necho new > b/examples/new.mod");
  let formula = r#"
name = "overlap"
version = "1.0"

[build]
program = "./build.sh"

[[install]]
dest = "share/pkg"
sources = ["a/examples"]

[[install]]
dest = "share/pkg"
sources = ["b/examples"]
"#;

  run(formula, &ws, &[], ExecuteConfig::default()).await.unwrap();

  let examples = ws.prefix.join("share/pkg/examples");
  assert!(examples.join("new.mod").exists());
  assert!(!examples.join("old.mod").exists());

  let files: Vec<PathBuf> = receipt_at(&ws.prefix).files.into_iter().map(|f| f.path).collect();
  assert_eq!(files, vec![PathBuf::from("share/pkg/examples/new.mod")]);
}

#[tokio::test]
async fn tampered_patch_stops_before_configure() {
  let ws = Workspace::new(GOOD_BUILD);
  fs::write(ws.source.join("fix.patch"), "--- a/x\n+++ b/x\n").unwrap();
  let formula = format!("{HELLO}\n[[patches]]\nfile = \"fix.patch\"\nsha256 = \"{}\"\n", "0".repeat(64));

  let err = run(&formula, &ws, &[], ExecuteConfig::default()).await.unwrap_err();

  assert_eq!(err.exit_code(), 3);
  match &err {
    InstallError::Execute(ExecuteError::StepFailed { index, name, cause, .. }) => {
      assert_eq!(*index, 0);
      assert_eq!(name, "verify fix.patch");
      assert!(matches!(cause, FailureCause::Checksum(_)));
    }
    other => panic!("expected checksum failure, got {other:?}"),
  }
  assert!(!ws.source.join("config.log").exists());
}
