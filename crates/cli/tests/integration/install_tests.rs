//! Install command integration tests.

#![cfg(unix)]

use predicates::prelude::*;

use super::common::{HELLO_BUILD, TestEnv, fixture_content};

fn read_receipt(env: &TestEnv) -> serde_json::Value {
  let content = std::fs::read_to_string(env.prefix_path().join("INSTALL_RECEIPT.json")).unwrap();
  serde_json::from_str(&content).unwrap()
}

#[test]
fn install_stages_files_and_writes_receipt() {
  let env = TestEnv::hello(HELLO_BUILD);
  let prefix = env.prefix_path();

  env
    .install_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Installed hello 1.0"))
    .stdout(predicate::str::contains("Caveats"))
    .stdout(predicate::str::contains(format!("Run {}/bin/hello to say hi.", prefix.display())));

  assert_eq!(std::fs::read_to_string(prefix.join("bin/hello")).unwrap(), "hi");
  assert!(prefix.join("share/hello/a.txt").exists());
  assert!(prefix.join("share/hello/b.txt").exists());

  let receipt = read_receipt(&env);
  assert_eq!(receipt["formula"], "hello");
  assert_eq!(receipt["version"], "1.0");
  assert_eq!(receipt["files"].as_array().unwrap().len(), 3);
  assert_eq!(receipt["dependencies"][0]["name"], "shell");
}

#[test]
fn option_flags_reach_configure() {
  let env = TestEnv::hello(HELLO_BUILD);

  env.install_cmd().arg("--").arg("--with-greeting").assert().success();

  let config_log = std::fs::read_to_string(env.source_path().join("config.log")).unwrap();
  assert!(config_log.contains("--greeting"));
  assert_eq!(read_receipt(&env)["options"][0], "--with-greeting");
}

#[test]
fn option_flags_work_without_separator() {
  let env = TestEnv::hello(HELLO_BUILD);

  env.install_cmd().arg("--with-greeting").assert().success();

  let config_log = std::fs::read_to_string(env.source_path().join("config.log")).unwrap();
  assert!(config_log.contains("--greeting"));
}

#[test]
fn kiln_flag_after_formula_options_is_rejected() {
  let env = TestEnv::hello(HELLO_BUILD);

  env
    .install_cmd()
    .arg("--with-greeting")
    .arg("--dry-run")
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Installing").not())
    .stderr(predicate::str::contains("--dry-run must come before the formula options"));

  assert!(!env.source_path().join("config.log").exists());
  assert!(!env.prefix_path().exists());
}

#[test]
fn default_prefix_lives_under_root() {
  let env = TestEnv::hello(HELLO_BUILD);

  env
    .kiln_cmd()
    .arg("install")
    .arg(&env.formula_path)
    .arg("--source-dir")
    .arg(env.source_path())
    .assert()
    .success();

  let prefix = env.root_path().join("cellar").join("hello").join("1.0");
  assert!(prefix.join("bin/hello").exists());
  assert!(prefix.join("INSTALL_RECEIPT.json").exists());
}

#[test]
fn dry_run_lists_steps_without_running() {
  let env = TestEnv::hello(HELLO_BUILD);

  env
    .install_cmd()
    .arg("--dry-run")
    .assert()
    .success()
    .stdout(predicate::str::contains("[configure]"))
    .stdout(predicate::str::contains("install share/hello"))
    .stdout(predicate::str::contains("Dry run"));

  assert!(!env.source_path().join("config.log").exists());
  assert!(!env.prefix_path().exists());
}

#[test]
fn missing_artifact_exits_4() {
  let content = fixture_content("hello.toml").replace(
    "sources = [\"out/hello\"]",
    "sources = [\"out/hello\", \"lib/*.so\"]",
  );
  let env = TestEnv::from_content(&content).with_scripts(HELLO_BUILD);

  env
    .install_cmd()
    .assert()
    .code(4)
    .stderr(predicate::str::contains("missing artifact: 'lib/*.so'"));

  assert!(!env.prefix_path().join("bin/hello").exists());
  assert!(!env.prefix_path().join("INSTALL_RECEIPT.json").exists());
}

#[test]
fn failing_build_exits_3() {
  let env = TestEnv::hello("echo 'compiler exploded' >&2\nexit 7");

  env
    .install_cmd()
    .assert()
    .code(3)
    .stderr(predicate::str::contains("step 1 (build) failed: exited with status 7"))
    .stderr(predicate::str::contains("compiler exploded"));

  assert!(!env.prefix_path().exists());
}

#[test]
fn failing_test_run_exits_3() {
  let content = fixture_content("hello.toml").replace("test -f a.txt", "exit 1");
  let env = TestEnv::from_content(&content).with_scripts(HELLO_BUILD);

  env
    .install_cmd()
    .assert()
    .code(3)
    .stderr(predicate::str::contains("(test: sh) failed"));

  assert!(!env.prefix_path().join("INSTALL_RECEIPT.json").exists());
}

#[test]
fn timeout_kills_the_build() {
  let env = TestEnv::hello("sleep 30");

  env
    .install_cmd()
    .arg("--timeout")
    .arg("300ms")
    .assert()
    .code(3)
    .stderr(predicate::str::contains("timed out"));
}

#[test]
fn missing_dependency_exits_2() {
  let env = TestEnv::from_fixture("needy.toml");

  env
    .install_cmd()
    .assert()
    .code(2)
    .stderr(predicate::str::contains("unsatisfied dependency: frobnicator"));

  assert!(!env.prefix_path().exists());
}

#[test]
fn missing_source_dir_fails() {
  let env = TestEnv::from_fixture("hello.toml");

  env
    .kiln_cmd()
    .arg("install")
    .arg(&env.formula_path)
    .arg("--prefix")
    .arg(env.prefix_path())
    .arg("--source-dir")
    .arg(env.temp.path().join("nowhere"))
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Source directory not found"));
}
