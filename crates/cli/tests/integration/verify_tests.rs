//! Verify command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn matching_archive_passes() {
  let env = TestEnv::from_fixture("hello.toml");
  env.write_file("hello-1.0.tar.gz", "hello");

  env
    .kiln_cmd()
    .arg("verify")
    .arg(&env.formula_path)
    .arg(env.temp.path().join("hello-1.0.tar.gz"))
    .assert()
    .success()
    .stdout(predicate::str::contains("matches hello"));
}

#[test]
fn tampered_archive_exits_3() {
  let env = TestEnv::from_fixture("hello.toml");
  env.write_file("hello-1.0.tar.gz", "hello, tampered");

  env
    .kiln_cmd()
    .arg("verify")
    .arg(&env.formula_path)
    .arg(env.temp.path().join("hello-1.0.tar.gz"))
    .assert()
    .code(3)
    .stderr(predicate::str::contains("checksum mismatch"));
}

#[test]
fn missing_archive_fails() {
  let env = TestEnv::from_fixture("hello.toml");

  env
    .kiln_cmd()
    .arg("verify")
    .arg(&env.formula_path)
    .arg(env.temp.path().join("absent.tar.gz"))
    .assert()
    .code(1);
}

#[test]
fn sha1_checksum_is_accepted() {
  let env = TestEnv::from_content(
    r#"
name = "legacy"
version = "0.9"

[source]
url = "https://example.org/legacy-0.9.tar.gz"
sha1 = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
"#,
  );
  env.write_file("legacy-0.9.tar.gz", "hello");

  env
    .kiln_cmd()
    .arg("verify")
    .arg(&env.formula_path)
    .arg(env.temp.path().join("legacy-0.9.tar.gz"))
    .assert()
    .success()
    .stdout(predicate::str::contains("matches legacy"));
}

#[test]
fn formula_without_checksum_exits_1() {
  let env = TestEnv::from_content(
    r#"
name = "bare"
version = "0.1"

[source]
url = "https://example.org/bare-0.1.tar.gz"
"#,
  );
  env.write_file("bare-0.1.tar.gz", "hello");

  env
    .kiln_cmd()
    .arg("verify")
    .arg(&env.formula_path)
    .arg(env.temp.path().join("bare-0.1.tar.gz"))
    .assert()
    .code(1)
    .stderr(predicate::str::contains("declares no source checksum"));
}
