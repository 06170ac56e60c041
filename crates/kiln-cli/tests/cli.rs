//! End-to-end tests of the `kiln` binary.

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn kiln() -> Command {
    let mut cmd = cargo_bin_cmd!("kiln");
    cmd.env_remove("RUST_LOG")
        .env_remove("KILN_PARALLEL_BUILDS")
        .env_remove("KILN_PACKAGE_MANAGER")
        .env_remove("KILN_LOG_LEVEL")
        .env("NO_COLOR", "1");
    cmd
}

fn package(dir: &Path, manifest: &str) {
    fs::write(dir.join("package.json"), manifest).unwrap();
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(dir.join("src/index.js"), "export default 42;\n").unwrap();
}

fn manifest(dir: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join("package.json")).unwrap()).unwrap()
}

#[test]
fn help_lists_commands() {
    kiln()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    kiln()
        .args(["validate"])
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn directory_without_manifest_fails() {
    let dir = TempDir::new().unwrap();
    kiln()
        .arg("build")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no package.json found"));
}

#[test]
fn validate_reports_invalid_main() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), r#"{"name": "pkg", "main": "index.js"}"#);

    kiln()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pkg"))
        .stderr(predicate::str::contains("dist/pkg.cjs.js"));
}

#[test]
fn validate_accepts_valid_package() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js", "module": "dist/pkg.esm.js"}"#,
    );

    kiln()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 package is valid"));
}

#[test]
fn init_with_yes_writes_fields() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), r#"{"name": "@scope/my-pkg"}"#);

    kiln().arg("init").arg(dir.path()).arg("--yes").assert().success();

    let manifest = manifest(dir.path());
    assert_eq!(manifest["main"], "dist/my-pkg.cjs.js");
    assert_eq!(manifest["module"], "dist/my-pkg.esm.js");

    // Running again changes nothing.
    let before = fs::read_to_string(dir.path().join("package.json")).unwrap();
    kiln()
        .arg("init")
        .arg(dir.path())
        .arg("--yes")
        .assert()
        .success()
        .stderr(predicate::str::contains("No changes needed"));
    let after = fs::read_to_string(dir.path().join("package.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn init_without_terminal_declines_main() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), r#"{"name": "pkg"}"#);

    kiln()
        .arg("init")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("`main` field is required"));
}

#[test]
fn fix_repairs_invalid_main_only() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), r#"{"name": "pkg", "main": "lib/index.js"}"#);

    kiln().arg("fix").arg(dir.path()).assert().success();

    let manifest = manifest(dir.path());
    assert_eq!(manifest["main"], "dist/pkg.cjs.js");
    assert!(manifest.get("module").is_none());
}

#[test]
fn dev_writes_redirects() {
    let dir = TempDir::new().unwrap();
    package(
        dir.path(),
        r#"{"name": "pkg", "main": "dist/pkg.cjs.js", "module": "dist/pkg.esm.js"}"#,
    );

    kiln().arg("dev").arg(dir.path()).assert().success();

    let cjs = fs::read_to_string(dir.path().join("dist/pkg.cjs.js")).unwrap();
    assert!(cjs.contains(r#"require("../src/index.js")"#));
    let esm = fs::read_to_string(dir.path().join("dist/pkg.esm.js")).unwrap();
    assert!(esm.contains("../src/index.js"));
}

#[test]
fn quiet_and_verbose_conflict() {
    kiln()
        .args(["build", "--quiet", "--verbose"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
