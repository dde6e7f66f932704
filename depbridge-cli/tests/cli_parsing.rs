//! End-to-end CLI tests.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CMAKELISTS: &str = "cmake_minimum_required(VERSION 3.9)\nproject(ROOT)\n";
const SEARCH: &str = "if(NOT builtin_lz4)\n  find_package(LZ4)\nendif()\n";

fn depbridge() -> Command {
    Command::cargo_bin("depbridge").expect("depbridge binary")
}

fn conan_dep(root: &Path, name: &str, libs: &[&str]) -> serde_json::Value {
    let base = root.join("conan").join(name);
    serde_json::json!({
        "name": name,
        "version": "1.0",
        "include_paths": [base.join("include")],
        "lib_paths": [base.join("lib")],
        "libs": libs,
    })
}

/// Source tree, a conanbuildinfo.json for the builtin ROOT table, and real
/// openssl library files for the scanner.
fn create_temp_project(skip: &[&str]) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();

    fs::create_dir_all(root.join("src/cmake/modules")).unwrap();
    fs::write(root.join("src/CMakeLists.txt"), CMAKELISTS).unwrap();
    fs::write(root.join("src/cmake/modules/SearchInstalledSoftware.cmake"), SEARCH).unwrap();

    let ssl_lib = root.join("conan/openssl/lib");
    fs::create_dir_all(&ssl_lib).unwrap();
    fs::write(ssl_lib.join("libssl.so"), "").unwrap();
    fs::write(ssl_lib.join("libcrypto.so"), "").unwrap();

    let deps: Vec<_> = [
        ("lz4", vec![]),
        ("libxml2", vec![]),
        ("openssl", vec!["ssl", "crypto"]),
        ("libjpeg", vec![]),
        ("libpng", vec![]),
        ("opengl", vec![]),
        ("xorg", vec![]),
    ]
    .into_iter()
    .filter(|(name, _)| !skip.contains(name))
    .map(|(name, libs)| conan_dep(root, name, &libs))
    .collect();
    let info = serde_json::json!({ "dependencies": deps });
    fs::write(
        root.join("conanbuildinfo.json"),
        serde_json::to_string_pretty(&info).unwrap(),
    )
    .unwrap();

    td
}

fn out_file(td: &TempDir, name: &str) -> PathBuf {
    td.path().join("artifacts/depbridge").join(name)
}

fn translate(td: &TempDir) -> assert_cmd::assert::Assert {
    depbridge()
        .current_dir(td.path())
        .env_remove("DEPBRIDGE_CXX_STANDARD")
        .args(["translate", "--source-root", "src", "--platform", "linux"])
        .assert()
}

#[test]
fn help_lists_subcommands() {
    depbridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("translate"))
        .stdout(predicate::str::contains("configure"))
        .stdout(predicate::str::contains("list-features"));
}

#[test]
fn list_features_text_and_json() {
    depbridge()
        .arg("list-features")
        .assert()
        .success()
        .stdout(predicate::str::contains("lz4"))
        .stdout(predicate::str::contains("prefer-external"));

    let output = depbridge()
        .args(["list-features", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(
        rows.as_array()
            .unwrap()
            .iter()
            .any(|r| r["name"] == "ssl" && r["strategy"] == "prefer-external")
    );
}

#[test]
fn explain_known_and_unknown_feature() {
    depbridge()
        .args(["explain", "ssl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OPENSSL_LIBRARIES"));

    depbridge()
        .args(["explain", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown feature"));
}

#[test]
fn unknown_builtin_policy_is_an_error() {
    depbridge()
        .args(["list-features", "--policy", "root/v0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown builtin policy 'root/v0'"));
}

#[test]
fn translate_writes_artifacts() {
    let td = create_temp_project(&[]);
    translate(&td)
        .success()
        .stdout(predicate::str::contains("4 patches over 2 files"));

    let args = fs::read_to_string(out_file(&td, "cmake-args.txt")).unwrap();
    assert!(args.contains("-Dbuiltin_lz4=OFF"));
    assert!(args.contains("-DCMAKE_CXX_STANDARD=14"));
    assert!(args.contains("libcrypto.so.1.1"));
    assert!(out_file(&td, "plan.json").is_file());
    assert!(out_file(&td, "initial-cache.cmake").is_file());
}

#[test]
fn translate_reads_standard_from_environment() {
    let td = create_temp_project(&[]);
    depbridge()
        .current_dir(td.path())
        .env("DEPBRIDGE_CXX_STANDARD", "17")
        .args(["translate", "--source-root", "src", "--platform", "linux"])
        .assert()
        .success();
    let args = fs::read_to_string(out_file(&td, "cmake-args.txt")).unwrap();
    assert!(args.contains("-DCMAKE_CXX_STANDARD=17"));
}

#[test]
fn translate_applies_config_file_defines() {
    let td = create_temp_project(&[]);
    fs::write(
        td.path().join("depbridge.toml"),
        "[[define]]\nkey = \"CMAKE_INSTALL_PREFIX\"\nvalue = \"/opt/root\"\n",
    )
    .unwrap();
    translate(&td).success();
    let args = fs::read_to_string(out_file(&td, "cmake-args.txt")).unwrap();
    assert!(args.lines().last().unwrap().contains("CMAKE_INSTALL_PREFIX=/opt/root"), "{args}");
}

#[test]
fn missing_dependency_fails_without_artifacts() {
    let td = create_temp_project(&["lz4"]);
    translate(&td)
        .code(1)
        .stderr(predicate::str::contains("'lz4'"));
    assert!(!td.path().join("artifacts").exists());
    assert_eq!(
        fs::read_to_string(td.path().join("src/CMakeLists.txt")).unwrap(),
        CMAKELISTS
    );
}

#[test]
fn invalid_define_is_rejected() {
    let td = create_temp_project(&[]);
    depbridge()
        .current_dir(td.path())
        .args(["translate", "--source-root", "src", "-D", "novalue"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn configure_without_apply_is_dry_run() {
    let td = create_temp_project(&[]);
    translate(&td).success();

    depbridge()
        .current_dir(td.path())
        .args(["configure", "--source-root", "src"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"));

    assert_eq!(
        fs::read_to_string(td.path().join("src/CMakeLists.txt")).unwrap(),
        CMAKELISTS
    );
    assert!(out_file(&td, "configure.json").is_file());
}

#[test]
fn configure_reports_missing_cmake_after_patching() {
    let td = create_temp_project(&[]);
    translate(&td).success();

    depbridge()
        .current_dir(td.path())
        .args([
            "configure",
            "--source-root",
            "src",
            "--apply",
            "--cmake",
            "depbridge-test-no-such-cmake",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cmake configure"));

    let lists = fs::read_to_string(td.path().join("src/CMakeLists.txt")).unwrap();
    assert!(lists.contains("# >>> depbridge:conan-toolchain"));
}

#[test]
fn configure_after_local_edit_is_policy_block() {
    let td = create_temp_project(&[]);
    translate(&td).success();
    fs::write(
        td.path().join("src/CMakeLists.txt"),
        format!("{CMAKELISTS}# edited\n"),
    )
    .unwrap();

    depbridge()
        .current_dir(td.path())
        .args(["configure", "--source-root", "src", "--apply"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("policy block"));
}

#[test]
fn search_prints_path_and_line() {
    let td = create_temp_project(&[]);
    depbridge()
        .current_dir(td.path())
        .args(["search", "find_package", "--root", "src"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cmake/modules/SearchInstalledSoftware.cmake:2: find_package(LZ4)",
        ));
}
