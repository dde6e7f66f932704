//! Apply tests against a temporary source tree.

use camino::Utf8PathBuf;
use depbridge_edit::{
    ApplyOptions, apply_patches, attach_preconditions, check_policy_block, preview_patch,
};
use depbridge_types::patch::{PatchKind, PatchOrigin, PatchSpec};
use depbridge_types::plan::{PlanInputs, PolicyRef, TranslationPlan};
use depbridge_types::platform::Platform;
use depbridge_types::report::PatchStatus;
use depbridge_types::tool::ToolInfo;
use fs_err as fs;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const CMAKELISTS: &str = "cmake_minimum_required(VERSION 3.9 FATAL_ERROR)\nproject(ROOT)\nset(ROOT_VERSION 6.22.02)\n";
const SEARCH: &str = "if(builtin_lz4)\n  set(x 1)\nelse()\n  find_package(LZ4)\nendif()\n";

fn tool() -> ToolInfo {
    ToolInfo {
        name: "depbridge".to_string(),
        version: Some("0.0.0-test".to_string()),
        repo: None,
        commit: None,
    }
}

fn source_tree() -> (TempDir, Utf8PathBuf) {
    let td = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    fs::write(root.join("CMakeLists.txt"), CMAKELISTS).unwrap();
    fs::create_dir_all(root.join("cmake/modules")).unwrap();
    fs::write(root.join("cmake/modules/SearchInstalledSoftware.cmake"), SEARCH).unwrap();
    (td, root)
}

fn patch(id: &str, path: &str, anchor: &str, kind: PatchKind, body: &str) -> PatchSpec {
    PatchSpec {
        id: id.to_string(),
        path: Utf8PathBuf::from(path),
        anchor: anchor.to_string(),
        kind,
        body: body.to_string(),
        origin: PatchOrigin::Policy,
        description: None,
    }
}

fn plan(root: &Utf8PathBuf, patches: Vec<PatchSpec>) -> TranslationPlan {
    let inputs = PlanInputs {
        graph: None,
        policy: PolicyRef {
            framework: "root".to_string(),
            framework_version: "v6-22-02".to_string(),
            path: None,
        },
        platform: Platform::Linux,
        cxx_standard: "14".to_string(),
    };
    let mut plan = TranslationPlan::new(tool(), root.to_string(), inputs);
    plan.plan_id = "test-plan".to_string();
    plan.patches = patches;
    attach_preconditions(root, &mut plan).unwrap();
    plan
}

fn standard_patches() -> Vec<PatchSpec> {
    vec![
        patch(
            "conan-toolchain",
            "CMakeLists.txt",
            "project(ROOT)",
            PatchKind::InsertAfter,
            "include(${CMAKE_BINARY_DIR}/conanbuildinfo.cmake)\nconan_basic_setup(KEEP_RPATHS)",
        ),
        patch(
            "guard-lz4-search",
            "cmake/modules/SearchInstalledSoftware.cmake",
            "find_package(LZ4)",
            PatchKind::ReplaceLine,
            "if(NOT LZ4_FOUND)\n  find_package(LZ4)\nendif()",
        ),
        patch(
            "alias-lz4",
            "CMakeLists.txt",
            "project(ROOT)",
            PatchKind::InsertAfter,
            "find_package(lz4 REQUIRED)\nset(LZ4_FOUND ${lz4_FOUND})",
        ),
    ]
}

fn no_backups() -> ApplyOptions {
    ApplyOptions {
        backup_enabled: false,
        ..ApplyOptions::default()
    }
}

#[test]
fn preconditions_cover_each_touched_file_once() {
    let (_td, root) = source_tree();
    let plan = plan(&root, standard_patches());
    let paths: Vec<_> = plan
        .preconditions
        .files
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(
        paths,
        vec!["CMakeLists.txt", "cmake/modules/SearchInstalledSoftware.cmake"]
    );
    assert_eq!(plan.summary.files_touched, 2);
}

#[test]
fn apply_writes_blocks_in_declaration_order() {
    let (_td, root) = source_tree();
    let plan = plan(&root, standard_patches());

    let (report, diff) = apply_patches(&root, &plan, tool(), &no_backups()).unwrap();
    assert!(report.applied);
    assert_eq!(report.summary.applied, 3);
    assert_eq!(report.summary.files_modified, 2);
    assert!(diff.contains("diff --git a/CMakeLists.txt b/CMakeLists.txt"));
    assert!(diff.contains("+conan_basic_setup(KEEP_RPATHS)"));

    let top = fs::read_to_string(root.join("CMakeLists.txt")).unwrap();
    let toolchain = top.find("# >>> depbridge:conan-toolchain").unwrap();
    let alias = top.find("# >>> depbridge:alias-lz4").unwrap();
    assert!(top.find("project(ROOT)").unwrap() < toolchain);
    assert!(toolchain < alias);
    assert!(top.ends_with("set(ROOT_VERSION 6.22.02)\n"));

    let search = fs::read_to_string(root.join("cmake/modules/SearchInstalledSoftware.cmake")).unwrap();
    assert!(search.contains("  if(NOT LZ4_FOUND)\n    find_package(LZ4)\n  endif()\n"));
}

#[test]
fn second_apply_is_a_no_op() {
    let (_td, root) = source_tree();
    let first = plan(&root, standard_patches());
    apply_patches(&root, &first, tool(), &no_backups()).unwrap();
    let patched = fs::read_to_string(root.join("CMakeLists.txt")).unwrap();

    // A fresh plan against the patched tree.
    let second = plan(&root, standard_patches());
    let (report, diff) = apply_patches(&root, &second, tool(), &no_backups()).unwrap();

    assert_eq!(report.summary.already_applied, 3);
    assert_eq!(report.summary.files_modified, 0);
    assert!(diff.is_empty());
    assert_eq!(fs::read_to_string(root.join("CMakeLists.txt")).unwrap(), patched);
    assert_eq!(patched.matches("# >>> depbridge:alias-lz4").count(), 1);
}

#[test]
fn changed_file_blocks_apply() {
    let (_td, root) = source_tree();
    let plan = plan(&root, standard_patches());
    fs::write(root.join("CMakeLists.txt"), format!("{CMAKELISTS}# edited\n")).unwrap();

    let (report, diff) = apply_patches(&root, &plan, tool(), &no_backups()).unwrap();
    assert!(!report.preconditions.verified);
    assert_eq!(report.summary.blocked, 3);
    assert!(diff.is_empty());
    assert!(check_policy_block(&report).is_some());

    let search = fs::read_to_string(root.join("cmake/modules/SearchInstalledSoftware.cmake")).unwrap();
    assert_eq!(search, SEARCH);
}

#[test]
fn allow_drift_applies_anyway() {
    let (_td, root) = source_tree();
    let plan = plan(&root, standard_patches());
    fs::write(root.join("CMakeLists.txt"), format!("{CMAKELISTS}# edited\n")).unwrap();

    let opts = ApplyOptions {
        allow_drift: true,
        ..no_backups()
    };
    let (report, _) = apply_patches(&root, &plan, tool(), &opts).unwrap();
    assert!(!report.preconditions.verified);
    assert_eq!(report.summary.applied, 3);
    assert!(check_policy_block(&report).is_none());
}

#[test]
fn failing_patch_aborts_before_any_write() {
    let (_td, root) = source_tree();
    let mut patches = standard_patches();
    patches.insert(
        1,
        patch(
            "guard-missing",
            "cmake/modules/SearchInstalledSoftware.cmake",
            "find_package(ZSTD)",
            PatchKind::ReplaceLine,
            "x",
        ),
    );
    let plan = plan(&root, patches);

    let (report, _) = apply_patches(&root, &plan, tool(), &no_backups()).unwrap();
    let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            PatchStatus::Applied,
            PatchStatus::Failed,
            PatchStatus::Blocked,
            PatchStatus::Blocked
        ]
    );
    assert_eq!(report.summary.failed, 1);
    assert!(report.errors[0].contains("find_package(ZSTD)"));
    assert!(report.errors[0].contains("cmake/modules/SearchInstalledSoftware.cmake"));

    assert_eq!(fs::read_to_string(root.join("CMakeLists.txt")).unwrap(), CMAKELISTS);
}

#[test]
fn dry_run_reports_without_writing() {
    let (_td, root) = source_tree();
    let plan = plan(&root, standard_patches());

    let opts = ApplyOptions {
        dry_run: true,
        ..ApplyOptions::default()
    };
    let (report, diff) = apply_patches(&root, &plan, tool(), &opts).unwrap();
    assert!(!report.applied);
    assert!(!diff.is_empty());
    assert_eq!(
        report.results[0].message.as_deref(),
        Some("dry-run: not written")
    );
    assert_eq!(fs::read_to_string(root.join("CMakeLists.txt")).unwrap(), CMAKELISTS);
    assert!(!root.join("CMakeLists.txt.depbridge.bak").exists());
}

#[test]
fn backups_keep_the_original() {
    let (_td, root) = source_tree();
    let plan = plan(&root, standard_patches());

    let (report, _) = apply_patches(&root, &plan, tool(), &ApplyOptions::default()).unwrap();
    let backup = root.join("CMakeLists.txt.depbridge.bak");
    assert_eq!(fs::read_to_string(&backup).unwrap(), CMAKELISTS);
    assert_eq!(
        report.results[0].backup_path.as_deref(),
        Some(backup.as_str())
    );
}

#[test]
fn preview_fails_loudly_on_missing_anchor() {
    let (_td, root) = source_tree();
    let patches = vec![patch(
        "p",
        "CMakeLists.txt",
        "project(GEANT4)",
        PatchKind::InsertAfter,
        "x",
    )];
    let err = preview_patch(&root, &patches).expect_err("anchor missing");
    assert!(err.to_string().contains("project(GEANT4)"));
}

#[test]
fn missing_target_file_is_an_error_naming_the_path() {
    let (_td, root) = source_tree();
    let patches = vec![patch(
        "p",
        "cmake/modules/Nope.cmake",
        "x",
        PatchKind::InsertAfter,
        "y",
    )];
    let err = preview_patch(&root, &patches).expect_err("missing file");
    assert!(format!("{err:#}").contains("Nope.cmake"));
}
