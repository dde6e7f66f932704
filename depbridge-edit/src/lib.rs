//! Edit engine for depbridge plans.
//!
//! Responsibilities:
//! - Attach file preconditions (sha256) to a plan.
//! - Apply marker-guarded patches, all in memory before anything is written.
//! - Generate a unified diff preview.

mod error;
mod patch;

pub use error::{PatchError, PolicyBlockError};
pub use patch::{PatchOutcome, apply_patch_to_content, begin_marker, end_marker};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use depbridge_types::patch::PatchSpec;
use depbridge_types::plan::{FilePrecondition, TranslationPlan};
use depbridge_types::report::{
    ConfigureReport, PatchResult, PatchStatus, PlanRef, PreconditionMismatch,
};
use depbridge_types::tool::ToolInfo;
use diffy::PatchFormatter;
use fs_err as fs;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub dry_run: bool,
    /// Apply even when target files changed since the plan was made.
    pub allow_drift: bool,
    pub backup_enabled: bool,
    /// Backups go here, mirroring the source layout. Next to the original when unset.
    pub backup_dir: Option<Utf8PathBuf>,
    pub backup_suffix: String,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            allow_drift: false,
            backup_enabled: true,
            backup_dir: None,
            backup_suffix: ".depbridge.bak".to_string(),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn abs_path(source_root: &Utf8Path, rel: &Utf8Path) -> Utf8PathBuf {
    if rel.is_absolute() {
        rel.to_path_buf()
    } else {
        source_root.join(rel)
    }
}

fn touched_files(patches: &[PatchSpec]) -> BTreeSet<Utf8PathBuf> {
    patches.iter().map(|p| p.path.clone()).collect()
}

/// Record the sha256 of every file the plan's patches touch.
pub fn attach_preconditions(
    source_root: &Utf8Path,
    plan: &mut TranslationPlan,
) -> anyhow::Result<()> {
    let mut files = Vec::new();
    for path in touched_files(&plan.patches) {
        let abs = abs_path(source_root, &path);
        let bytes = fs::read(&abs).with_context(|| format!("read {}", abs))?;
        files.push(FilePrecondition {
            path: path.to_string(),
            sha256: sha256_hex(&bytes),
        });
    }
    plan.summary.files_touched = files.len() as u64;
    plan.preconditions.files = files;
    Ok(())
}

fn verify_preconditions(
    source_root: &Utf8Path,
    plan: &TranslationPlan,
) -> Vec<PreconditionMismatch> {
    let mut mismatches = Vec::new();
    for pre in &plan.preconditions.files {
        let abs = abs_path(source_root, Utf8Path::new(&pre.path));
        let actual = match fs::read(&abs) {
            Ok(bytes) => sha256_hex(&bytes),
            Err(_) => "<missing>".to_string(),
        };
        if actual != pre.sha256 {
            warn!(path = %pre.path, "precondition mismatch");
            mismatches.push(PreconditionMismatch {
                path: pre.path.clone(),
                expected: pre.sha256.clone(),
                actual,
            });
        }
    }
    mismatches
}

struct ExecuteOutcome {
    before: BTreeMap<Utf8PathBuf, String>,
    after: BTreeMap<Utf8PathBuf, String>,
    results: Vec<PatchResult>,
    failure: Option<PatchError>,
}

/// Run every patch against in-memory copies of its target. Stops at the
/// first patch that cannot be placed; later patches are reported as blocked.
fn execute_patches(source_root: &Utf8Path, patches: &[PatchSpec]) -> anyhow::Result<ExecuteOutcome> {
    let mut before = BTreeMap::new();
    for path in touched_files(patches) {
        let abs = abs_path(source_root, &path);
        let contents = fs::read_to_string(&abs).with_context(|| format!("read {}", abs))?;
        before.insert(path, contents);
    }

    let mut current = before.clone();
    let mut results = Vec::with_capacity(patches.len());
    let mut failure = None;

    for patch in patches {
        let mut result = PatchResult {
            patch_id: patch.id.clone(),
            path: patch.path.to_string(),
            status: PatchStatus::Blocked,
            message: None,
            sha256_before: None,
            sha256_after: None,
            backup_path: None,
        };

        if failure.is_some() {
            result.message = Some("not attempted: an earlier patch failed".to_string());
            results.push(result);
            continue;
        }

        let old = current.get(&patch.path).cloned().unwrap_or_default();
        result.sha256_before = Some(sha256_hex(old.as_bytes()));

        match apply_patch_to_content(&old, patch) {
            Ok(PatchOutcome::Applied(new)) => {
                debug!(patch = %patch.id, path = %patch.path, "patch placed");
                result.status = PatchStatus::Applied;
                result.sha256_after = Some(sha256_hex(new.as_bytes()));
                current.insert(patch.path.clone(), new);
            }
            Ok(PatchOutcome::AlreadyApplied) => {
                debug!(patch = %patch.id, path = %patch.path, "patch already present");
                result.status = PatchStatus::AlreadyApplied;
                result.sha256_after = result.sha256_before.clone();
            }
            Err(err) => {
                warn!(patch = %patch.id, path = %patch.path, error = %err, "patch failed");
                result.status = PatchStatus::Failed;
                result.message = Some(err.to_string());
                failure = Some(err);
            }
        }
        results.push(result);
    }

    Ok(ExecuteOutcome {
        before,
        after: current,
        results,
        failure,
    })
}

/// Unified diff of what the patches would change. Fails on the first patch
/// that cannot be placed.
pub fn preview_patch(source_root: &Utf8Path, patches: &[PatchSpec]) -> anyhow::Result<String> {
    let outcome = execute_patches(source_root, patches)?;
    if let Some(err) = outcome.failure {
        return Err(err.into());
    }
    Ok(render_patch(&outcome.before, &outcome.after))
}

/// Apply a plan's patches. When `opts.dry_run` is true nothing is written, but
/// results and a diff are still produced.
///
/// Nothing is written unless every patch could be placed and every
/// precondition holds (or `allow_drift` is set).
pub fn apply_patches(
    source_root: &Utf8Path,
    plan: &TranslationPlan,
    tool: ToolInfo,
    opts: &ApplyOptions,
) -> anyhow::Result<(ConfigureReport, String)> {
    let mut report = ConfigureReport::new(
        tool,
        PlanRef {
            plan_id: plan.plan_id.clone(),
            path: None,
        },
    );

    let mismatches = verify_preconditions(source_root, plan);
    report.preconditions.verified = mismatches.is_empty();
    report.preconditions.mismatches = mismatches;

    if !report.preconditions.verified && !opts.allow_drift {
        for patch in &plan.patches {
            report.results.push(PatchResult {
                patch_id: patch.id.clone(),
                path: patch.path.to_string(),
                status: PatchStatus::Blocked,
                message: Some("precondition mismatch".to_string()),
                sha256_before: None,
                sha256_after: None,
                backup_path: None,
            });
        }
        report.summary.blocked = plan.patches.len() as u64;
        report.run.ended_at = Some(Utc::now());
        return Ok((report, String::new()));
    }

    let outcome = execute_patches(source_root, &plan.patches)?;
    report.results = outcome.results;
    for r in &report.results {
        match r.status {
            PatchStatus::Applied => report.summary.applied += 1,
            PatchStatus::AlreadyApplied => report.summary.already_applied += 1,
            PatchStatus::Blocked => report.summary.blocked += 1,
            PatchStatus::Failed => report.summary.failed += 1,
        }
    }

    if let Some(err) = outcome.failure {
        report.errors.push(err.to_string());
        report.run.ended_at = Some(Utc::now());
        return Ok((report, String::new()));
    }

    let diff = render_patch(&outcome.before, &outcome.after);

    if opts.dry_run {
        for r in report
            .results
            .iter_mut()
            .filter(|r| r.status == PatchStatus::Applied)
        {
            r.message = Some("dry-run: not written".to_string());
        }
    } else {
        for (path, new_contents) in &outcome.after {
            let old = outcome.before.get(path).map(String::as_str).unwrap_or_default();
            if old == new_contents {
                continue;
            }
            let abs = abs_path(source_root, path);

            if opts.backup_enabled {
                let backup = backup_path(source_root, path, opts);
                if let Some(parent) = backup.parent() {
                    fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
                }
                fs::copy(&abs, &backup).with_context(|| format!("back up {}", abs))?;
                for r in report.results.iter_mut().filter(|r| r.path == path.as_str()) {
                    r.backup_path = Some(backup.to_string());
                }
            }

            fs::write(&abs, new_contents).with_context(|| format!("write {}", abs))?;
            info!(path = %path, "patched");
            report.summary.files_modified += 1;
        }
    }

    report.applied = !opts.dry_run;
    report.run.ended_at = Some(Utc::now());
    Ok((report, diff))
}

fn backup_path(source_root: &Utf8Path, rel: &Utf8Path, opts: &ApplyOptions) -> Utf8PathBuf {
    let base = match &opts.backup_dir {
        Some(dir) => dir.join(rel.strip_prefix("/").unwrap_or(rel)),
        None => abs_path(source_root, rel),
    };
    Utf8PathBuf::from(format!("{}{}", base, opts.backup_suffix))
}

/// A policy block when preconditions failed and the run was not allowed to drift.
pub fn check_policy_block(report: &ConfigureReport) -> Option<PolicyBlockError> {
    if report.preconditions.verified || report.summary.blocked == 0 {
        return None;
    }
    let paths: Vec<_> = report
        .preconditions
        .mismatches
        .iter()
        .map(|m| m.path.as_str())
        .collect();
    Some(PolicyBlockError::PreconditionMismatch {
        message: format!("changed since plan: {}", paths.join(", ")),
    })
}

fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        let body = formatter.fmt_patch(&patch).to_string();
        // diffy emits its own ---/+++ header; keep only the hunks.
        let hunks = body
            .split_once("\n@@")
            .map(|(_, rest)| format!("@@{rest}"))
            .unwrap_or_default();
        out.push_str(&hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
