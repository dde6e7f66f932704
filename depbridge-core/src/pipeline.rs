//! Core translate and configure pipelines, extracted from the CLI.
//!
//! These entry points are I/O-agnostic where it matters: the graph, artifact
//! writes and the CMake process all go through the port traits.

use crate::ports::{CMakeRunner, GraphSource, WritePort};
use crate::settings::{ConfigureSettings, PolicySource, TranslateSettings};
use anyhow::Context;
use camino::Utf8Path;
use chrono::Utc;
use depbridge_domain::{LibraryScanner, TranslateContext, Translator};
use depbridge_edit::{ApplyOptions, apply_patches, attach_preconditions, check_policy_block, preview_patch};
use depbridge_render::{render_cmake_args, render_configure_md, render_initial_cache, render_plan_md};
use depbridge_types::plan::{PlanInputs, PlanSummary, PolicyRef, TranslationPlan};
use depbridge_types::policy::{PolicyTable, Strategy};
use depbridge_types::report::ConfigureReport;
use depbridge_types::tool::ToolInfo;
use fs_err as fs;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Error type for pipeline results.  Exit code 2 = policy block, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("policy block")]
    PolicyBlock,
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::PolicyBlock => 2,
            ToolError::Internal(_) => 1,
        }
    }
}

/// Resolve a policy source to a validated table, plus the file it came from.
pub fn load_policy_source(source: &PolicySource) -> anyhow::Result<(PolicyTable, Option<String>)> {
    match source {
        PolicySource::Builtin(name) => {
            let table = depbridge_policy::builtin(name)?;
            Ok((table, None))
        }
        PolicySource::File(path) => {
            let table = depbridge_policy::load_policy(path)?;
            Ok((table, Some(path.to_string())))
        }
    }
}

/// Outcome of `run_translate`.
pub struct TranslateOutcome {
    pub plan: TranslationPlan,
    pub patch: String,
}

/// Run the translate pipeline. Returns the plan and the patch preview.
///
/// Nothing is written here; a failure leaves the output directory and the
/// source tree untouched. The caller writes artifacts through `WritePort`
/// or the `write_plan_artifacts` helper.
pub fn run_translate(
    settings: &TranslateSettings,
    graph_source: &dyn GraphSource,
    scanner: Box<dyn LibraryScanner>,
    tool: ToolInfo,
) -> Result<TranslateOutcome, ToolError> {
    let started_at = Utc::now();

    let (policy, policy_path) = load_policy_source(&settings.policy).context("load policy table")?;
    let loaded = graph_source.load_graph()?;

    let ctx = TranslateContext {
        platform: settings.platform,
        cxx_standard: settings.cxx_standard.clone(),
        defines: settings.defines.clone(),
    };
    let translation = Translator::with_scanner(scanner)
        .translate(&loaded.graph, &policy, &ctx)
        .map_err(anyhow::Error::new)?;

    let inputs = PlanInputs {
        graph: Some(loaded.path.to_string()),
        policy: PolicyRef {
            framework: policy.framework.clone(),
            framework_version: policy.framework_version.clone(),
            path: policy_path,
        },
        platform: settings.platform,
        cxx_standard: translation.cxx_standard.clone(),
    };

    let mut plan = TranslationPlan::new(tool, settings.source_root.to_string(), inputs);
    plan.run.started_at = Some(started_at);
    plan.summary = PlanSummary {
        keys_total: translation.config.len() as u64,
        external: translation.count(Strategy::PreferExternal),
        bundled: translation.count(Strategy::PreferBundled),
        disabled: translation.count(Strategy::Disabled),
        patches_total: translation.patches.len() as u64,
        files_touched: 0,
        patch_bytes: None,
    };
    plan.config = translation.config;
    plan.overrides = translation.overrides;
    plan.patches = translation.patches;

    if settings.require_clean_hashes {
        attach_preconditions(&settings.source_root, &mut plan).context("attach preconditions")?;
    } else {
        plan.preconditions.files.clear();
        let files: BTreeSet<_> = plan.patches.iter().map(|p| &p.path).collect();
        plan.summary.files_touched = files.len() as u64;
    }

    let patch = preview_patch(&settings.source_root, &plan.patches).context("preview patch")?;
    plan.summary.patch_bytes = Some(patch.len() as u64);

    plan.plan_id = deterministic_plan_id(&plan)?.to_string();
    plan.run.ended_at = Some(Utc::now());

    info!(
        plan_id = %plan.plan_id,
        keys = plan.summary.keys_total,
        patches = plan.summary.patches_total,
        "translation planned"
    );

    Ok(TranslateOutcome { plan, patch })
}

fn deterministic_plan_id(plan: &TranslationPlan) -> anyhow::Result<Uuid> {
    // Deterministic ID: v5(namespace, content_bytes)
    const NAMESPACE: Uuid = Uuid::from_bytes([
        0x8f, 0x2a, 0x61, 0x0c, 0x3e, 0x47, 0x4b, 0x9d, 0xa5, 0x13, 0x6e, 0x20, 0xd4, 0x71, 0xc8,
        0x5b,
    ]);

    let stable = serde_json::json!({
        "platform": plan.inputs.platform,
        "policy": plan.inputs.policy,
        "config": plan.config,
        "patches": plan.patches,
        "preconditions": plan.preconditions,
    });
    let bytes = serde_json::to_vec(&stable).context("serialize plan content")?;
    Ok(Uuid::new_v5(&NAMESPACE, &bytes))
}

/// Write all plan artifacts to the output directory.
pub fn write_plan_artifacts(
    outcome: &TranslateOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let plan_json = serde_json::to_string_pretty(&outcome.plan).context("serialize plan")?;
    writer.write_file(&out_dir.join("plan.json"), plan_json.as_bytes())?;

    let plan_md = render_plan_md(&outcome.plan);
    writer.write_file(&out_dir.join("plan.md"), plan_md.as_bytes())?;

    writer.write_file(&out_dir.join("patch.diff"), outcome.patch.as_bytes())?;

    let mut args = render_cmake_args(&outcome.plan.config).join("\n");
    args.push('\n');
    writer.write_file(&out_dir.join("cmake-args.txt"), args.as_bytes())?;

    let cache = render_initial_cache(&outcome.plan.config);
    writer.write_file(&out_dir.join("initial-cache.cmake"), cache.as_bytes())?;

    Ok(())
}

/// Outcome of `run_configure`.
pub struct ConfigureOutcome {
    pub report: ConfigureReport,
    pub patch: String,
    pub policy_block: bool,

    /// Set when a patch could not be placed or CMake did not succeed.
    pub failure: Option<String>,
}

/// Run the configure pipeline: apply the plan's patches, then hand the
/// definitions to CMake.
///
/// CMake is never invoked on a dry run, a policy block or a failed patch.
pub fn run_configure(
    settings: &ConfigureSettings,
    runner: &dyn CMakeRunner,
    tool: ToolInfo,
) -> Result<ConfigureOutcome, ToolError> {
    let plan_path = settings.out_dir.join("plan.json");
    let plan_str = fs::read_to_string(&plan_path).with_context(|| format!("read {}", plan_path))?;
    let plan: TranslationPlan = serde_json::from_str(&plan_str).context("parse plan.json")?;
    if plan.schema != depbridge_types::schema::DEPBRIDGE_PLAN_V1 {
        return Err(anyhow::anyhow!(
            "unsupported plan schema '{}' in {}",
            plan.schema,
            plan_path
        )
        .into());
    }

    let opts = ApplyOptions {
        dry_run: settings.dry_run,
        allow_drift: settings.allow_drift,
        backup_enabled: settings.backup_enabled,
        backup_dir: Some(settings.out_dir.join("backups")),
        backup_suffix: settings.backup_suffix.clone(),
    };

    let (mut report, patch) =
        apply_patches(&settings.source_root, &plan, tool, &opts).context("apply patches")?;
    report.plan_ref.path = Some(plan_path.to_string());

    let policy_block = check_policy_block(&report).is_some();
    let mut failure = report.errors.first().cloned();

    if policy_block {
        warn!("source tree changed since the plan was made; not configuring");
    } else if failure.is_some() {
        warn!("patching failed; not configuring");
    } else if settings.dry_run {
        debug!("dry run; cmake not invoked");
    } else {
        failure = run_cmake(settings, &plan, runner, &mut report);
    }

    report.run.ended_at = Some(Utc::now());

    Ok(ConfigureOutcome {
        report,
        patch,
        policy_block,
        failure,
    })
}

/// Arguments for `cmake -S <src> -B <build>` with the plan's definitions.
pub fn configure_args(settings: &ConfigureSettings, plan: &TranslationPlan) -> Vec<String> {
    let mut args = vec![
        "-S".to_string(),
        settings.source_root.to_string(),
        "-B".to_string(),
        settings.build_dir.to_string(),
    ];
    if let Some(generator) = &settings.cmake.generator {
        args.push("-G".to_string());
        args.push(generator.clone());
    }
    args.extend(render_cmake_args(&plan.config));
    if let Some(build_type) = &settings.cmake.build_type {
        args.push(format!("-DCMAKE_BUILD_TYPE={build_type}"));
    }
    args
}

pub fn build_args(settings: &ConfigureSettings) -> Vec<String> {
    let mut args = vec!["--build".to_string(), settings.build_dir.to_string()];
    if let Some(build_type) = &settings.cmake.build_type {
        args.push("--config".to_string());
        args.push(build_type.clone());
    }
    if let Some(jobs) = settings.cmake.jobs {
        args.push("--parallel".to_string());
        args.push(jobs.to_string());
    }
    args
}

/// Arguments for `ctest` over the build directory.
pub fn test_args(settings: &ConfigureSettings) -> Vec<String> {
    let mut args = vec!["--test-dir".to_string(), settings.build_dir.to_string()];
    if let Some(build_type) = &settings.cmake.build_type {
        args.push("-C".to_string());
        args.push(build_type.clone());
    }
    args
}

fn run_cmake(
    settings: &ConfigureSettings,
    plan: &TranslationPlan,
    runner: &dyn CMakeRunner,
    report: &mut ConfigureReport,
) -> Option<String> {
    let cmake = settings.cmake.program.as_str();
    let mut steps = vec![("cmake configure", cmake, configure_args(settings, plan))];
    if settings.cmake.build {
        steps.push(("cmake build", cmake, build_args(settings)));
    }
    if settings.cmake.test {
        steps.push(("ctest", settings.cmake.ctest_program.as_str(), test_args(settings)));
    }

    for (step, program, args) in steps {
        // Relative -S/-B paths resolve against the caller's working directory.
        let invocation = match runner.run(program, &args, Utf8Path::new(".")) {
            Ok(invocation) => invocation,
            Err(err) => {
                let msg = format!("{step}: {err:#}");
                report.errors.push(msg.clone());
                return Some(msg);
            }
        };
        let success = invocation.success;
        let code = invocation.exit_code;
        report.cmake.push(invocation);
        if !success {
            let msg = match code {
                Some(code) => format!("{step} failed with exit code {code}"),
                None => format!("{step} was terminated by a signal"),
            };
            report.errors.push(msg.clone());
            return Some(msg);
        }
        info!(step, "build step succeeded");
    }
    None
}

/// Write all configure artifacts to the output directory.
pub fn write_configure_artifacts(
    outcome: &ConfigureOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let json = serde_json::to_string_pretty(&outcome.report).context("serialize configure report")?;
    writer.write_file(&out_dir.join("configure.json"), json.as_bytes())?;

    let md = render_configure_md(&outcome.report);
    writer.write_file(&out_dir.join("configure.md"), md.as_bytes())?;

    writer.write_file(&out_dir.join("configure.diff"), outcome.patch.as_bytes())?;

    Ok(())
}
