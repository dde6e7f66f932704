//! Rendering helpers: CMake definitions and human-readable markdown artifacts.

use depbridge_types::config::{ConfigSet, ConfigValue};
use depbridge_types::patch::{PatchKind, PatchOrigin};
use depbridge_types::plan::TranslationPlan;
use depbridge_types::report::{ConfigureReport, PatchStatus};

/// `-DKEY=VALUE` arguments in definition order, one argument per entry.
pub fn render_cmake_args(config: &ConfigSet) -> Vec<String> {
    config
        .iter()
        .map(|e| format!("-D{}={}", e.key, e.value.render()))
        .collect()
}

/// Script for `cmake -C` that pre-populates the cache with every definition.
pub fn render_initial_cache(config: &ConfigSet) -> String {
    let mut out = String::from("# Generated by depbridge. Load with `cmake -C`.\n");
    for e in config.iter() {
        match &e.value {
            ConfigValue::Switch(_) => out.push_str(&format!(
                "set({} {} CACHE BOOL \"\" FORCE)\n",
                e.key,
                e.value.render()
            )),
            ConfigValue::Text(s) => out.push_str(&format!(
                "set({} \"{}\" CACHE STRING \"\" FORCE)\n",
                e.key,
                escape_cmake(s)
            )),
        }
    }
    out
}

fn escape_cmake(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '"' | '$' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

pub fn render_plan_md(plan: &TranslationPlan) -> String {
    let mut out = String::new();
    out.push_str("# depbridge plan\n\n");
    out.push_str(&format!(
        "- Policy: {} {}\n",
        plan.inputs.policy.framework, plan.inputs.policy.framework_version
    ));
    out.push_str(&format!("- Platform: {}\n", plan.inputs.platform));
    out.push_str(&format!("- C++ standard: {}\n", plan.inputs.cxx_standard));
    out.push_str(&format!(
        "- Features: {} external, {} bundled, {} disabled\n",
        plan.summary.external, plan.summary.bundled, plan.summary.disabled
    ));
    out.push_str(&format!(
        "- Definitions: {} ({} overridden)\n",
        plan.summary.keys_total,
        plan.overrides.len()
    ));
    out.push_str(&format!(
        "- Patches: {} across {} files\n",
        plan.summary.patches_total, plan.summary.files_touched
    ));
    if let Some(bytes) = plan.summary.patch_bytes {
        out.push_str(&format!("- Patch bytes: {}\n", bytes));
    }

    out.push_str("\n## Definitions\n\n");
    if plan.config.is_empty() {
        out.push_str("_No definitions._\n");
    } else {
        out.push_str("| Key | Value |\n|---|---|\n");
        for e in plan.config.iter() {
            out.push_str(&format!("| `{}` | `{}` |\n", e.key, e.value));
        }
    }

    if !plan.overrides.is_empty() {
        out.push_str("\n## Overrides\n\n");
        for o in &plan.overrides {
            out.push_str(&format!(
                "- `{}`: `{}` → `{}` (by {})\n",
                o.key, o.previous, o.value, o.by
            ));
        }
    }

    out.push_str("\n## Patches\n\n");
    if plan.patches.is_empty() {
        out.push_str("_No patches planned._\n");
        return out;
    }

    for (i, p) in plan.patches.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, p.id));
        out.push_str(&format!("- Target: `{}`\n", p.path));
        out.push_str(&format!("- Anchor: `{}`\n", p.anchor));
        out.push_str(&format!("- Kind: `{}`\n", kind_label(p.kind)));
        out.push_str(&format!("- Origin: `{}`\n", origin_label(p.origin)));
        if let Some(desc) = &p.description {
            out.push_str(&format!("\n{}\n", desc));
        }
        out.push('\n');
    }

    out
}

pub fn render_configure_md(report: &ConfigureReport) -> String {
    let mut out = String::new();
    out.push_str("# depbridge configure\n\n");
    out.push_str(&format!(
        "- Applied: {}\n- Already applied: {}\n- Blocked: {}\n- Failed: {}\n- Files modified: {}\n",
        report.summary.applied,
        report.summary.already_applied,
        report.summary.blocked,
        report.summary.failed,
        report.summary.files_modified
    ));
    out.push_str(&format!(
        "- Preconditions verified: {}\n",
        report.preconditions.verified
    ));
    for cmake in &report.cmake {
        let status = if cmake.success { "ok" } else { "failed" };
        out.push_str(&format!(
            "- CMake: `{} {}` ({})\n",
            cmake.program,
            cmake.args.join(" "),
            status
        ));
    }

    if !report.preconditions.mismatches.is_empty() {
        out.push_str("\n## Precondition mismatches\n\n");
        for m in &report.preconditions.mismatches {
            out.push_str(&format!("- `{}`: expected {}, got {}\n", m.path, m.expected, m.actual));
        }
    }

    out.push_str("\n## Results\n\n");
    if report.results.is_empty() {
        out.push_str("_No results._\n");
    } else {
        for (i, r) in report.results.iter().enumerate() {
            out.push_str(&format!("### {}. {}\n\n", i + 1, r.patch_id));
            out.push_str(&format!("- Status: `{}`\n", status_label(r.status)));
            out.push_str(&format!("- Target: `{}`\n", r.path));
            if let Some(msg) = &r.message {
                out.push_str(&format!("- Message: {}\n", msg));
            }
            if let Some(backup) = &r.backup_path {
                out.push_str(&format!("- Backup: `{}`\n", backup));
            }
            out.push('\n');
        }
    }

    if !report.errors.is_empty() {
        out.push_str("## Errors\n\n");
        for e in &report.errors {
            out.push_str(&format!("- {}\n", e));
        }
    }

    out
}

fn kind_label(k: PatchKind) -> &'static str {
    match k {
        PatchKind::InsertAfter => "insert_after",
        PatchKind::ReplaceLine => "replace_line",
    }
}

fn origin_label(o: PatchOrigin) -> &'static str {
    match o {
        PatchOrigin::Policy => "policy",
        PatchOrigin::Alias => "alias",
    }
}

fn status_label(s: PatchStatus) -> &'static str {
    match s {
        PatchStatus::Applied => "applied",
        PatchStatus::AlreadyApplied => "already_applied",
        PatchStatus::Blocked => "blocked",
        PatchStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_variable_references() {
        assert_eq!(escape_cmake(r#"a"b\c${d}"#), r#"a\"b\\c\${d}"#);
    }
}
