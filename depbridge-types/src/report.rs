use crate::tool::{RunInfo, ToolInfo};
use serde::{Deserialize, Serialize};

/// Result of the configure step: patch application plus the CMake call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureReport {
    pub schema: String,
    pub tool: ToolInfo,

    #[serde(default)]
    pub run: RunInfo,

    pub plan_ref: PlanRef,

    /// False for dry runs.
    pub applied: bool,

    pub preconditions: ApplyPreconditions,

    #[serde(default)]
    pub results: Vec<PatchResult>,

    pub summary: ConfigureSummary,

    /// CMake calls in the order they ran (configure, then build).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmake: Vec<CMakeInvocation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ConfigureReport {
    pub fn new(tool: ToolInfo, plan_ref: PlanRef) -> Self {
        Self {
            schema: crate::schema::DEPBRIDGE_CONFIGURE_V1.to_string(),
            tool,
            run: RunInfo::default(),
            plan_ref,
            applied: false,
            preconditions: ApplyPreconditions::default(),
            results: vec![],
            summary: ConfigureSummary::default(),
            cmake: vec![],
            errors: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRef {
    pub plan_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyPreconditions {
    pub verified: bool,

    #[serde(default)]
    pub mismatches: Vec<PreconditionMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconditionMismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchResult {
    pub patch_id: String,
    pub path: String,
    pub status: PatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Applied,
    AlreadyApplied,
    Blocked,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigureSummary {
    pub applied: u64,
    pub already_applied: u64,
    pub blocked: u64,
    pub failed: u64,
    pub files_modified: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CMakeInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Record of what the packaging step copied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub schema: String,
    pub tool: ToolInfo,
    pub framework: String,
    pub framework_version: String,

    /// Libraries consumers link against.
    pub libs: Vec<String>,

    /// Files copied, relative to the package root.
    pub files: Vec<String>,
}
