use crate::config::{ConfigSet, ConfigValue};
use crate::patch::PatchSpec;
use crate::platform::Platform;
use crate::tool::{RunInfo, ToolInfo};
use serde::{Deserialize, Serialize};

/// Output of a translate run: everything the configure step needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationPlan {
    pub schema: String,
    pub tool: ToolInfo,

    #[serde(default)]
    pub run: RunInfo,

    /// Deterministic id derived from the plan's content.
    #[serde(default)]
    pub plan_id: String,

    pub source_root: String,
    pub inputs: PlanInputs,

    pub config: ConfigSet,

    /// Keys written more than once during translation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ConfigOverride>,

    #[serde(default)]
    pub patches: Vec<PatchSpec>,

    #[serde(default)]
    pub preconditions: PlanPreconditions,

    pub summary: PlanSummary,
}

impl TranslationPlan {
    pub fn new(tool: ToolInfo, source_root: String, inputs: PlanInputs) -> Self {
        Self {
            schema: crate::schema::DEPBRIDGE_PLAN_V1.to_string(),
            tool,
            run: RunInfo::default(),
            plan_id: String::new(),
            source_root,
            inputs,
            config: ConfigSet::new(),
            overrides: vec![],
            patches: vec![],
            preconditions: PlanPreconditions::default(),
            summary: PlanSummary::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,

    pub policy: PolicyRef,
    pub platform: Platform,
    pub cxx_standard: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRef {
    pub framework: String,
    pub framework_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverride {
    pub key: String,
    pub previous: ConfigValue,
    pub value: ConfigValue,

    /// Feature (or `setting`/`define`) that performed the overriding write.
    pub by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanPreconditions {
    #[serde(default)]
    pub files: Vec<FilePrecondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePrecondition {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub keys_total: u64,
    pub external: u64,
    pub bundled: u64,
    pub disabled: u64,
    pub patches_total: u64,
    pub files_touched: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_bytes: Option<u64>,
}
