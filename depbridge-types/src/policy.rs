use crate::config::ConfigValue;
use crate::patch::PatchSpec;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Sourcing strategy for one legacy-build-system feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    PreferExternal,
    PreferBundled,
    Disabled,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::PreferExternal => "prefer-external",
            Strategy::PreferBundled => "prefer-bundled",
            Strategy::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the library-location key of an external feature is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locate {
    /// Join the dependency's library directories.
    #[default]
    Dirs,
    /// Scan the library directories for platform library files.
    Scan,
}

/// Versioned policy table: data, not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTable {
    pub schema: String,

    /// Legacy project the table targets, e.g. `root`.
    pub framework: String,

    /// Upstream release the table was written against, e.g. `v6-22-02`.
    pub framework_version: String,

    /// Fallback language standard when the environment supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cxx_standard: Option<String>,

    /// Libraries the packaged framework exports to consumers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,

    /// Top-level project declaration that alias patches are inserted after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectDecl>,

    /// Fixed definitions emitted before any feature.
    #[serde(default, rename = "setting", skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<SettingRow>,

    #[serde(default, rename = "feature")]
    pub features: Vec<FeaturePolicy>,

    #[serde(default, rename = "alias", skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasPolicy>,

    #[serde(default, rename = "runtime_rename", skip_serializing_if = "Vec::is_empty")]
    pub runtime_renames: Vec<RuntimeRename>,

    #[serde(default, rename = "patch", skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<PatchSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDecl {
    /// Declaration file relative to the source root.
    #[serde(default = "default_project_file")]
    pub file: Utf8PathBuf,

    /// Exact text of the declaration, e.g. `project(ROOT)`.
    pub anchor: String,
}

fn default_project_file() -> Utf8PathBuf {
    Utf8PathBuf::from("CMakeLists.txt")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRow {
    pub key: String,
    pub value: ConfigValue,
}

/// One feature of the legacy build system and where its library comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePolicy {
    pub name: String,

    pub strategy: Strategy,

    /// Package-manager dependency backing the feature when sourced externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,

    /// "Use builtin copy" toggle, e.g. `builtin_lz4`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin_key: Option<String>,

    /// Feature enable toggle, e.g. `ssl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_key: Option<String>,

    #[serde(default)]
    pub locate: Locate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Bridge between the package manager's find-module name and the variable
/// prefix the legacy discovery macros expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasPolicy {
    pub dependency: String,

    /// Legacy variable prefix (`LZ4`). Falls back to the graph's
    /// `legacy_name` for the dependency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy: Option<String>,

    /// Name passed to `find_package`. Defaults to `dependency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find_name: Option<String>,
}

/// Runtime library whose emitted file name must carry a version suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRename {
    pub dependency: String,

    /// Library stem, e.g. `crypto`.
    pub library: String,

    /// Version suffix, e.g. `1.1`.
    pub version: String,
}
