use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// How a patch body is placed relative to its anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    /// Insert the body on the lines immediately after the line containing the anchor.
    #[default]
    InsertAfter,
    /// Replace the whole line containing the anchor with the body.
    ReplaceLine,
}

/// Why a patch is part of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOrigin {
    /// Declared in the policy table.
    #[default]
    Policy,
    /// Generated to bridge a package-manager name to a legacy discovery name.
    Alias,
}

/// A source-text rewrite applied to the legacy build system's scripts.
///
/// The anchor is matched as an exact substring and must occur exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub id: String,

    /// Target file, relative to the source root.
    pub path: Utf8PathBuf,

    pub anchor: String,

    #[serde(default)]
    pub kind: PatchKind,

    pub body: String,

    #[serde(default)]
    pub origin: PatchOrigin,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
