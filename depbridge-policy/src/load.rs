use crate::error::PolicyError;
use crate::validate::validate;
use anyhow::Context;
use camino::Utf8Path;
use depbridge_types::policy::PolicyTable;
use fs_err as fs;
use tracing::debug;

/// Parse and validate a policy table.
pub fn parse_policy(contents: &str) -> Result<PolicyTable, PolicyError> {
    let table: PolicyTable = toml::from_str(contents).map_err(|e| PolicyError::Toml {
        message: e.to_string(),
    })?;
    validate(&table)?;
    Ok(table)
}

pub fn load_policy(path: &Utf8Path) -> anyhow::Result<PolicyTable> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read policy file {}", path))?;
    let table = parse_policy(&contents).with_context(|| format!("parse policy file {}", path))?;
    debug!(
        path = %path,
        framework = %table.framework,
        version = %table.framework_version,
        features = table.features.len(),
        "loaded policy table"
    );
    Ok(table)
}

/// Serialize a table back to TOML (used to export the builtin tables).
pub fn render_policy(table: &PolicyTable) -> anyhow::Result<String> {
    toml::to_string_pretty(table).context("serialize policy table")
}
