use crate::error::PolicyError;
use crate::load::parse_policy;
use depbridge_types::policy::PolicyTable;

const ROOT_V6_22_02: &str = include_str!("../policies/root-v6-22-02.toml");

/// Builtin tables by `<framework>/<version>` name.
pub const BUILTIN_POLICIES: &[(&str, &str)] = &[("root/v6-22-02", ROOT_V6_22_02)];

pub fn builtin_names() -> Vec<&'static str> {
    BUILTIN_POLICIES.iter().map(|(name, _)| *name).collect()
}

pub fn builtin(name: &str) -> Result<PolicyTable, PolicyError> {
    let Some((_, contents)) = BUILTIN_POLICIES.iter().find(|(n, _)| *n == name) else {
        return Err(PolicyError::UnknownBuiltin {
            name: name.to_string(),
            available: builtin_names().join(", "),
        });
    };
    parse_policy(contents)
}

/// The table for CERN ROOT v6-22-02.
pub fn root_v6_22_02() -> Result<PolicyTable, PolicyError> {
    parse_policy(ROOT_V6_22_02)
}
