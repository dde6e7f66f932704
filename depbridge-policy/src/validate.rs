use crate::error::PolicyError;
use depbridge_types::policy::{FeaturePolicy, PolicyTable, Strategy};
use std::collections::{BTreeMap, BTreeSet};

/// Check a table for structural errors before it is used.
///
/// A dependency shared by several features must carry the same strategy in
/// each of them; disagreement is reported instead of letting declaration
/// order decide.
pub fn validate(table: &PolicyTable) -> Result<(), PolicyError> {
    if table.schema != depbridge_types::schema::DEPBRIDGE_POLICY_V1 {
        return Err(PolicyError::UnsupportedSchema {
            schema: table.schema.clone(),
        });
    }

    let mut names = BTreeSet::new();
    let mut by_dependency: BTreeMap<&str, &FeaturePolicy> = BTreeMap::new();

    for feature in &table.features {
        if !names.insert(feature.name.as_str()) {
            return Err(PolicyError::DuplicateFeature {
                name: feature.name.clone(),
            });
        }

        check_keys(feature)?;

        let Some(dep) = feature.dependency.as_deref() else {
            continue;
        };
        match by_dependency.get(dep) {
            Some(first) if first.strategy != feature.strategy => {
                return Err(PolicyError::ConflictingStrategy {
                    dependency: dep.to_string(),
                    first: first.name.clone(),
                    first_strategy: first.strategy,
                    second: feature.name.clone(),
                    second_strategy: feature.strategy,
                });
            }
            Some(_) => {}
            None => {
                by_dependency.insert(dep, feature);
            }
        }
    }

    if !table.aliases.is_empty() && table.project.is_none() {
        return Err(PolicyError::MissingProjectDecl);
    }

    let mut legacy_names = BTreeSet::new();
    for alias in &table.aliases {
        let legacy = alias.legacy.clone().unwrap_or_else(|| alias.dependency.clone());
        if !legacy_names.insert(legacy.clone()) {
            return Err(PolicyError::DuplicateAlias { legacy });
        }
    }

    for rename in &table.runtime_renames {
        if rename.version.trim().is_empty() {
            return Err(PolicyError::EmptyRenameVersion {
                dependency: rename.dependency.clone(),
                library: rename.library.clone(),
            });
        }
    }

    let mut patch_ids = BTreeSet::new();
    for patch in &table.patches {
        if !patch_ids.insert(patch.id.as_str()) {
            return Err(PolicyError::DuplicatePatch {
                id: patch.id.clone(),
            });
        }
        if patch.anchor.is_empty() {
            return Err(PolicyError::EmptyAnchor {
                id: patch.id.clone(),
            });
        }
    }

    Ok(())
}

fn check_keys(feature: &FeaturePolicy) -> Result<(), PolicyError> {
    let no_toggle = || PolicyError::NoToggle {
        feature: feature.name.clone(),
        strategy: feature.strategy,
    };

    match feature.strategy {
        Strategy::PreferExternal => {
            if feature.dependency.is_none() {
                return Err(PolicyError::MissingDependencyField {
                    feature: feature.name.clone(),
                });
            }
            let emits_something = feature.builtin_key.is_some()
                || feature.feature_key.is_some()
                || feature.include_key.is_some()
                || feature.library_key.is_some();
            if !emits_something {
                return Err(no_toggle());
            }
        }
        Strategy::PreferBundled => {
            if feature.builtin_key.is_none() {
                return Err(no_toggle());
            }
        }
        Strategy::Disabled => {
            if feature.builtin_key.is_none() && feature.feature_key.is_none() {
                return Err(no_toggle());
            }
        }
    }
    Ok(())
}

pub fn find_feature<'a>(table: &'a PolicyTable, name: &str) -> Option<&'a FeaturePolicy> {
    table
        .features
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}
