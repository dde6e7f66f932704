//! Feature explanations for the `depbridge explain` and `list-features` commands.
//!
//! Everything here reads the policy table; nothing is hard-coded per feature.

use depbridge_policy::find_feature;
use depbridge_types::policy::{FeaturePolicy, Locate, PolicyTable, Strategy};

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Short description of what each strategy does to the legacy build.
pub fn strategy_meaning(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::PreferExternal => {
            "Use the library resolved by the package manager. The builtin copy is switched \
off and the include/library keys point at the resolved directories."
        }
        Strategy::PreferBundled => {
            "Build the copy shipped inside the framework's source tree. No external paths \
are passed for this feature."
        }
        Strategy::Disabled => "The feature is switched off and nothing is located for it.",
    }
}

fn locate_label(locate: Locate) -> &'static str {
    match locate {
        Locate::Dirs => "library directories, joined",
        Locate::Scan => "library files found by scanning each library directory",
    }
}

/// Names of the policy's features, in table order.
pub fn feature_names(policy: &PolicyTable) -> Vec<&str> {
    policy.features.iter().map(|f| f.name.as_str()).collect()
}

/// Full explanation of one feature, or an error naming the valid features.
pub fn explain_feature(policy: &PolicyTable, name: &str) -> anyhow::Result<String> {
    let Some(feature) = find_feature(policy, name) else {
        anyhow::bail!(
            "Unknown feature: '{}'\n\nAvailable features: {}",
            name,
            feature_names(policy).join(", ")
        );
    };
    Ok(render_explanation(policy, feature))
}

fn render_explanation(policy: &PolicyTable, f: &FeaturePolicy) -> String {
    let mut out = String::new();
    out.push_str(&format!("FEATURE: {}\n", f.name));
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "Policy:      {} {}\n",
        policy.framework, policy.framework_version
    ));
    out.push_str(&format!("Strategy:    {}\n", f.strategy));
    if let Some(dep) = &f.dependency {
        out.push_str(&format!("Dependency:  {}\n", dep));
    }
    out.push('\n');

    if let Some(desc) = &f.description {
        out.push_str("DESCRIPTION\n");
        out.push_str(RULE);
        out.push('\n');
        out.push_str(desc);
        out.push_str("\n\n");
    }

    out.push_str(&format!("STRATEGY: {}\n", f.strategy));
    out.push_str(RULE);
    out.push('\n');
    out.push_str(strategy_meaning(f.strategy));
    out.push_str("\n\n");

    out.push_str("KEYS\n");
    out.push_str(RULE);
    out.push('\n');
    let keys = [
        ("builtin toggle", &f.builtin_key),
        ("feature toggle", &f.feature_key),
        ("include dirs", &f.include_key),
        ("libraries", &f.library_key),
    ];
    for (label, key) in keys {
        if let Some(key) = key {
            out.push_str(&format!("  {:<15} {}\n", label, key));
        }
    }
    if f.strategy == Strategy::PreferExternal && f.library_key.is_some() {
        out.push_str(&format!("  located from   {}\n", locate_label(f.locate)));
    }
    out.push('\n');

    if let Some(dep) = &f.dependency {
        let aliases: Vec<_> = policy.aliases.iter().filter(|a| &a.dependency == dep).collect();
        let renames: Vec<_> = policy
            .runtime_renames
            .iter()
            .filter(|r| &r.dependency == dep)
            .collect();
        if !aliases.is_empty() || !renames.is_empty() {
            out.push_str("NAME BRIDGING\n");
            out.push_str(RULE);
            out.push('\n');
            for a in aliases {
                let find = a.find_name.as_deref().unwrap_or(&a.dependency);
                let legacy = a.legacy.as_deref().unwrap_or("<from graph>");
                out.push_str(&format!(
                    "  find_package({find}) re-exported as {legacy}_* (patch alias-{})\n",
                    a.dependency
                ));
            }
            for r in renames {
                out.push_str(&format!(
                    "  runtime library '{}' carries version {}\n",
                    r.library, r.version
                ));
            }
            out.push('\n');
        }
    }

    out
}

/// One row of `list-features --format json`.
pub fn feature_json(f: &FeaturePolicy) -> serde_json::Value {
    serde_json::json!({
        "name": f.name,
        "strategy": f.strategy,
        "dependency": f.dependency,
        "description": f.description,
    })
}

pub fn render_feature_table(policy: &PolicyTable) -> String {
    let mut out = format!(
        "Features of {} {}:\n\n",
        policy.framework, policy.framework_version
    );
    out.push_str(&format!("  {:<16} {:<16} DEPENDENCY\n", "NAME", "STRATEGY"));
    out.push_str(&format!("  {:<16} {:<16} ----------\n", "----", "--------"));
    for f in &policy.features {
        out.push_str(&format!(
            "  {:<16} {:<16} {}\n",
            f.name,
            f.strategy.as_str(),
            f.dependency.as_deref().unwrap_or("-")
        ));
    }
    out.push_str("\nUse 'depbridge explain <feature>' for details.\n");
    out
}
