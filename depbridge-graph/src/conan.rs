//! Conan 1.x `json` generator output (`conanbuildinfo.json`).

use camino::Utf8PathBuf;
use depbridge_types::graph::Dependency;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub(crate) struct ConanBuildInfo {
    #[serde(default)]
    pub dependencies: Vec<ConanDependency>,

    /// `{ "<dep>": { "shared": "False", ... } }`
    #[serde(default)]
    pub options: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConanDependency {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub include_paths: Vec<Utf8PathBuf>,

    #[serde(default)]
    pub lib_paths: Vec<Utf8PathBuf>,

    #[serde(default)]
    pub bin_paths: Vec<Utf8PathBuf>,

    #[serde(default)]
    pub libs: Vec<String>,
}

impl ConanBuildInfo {
    pub(crate) fn into_dependencies(self) -> Vec<Dependency> {
        let options = self.options;
        self.dependencies
            .into_iter()
            .map(|d| {
                let shared = options
                    .get(&d.name)
                    .and_then(|o| o.get("shared"))
                    .and_then(parse_conan_bool);
                Dependency {
                    name: d.name,
                    version: d.version,
                    include_dirs: d.include_paths,
                    lib_dirs: d.lib_paths,
                    bin_dirs: d.bin_paths,
                    libs: d.libs,
                    shared,
                    legacy_name: None,
                }
            })
            .collect()
    }
}

/// Conan serializes option values as Python-style strings ("True"/"False").
fn parse_conan_bool(v: &serde_json::Value) -> Option<bool> {
    match v {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
