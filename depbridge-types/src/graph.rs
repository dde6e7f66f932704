use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One resolved library as reported by the package manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,

    #[serde(default)]
    pub version: String,

    /// Search-path semantics: earlier entries take priority.
    #[serde(default)]
    pub include_dirs: Vec<Utf8PathBuf>,

    #[serde(default)]
    pub lib_dirs: Vec<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bin_dirs: Vec<Utf8PathBuf>,

    /// Library file stems (`ssl` for `libssl.so`).
    #[serde(default)]
    pub libs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,

    /// Name the legacy build system's discovery macros use for this library,
    /// when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_name: Option<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            include_dirs: vec![],
            lib_dirs: vec![],
            bin_dirs: vec![],
            libs: vec![],
            shared: None,
            legacy_name: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("dependency '{name}' appears more than once in the graph")]
pub struct DuplicateDependency {
    pub name: String,
}

/// Resolved dependency graph, keyed by package-manager name.
///
/// Built once per invocation and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    deps: BTreeMap<String, Dependency>,
}

impl DependencyGraph {
    pub fn from_dependencies(
        deps: impl IntoIterator<Item = Dependency>,
    ) -> Result<Self, DuplicateDependency> {
        let mut map = BTreeMap::new();
        for dep in deps {
            if map.contains_key(&dep.name) {
                return Err(DuplicateDependency { name: dep.name });
            }
            map.insert(dep.name.clone(), dep);
        }
        Ok(Self { deps: map })
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.deps.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.deps.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.deps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            schema: crate::schema::DEPBRIDGE_GRAPH_V1.to_string(),
            dependencies: self.deps.values().cloned().collect(),
        }
    }
}

/// On-disk form of a dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub schema: String,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl TryFrom<GraphDocument> for DependencyGraph {
    type Error = DuplicateDependency;

    fn try_from(doc: GraphDocument) -> Result<Self, Self::Error> {
        DependencyGraph::from_dependencies(doc.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let err = DependencyGraph::from_dependencies([
            Dependency::new("lz4", "1.9.2"),
            Dependency::new("lz4", "1.9.3"),
        ])
        .expect_err("duplicate");
        assert_eq!(err.name, "lz4");
    }

    #[test]
    fn document_round_trip_keeps_paths_in_order() {
        let mut dep = Dependency::new("libpng", "1.6.37");
        dep.include_dirs = vec!["/b/include".into(), "/a/include".into()];
        let graph = DependencyGraph::from_dependencies([dep]).unwrap();

        let json = serde_json::to_string(&graph.to_document()).unwrap();
        let doc: GraphDocument = serde_json::from_str(&json).unwrap();
        let back = DependencyGraph::try_from(doc).unwrap();

        assert_eq!(
            back.get("libpng").unwrap().include_dirs,
            vec![Utf8PathBuf::from("/b/include"), Utf8PathBuf::from("/a/include")]
        );
    }
}
