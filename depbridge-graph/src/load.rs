use crate::conan::ConanBuildInfo;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use depbridge_types::graph::{DependencyGraph, DuplicateDependency, GraphDocument};
use fs_err as fs;
use glob::glob;
use thiserror::Error;
use tracing::debug;

/// File names probed by [`discover_graph`], in priority order.
pub const GRAPH_FILE_NAMES: &[&str] = &["depbridge-graph.json", "conanbuildinfo.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Native,
    Conan,
}

#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub path: Utf8PathBuf,
    pub format: GraphFormat,
    pub graph: DependencyGraph,
}

#[derive(Debug, Error)]
pub enum GraphLoadError {
    #[error("io error reading {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },

    #[error("json parse error: {message}")]
    Json { message: String },

    #[error("unsupported graph schema '{schema}'")]
    UnsupportedSchema { schema: String },

    #[error("unrecognized graph document: expected a `schema` or a `dependencies` field")]
    UnknownFormat,

    #[error(transparent)]
    Duplicate(#[from] DuplicateDependency),
}

/// Parse a graph document, detecting its format.
pub fn parse_graph(contents: &str) -> Result<(GraphFormat, DependencyGraph), GraphLoadError> {
    let value: serde_json::Value =
        serde_json::from_str(contents).map_err(|e| GraphLoadError::Json {
            message: e.to_string(),
        })?;

    if let Some(schema) = value.get("schema").and_then(|s| s.as_str()) {
        if schema != depbridge_types::schema::DEPBRIDGE_GRAPH_V1 {
            return Err(GraphLoadError::UnsupportedSchema {
                schema: schema.to_string(),
            });
        }
        let doc: GraphDocument = serde_json::from_value(value).map_err(json_err)?;
        let graph = DependencyGraph::try_from(doc)?;
        return Ok((GraphFormat::Native, graph));
    }

    if value.get("dependencies").is_some() {
        let info: ConanBuildInfo = serde_json::from_value(value).map_err(json_err)?;
        let graph = DependencyGraph::from_dependencies(info.into_dependencies())?;
        return Ok((GraphFormat::Conan, graph));
    }

    Err(GraphLoadError::UnknownFormat)
}

fn json_err(e: serde_json::Error) -> GraphLoadError {
    GraphLoadError::Json {
        message: e.to_string(),
    }
}

pub fn load_graph(path: &Utf8Path) -> Result<LoadedGraph, GraphLoadError> {
    let contents = fs::read_to_string(path).map_err(|e| GraphLoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let (format, graph) = parse_graph(&contents)?;
    debug!(path = %path, ?format, deps = graph.len(), "loaded dependency graph");
    Ok(LoadedGraph {
        path: path.to_path_buf(),
        format,
        graph,
    })
}

/// Find a graph document directly inside `dir`.
pub fn discover_graph(dir: &Utf8Path) -> anyhow::Result<Option<Utf8PathBuf>> {
    for name in GRAPH_FILE_NAMES {
        // The directory is literal text; only the file name may be a pattern.
        let pattern = format!("{}/{}", glob::Pattern::escape(dir.as_str()), name);
        let pattern_str = pattern.as_str();
        debug!(pattern = %pattern_str, "probing for dependency graph");

        let mut hits = Vec::new();
        for entry in glob(pattern_str).with_context(|| format!("glob {pattern_str}"))? {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
            let utf8 = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| anyhow::anyhow!("non-utf8 path: {}", p.display()))?;
            hits.push(utf8);
        }
        hits.sort();
        if let Some(first) = hits.into_iter().next() {
            return Ok(Some(first));
        }
    }
    Ok(None)
}
