//! Dependency graph ingestion.
//!
//! Accepts the native `depbridge.graph.v1` document and Conan's
//! `conanbuildinfo.json` (json generator) and turns either into an immutable
//! [`DependencyGraph`](depbridge_types::graph::DependencyGraph).

mod conan;
mod load;

pub use load::{
    discover_graph, load_graph, parse_graph, GraphFormat, GraphLoadError, LoadedGraph,
    GRAPH_FILE_NAMES,
};
