//! Default filesystem-backed port implementations.

use crate::ports::{CMakeRunner, GraphSource, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use depbridge_graph::{GraphFormat, LoadedGraph, GRAPH_FILE_NAMES};
use depbridge_types::graph::DependencyGraph;
use depbridge_types::report::CMakeInvocation;
use fs_err as fs;
use std::process::Command;
use tracing::{debug, info};

/// Loads the graph from an explicit path, or discovers it in `search_dir`.
#[derive(Debug, Clone)]
pub struct FsGraphSource {
    pub path: Option<Utf8PathBuf>,
    pub search_dir: Utf8PathBuf,
}

impl FsGraphSource {
    pub fn new(path: Option<Utf8PathBuf>, search_dir: Utf8PathBuf) -> Self {
        Self { path, search_dir }
    }
}

impl GraphSource for FsGraphSource {
    fn load_graph(&self) -> anyhow::Result<LoadedGraph> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => depbridge_graph::discover_graph(&self.search_dir)?.with_context(|| {
                format!(
                    "no dependency graph found in {} (looked for {})",
                    self.search_dir,
                    GRAPH_FILE_NAMES.join(", ")
                )
            })?,
        };
        depbridge_graph::load_graph(&path).with_context(|| format!("load dependency graph {}", path))
    }
}

/// Pre-built graph for embedding and testing.
#[derive(Debug, Clone)]
pub struct InMemoryGraphSource {
    graph: DependencyGraph,
}

impl InMemoryGraphSource {
    pub fn new(graph: DependencyGraph) -> Self {
        Self { graph }
    }
}

impl GraphSource for InMemoryGraphSource {
    fn load_graph(&self) -> anyhow::Result<LoadedGraph> {
        Ok(LoadedGraph {
            path: Utf8PathBuf::from("<memory>"),
            format: GraphFormat::Native,
            graph: self.graph.clone(),
        })
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

/// Spawns the CMake executable and waits for it.
#[derive(Debug, Clone, Default)]
pub struct ProcessCMake;

impl CMakeRunner for ProcessCMake {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Utf8Path,
    ) -> anyhow::Result<CMakeInvocation> {
        debug!(program, ?args, cwd = %cwd, "running cmake");
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .status()
            .with_context(|| format!("spawn {program}"))?;
        info!(program, code = ?status.code(), "cmake finished");
        Ok(CMakeInvocation {
            program: program.to_string(),
            args: args.to_vec(),
            success: status.success(),
            exit_code: status.code(),
        })
    }
}
