//! Port traits abstracting all I/O away from the pipeline.

use camino::Utf8Path;
use depbridge_graph::LoadedGraph;
use depbridge_types::report::CMakeInvocation;

/// Source of the resolved dependency graph.
pub trait GraphSource {
    fn load_graph(&self) -> anyhow::Result<LoadedGraph>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}

/// Runs the CMake executable. One blocking call, pass/fail only.
pub trait CMakeRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Utf8Path)
    -> anyhow::Result<CMakeInvocation>;
}
