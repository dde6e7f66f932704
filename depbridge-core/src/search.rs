//! Grep over the build scripts of a source tree.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::Pattern;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

const SCRIPT_PATTERNS: &[&str] = &["**/CMakeLists.txt", "**/*.cmake"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Relative to the searched root.
    pub path: Utf8PathBuf,
    /// 1-based.
    pub line: usize,
    pub text: String,
}

impl std::fmt::Display for SearchHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.path, self.line, self.text)
    }
}

/// Every line of every `CMakeLists.txt` / `*.cmake` under `root` that
/// contains `term`, ordered by path then line.
pub fn search_cmake_scripts(root: &Utf8Path, term: &str) -> anyhow::Result<Vec<SearchHit>> {
    if !root.is_dir() {
        anyhow::bail!("search root {} is not a directory", root);
    }

    let mut scripts = BTreeSet::new();
    for pattern in SCRIPT_PATTERNS {
        let full = format!("{}/{}", Pattern::escape(root.as_str()), pattern);
        for entry in glob::glob(&full).with_context(|| format!("glob {full}"))? {
            let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| anyhow::anyhow!("non-utf8 path: {}", p.display()))?;
            if path.is_file() {
                scripts.insert(path);
            }
        }
    }
    debug!(root = %root, scripts = scripts.len(), "searching build scripts");

    let mut hits = Vec::new();
    for script in scripts {
        let bytes = fs::read(&script)?;
        let contents = String::from_utf8_lossy(&bytes);
        let rel = script.strip_prefix(root).unwrap_or(&script).to_path_buf();
        for (i, line) in contents.lines().enumerate() {
            if line.contains(term) {
                hits.push(SearchHit {
                    path: rel.clone(),
                    line: i + 1,
                    text: line.trim().to_string(),
                });
            }
        }
    }
    Ok(hits)
}
