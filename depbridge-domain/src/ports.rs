use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;

/// Read-only view of library directories.
///
/// The translator only needs to list files; tests use the in-memory version.
pub trait LibraryScanner {
    /// Files directly inside `dir` whose name matches the glob `pattern`,
    /// sorted by path.
    fn matching_files(&self, dir: &Utf8Path, pattern: &str) -> anyhow::Result<Vec<Utf8PathBuf>>;
}

/// File-system backed `LibraryScanner`.
#[derive(Debug, Clone, Default)]
pub struct FsLibraryScanner;

impl LibraryScanner for FsLibraryScanner {
    fn matching_files(&self, dir: &Utf8Path, pattern: &str) -> anyhow::Result<Vec<Utf8PathBuf>> {
        let full = format!("{}/{}", glob::Pattern::escape(dir.as_str()), pattern);
        let mut out = Vec::new();
        for entry in glob::glob(&full).with_context(|| format!("invalid pattern {}", full))? {
            let path = entry.with_context(|| format!("read {}", dir))?;
            if !path.is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| anyhow::anyhow!("non-UTF-8 path: {}", p.display()))?;
            out.push(path);
        }
        out.sort();
        Ok(out)
    }
}

/// Fixed directory listing, keyed by directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibraryScanner {
    dirs: BTreeMap<Utf8PathBuf, Vec<String>>,
}

impl InMemoryLibraryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(mut self, dir: impl Into<Utf8PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dirs
            .entry(dir.into())
            .or_default()
            .extend(files.into_iter().map(Into::into));
        self
    }
}

impl LibraryScanner for InMemoryLibraryScanner {
    fn matching_files(&self, dir: &Utf8Path, pattern: &str) -> anyhow::Result<Vec<Utf8PathBuf>> {
        let pattern =
            glob::Pattern::new(pattern).with_context(|| format!("invalid pattern {}", pattern))?;
        let mut out: Vec<Utf8PathBuf> = self
            .dirs
            .get(dir)
            .into_iter()
            .flatten()
            .filter(|name| pattern.matches(name))
            .map(|name| dir.join(name))
            .collect();
        out.sort();
        Ok(out)
    }
}
