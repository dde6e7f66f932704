//! Fixed artifact layout of a packaged framework build, and the copy rules
//! that relocate an install tree into it.

use crate::pipeline::{ToolError, load_policy_source};
use crate::ports::WritePort;
use crate::settings::PackageSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use depbridge_types::report::PackageInfo;
use depbridge_types::tool::ToolInfo;
use fs_err as fs;
use glob::Pattern;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Subtree names downstream consumers rely on verbatim.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactLayout;

impl ArtifactLayout {
    pub const INCLUDE: &'static str = "include";
    pub const LIB: &'static str = "lib";
    pub const BIN: &'static str = "bin";
    pub const RESOURCES: &'static str = "res";

    /// Children of `res/`.
    pub const RESOURCE_DIRS: &'static [&'static str] = &[
        "cmake",
        "README",
        "etc",
        "fonts",
        "icons",
        "locale",
        "macros",
        "man",
        "share",
        "tutorials",
    ];

    /// Library file patterns flattened into `lib/`.
    pub const LIBRARY_PATTERNS: &'static [&'static str] = &["*.lib", "*.so", "*.dylib", "*.a"];

    pub const HEADER_PATTERN: &'static str = "*.h*";
}

/// One copy rule: files matching `pattern` below `src` land under `dst`.
#[derive(Debug, Clone)]
struct CopyRule {
    src: Utf8PathBuf,
    pattern: &'static str,
    dst: Utf8PathBuf,
    keep_path: bool,
}

fn copy_rules() -> Vec<CopyRule> {
    let mut rules = vec![CopyRule {
        src: ArtifactLayout::INCLUDE.into(),
        pattern: ArtifactLayout::HEADER_PATTERN,
        dst: ArtifactLayout::INCLUDE.into(),
        keep_path: true,
    }];
    for pattern in ArtifactLayout::LIBRARY_PATTERNS.iter().copied() {
        rules.push(CopyRule {
            src: ArtifactLayout::LIB.into(),
            pattern,
            dst: ArtifactLayout::LIB.into(),
            keep_path: false,
        });
    }
    rules.push(CopyRule {
        src: ArtifactLayout::BIN.into(),
        pattern: "*",
        dst: ArtifactLayout::BIN.into(),
        keep_path: false,
    });
    for dir in ArtifactLayout::RESOURCE_DIRS {
        let sub = Utf8Path::new(ArtifactLayout::RESOURCES).join(dir);
        rules.push(CopyRule {
            src: sub.clone(),
            pattern: "*",
            dst: sub,
            keep_path: true,
        });
    }
    rules
}

/// Every regular file below `dir` whose file name matches `pattern`, sorted.
fn files_below(dir: &Utf8Path, pattern: &str) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let matcher = Pattern::new(pattern).with_context(|| format!("invalid pattern {pattern}"))?;
    let walk = format!("{}/**/*", Pattern::escape(dir.as_str()));
    let mut out = Vec::new();
    for entry in glob::glob(&walk).with_context(|| format!("glob {walk}"))? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| anyhow::anyhow!("non-utf8 path: {}", p.display()))?;
        if !path.is_file() {
            continue;
        }
        if path.file_name().is_some_and(|name| matcher.matches(name)) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Copy an install tree into the fixed layout. Returns the copied files
/// relative to `package_dir`, sorted.
pub fn copy_install_tree(
    install_dir: &Utf8Path,
    package_dir: &Utf8Path,
) -> anyhow::Result<Vec<String>> {
    if !install_dir.is_dir() {
        anyhow::bail!("install tree {} not found", install_dir);
    }

    // destination (relative) -> source
    let mut planned: BTreeMap<Utf8PathBuf, Utf8PathBuf> = BTreeMap::new();
    for rule in copy_rules() {
        let src_dir = install_dir.join(&rule.src);
        if !src_dir.is_dir() {
            debug!(dir = %src_dir, "skipping absent subtree");
            continue;
        }
        for file in files_below(&src_dir, rule.pattern)? {
            let rel = file
                .strip_prefix(&src_dir)
                .with_context(|| format!("{} is outside {}", file, src_dir))?;
            let dest = if rule.keep_path {
                rule.dst.join(rel)
            } else {
                match rel.file_name() {
                    Some(name) => rule.dst.join(name),
                    None => continue,
                }
            };
            if let Some(prev) = planned.insert(dest.clone(), file.clone())
                && prev != file
            {
                warn!(dest = %dest, first = %prev, second = %file, "flattened name collision; last one wins");
            }
        }
    }

    for (dest, src) in &planned {
        let abs = package_dir.join(dest);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
        }
        fs::copy(src, &abs).with_context(|| format!("copy {} to {}", src, abs))?;
    }

    info!(files = planned.len(), package = %package_dir, "install tree packaged");
    Ok(planned.keys().map(|p| p.as_str().replace('\\', "/")).collect())
}

/// Run the package pipeline: relocate the install tree and write
/// `package-info.json` listing the exported libraries.
pub fn run_package(
    settings: &PackageSettings,
    writer: &dyn WritePort,
    tool: ToolInfo,
) -> Result<PackageInfo, ToolError> {
    let (policy, _) = load_policy_source(&settings.policy).context("load policy table")?;

    writer.create_dir_all(&settings.package_dir)?;
    let files = copy_install_tree(&settings.install_dir, &settings.package_dir)?;

    let info = PackageInfo {
        schema: depbridge_types::schema::DEPBRIDGE_PACKAGE_V1.to_string(),
        tool,
        framework: policy.framework,
        framework_version: policy.framework_version,
        libs: policy.exports,
        files,
    };

    let json = serde_json::to_string_pretty(&info).context("serialize package info")?;
    writer.write_file(&settings.package_dir.join("package-info.json"), json.as_bytes())?;

    Ok(info)
}
