use crate::error::TranslateError;
use crate::ports::{FsLibraryScanner, LibraryScanner};
use camino::Utf8PathBuf;
use depbridge_types::config::{ConfigSet, ConfigValue};
use depbridge_types::graph::{Dependency, DependencyGraph};
use depbridge_types::patch::{PatchKind, PatchOrigin, PatchSpec};
use depbridge_types::plan::ConfigOverride;
use depbridge_types::platform::Platform;
use depbridge_types::policy::{FeaturePolicy, Locate, PolicyTable, Strategy};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Language standard used when neither the environment nor the policy sets one.
pub const DEFAULT_CXX_STANDARD: &str = "14";

const CXX_STANDARD_KEY: &str = "CMAKE_CXX_STANDARD";

#[derive(Debug, Clone)]
pub struct TranslateContext {
    pub platform: Platform,

    /// Language standard from the invoking environment, if any.
    pub cxx_standard: Option<String>,

    /// Extra definitions written after everything else.
    pub defines: Vec<(String, ConfigValue)>,
}

impl Default for TranslateContext {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            cxx_standard: None,
            defines: vec![],
        }
    }
}

/// How one policy feature was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOutcome {
    pub name: String,
    pub strategy: Strategy,
    pub dependency: Option<String>,

    /// Library files found by scanning, after runtime renames.
    pub libraries: Vec<Utf8PathBuf>,
}

/// Result of a translation pass. Immutable once returned.
#[derive(Debug, Clone)]
pub struct Translation {
    pub config: ConfigSet,
    pub overrides: Vec<ConfigOverride>,
    pub patches: Vec<PatchSpec>,
    pub cxx_standard: String,
    pub features: Vec<FeatureOutcome>,
}

impl Translation {
    pub fn count(&self, strategy: Strategy) -> u64 {
        self.features
            .iter()
            .filter(|f| f.strategy == strategy)
            .count() as u64
    }
}

pub struct Translator {
    scanner: Box<dyn LibraryScanner>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self {
            scanner: Box::new(FsLibraryScanner),
        }
    }

    pub fn with_scanner(scanner: Box<dyn LibraryScanner>) -> Self {
        Self { scanner }
    }

    /// Turn `graph` and `policy` into definitions and patches.
    ///
    /// Every dependency the policy sources externally is checked against the
    /// graph before the first key is written. Nothing here touches the source
    /// tree.
    pub fn translate(
        &self,
        graph: &DependencyGraph,
        policy: &PolicyTable,
        ctx: &TranslateContext,
    ) -> Result<Translation, TranslateError> {
        depbridge_policy::validate(policy)?;

        let external = external_dependencies(policy);
        check_dependencies(graph, policy)?;

        let mut writer = ConfigWriter::default();
        for row in &policy.settings {
            writer.set(&row.key, row.value.clone(), "setting");
        }

        let cxx_standard = ctx
            .cxx_standard
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| policy.cxx_standard.clone())
            .unwrap_or_else(|| DEFAULT_CXX_STANDARD.to_string());
        writer.set(
            CXX_STANDARD_KEY,
            ConfigValue::text(cxx_standard.clone()),
            "cxx_standard",
        );

        let mut renamed = BTreeSet::new();
        let mut features = Vec::with_capacity(policy.features.len());
        for feature in &policy.features {
            let libraries = match feature.strategy {
                Strategy::PreferExternal => self.emit_external(
                    &mut writer,
                    graph,
                    policy,
                    feature,
                    ctx.platform,
                    &mut renamed,
                )?,
                Strategy::PreferBundled => {
                    if let Some(key) = &feature.builtin_key {
                        writer.set(key, ConfigValue::on(), &feature.name);
                    }
                    if let Some(key) = &feature.feature_key {
                        writer.set(key, ConfigValue::on(), &feature.name);
                    }
                    vec![]
                }
                Strategy::Disabled => {
                    if let Some(key) = &feature.feature_key {
                        writer.set(key, ConfigValue::off(), &feature.name);
                    }
                    if let Some(key) = &feature.builtin_key {
                        writer.set(key, ConfigValue::off(), &feature.name);
                    }
                    vec![]
                }
            };
            features.push(FeatureOutcome {
                name: feature.name.clone(),
                strategy: feature.strategy,
                dependency: feature.dependency.clone(),
                libraries,
            });
        }

        for rename in &policy.runtime_renames {
            if !external.contains(rename.dependency.as_str()) {
                debug!(dependency = %rename.dependency, "runtime rename skipped, dependency not external");
                continue;
            }
            if !renamed.contains(&(rename.dependency.clone(), rename.library.clone())) {
                return Err(TranslateError::RenameUnmatched {
                    dependency: rename.dependency.clone(),
                    library: rename.library.clone(),
                });
            }
        }

        for (key, value) in &ctx.defines {
            writer.set(key, value.clone(), "define");
        }

        check_mutual_exclusion(policy, &writer.config)?;

        let mut patches = policy.patches.clone();
        patches.extend(alias_patches(graph, policy, &external)?);

        info!(
            keys = writer.config.len(),
            overrides = writer.overrides.len(),
            patches = patches.len(),
            "translation complete"
        );

        Ok(Translation {
            config: writer.config,
            overrides: writer.overrides,
            patches,
            cxx_standard,
            features,
        })
    }

    fn emit_external(
        &self,
        writer: &mut ConfigWriter,
        graph: &DependencyGraph,
        policy: &PolicyTable,
        feature: &FeaturePolicy,
        platform: Platform,
        renamed: &mut BTreeSet<(String, String)>,
    ) -> Result<Vec<Utf8PathBuf>, TranslateError> {
        let dep = feature
            .dependency
            .as_deref()
            .and_then(|name| graph.get(name))
            .ok_or_else(|| TranslateError::MissingDependency {
                feature: feature.name.clone(),
                dependency: feature.dependency.clone().unwrap_or_default(),
            })?;
        let sep = platform.path_list_separator();

        if let Some(key) = &feature.builtin_key {
            writer.set(key, ConfigValue::off(), &feature.name);
        }
        if let Some(key) = &feature.feature_key {
            writer.set(key, ConfigValue::on(), &feature.name);
        }

        if let Some(key) = &feature.include_key {
            if dep.include_dirs.is_empty() {
                return Err(empty_path_list(feature, dep, key));
            }
            writer.set(
                key,
                ConfigValue::text(join_paths(&dep.include_dirs, sep)),
                &feature.name,
            );
        }

        let libraries = match feature.locate {
            Locate::Dirs => {
                if let Some(key) = &feature.library_key {
                    if dep.lib_dirs.is_empty() {
                        return Err(empty_path_list(feature, dep, key));
                    }
                    writer.set(
                        key,
                        ConfigValue::text(join_paths(&dep.lib_dirs, sep)),
                        &feature.name,
                    );
                }
                vec![]
            }
            Locate::Scan => {
                let mut libraries = self.scan_libraries(feature, dep, platform)?;
                apply_runtime_renames(policy, dep, platform, &mut libraries, renamed);
                if let Some(key) = &feature.library_key {
                    writer.set(
                        key,
                        ConfigValue::text(join_paths(&libraries, sep)),
                        &feature.name,
                    );
                }
                libraries
            }
        };

        Ok(libraries)
    }

    /// Library files of `dep`, in search-path order: directory first, then
    /// stem. Per directory and named stem the first platform pattern with
    /// matches wins. Without named stems every pattern contributes.
    fn scan_libraries(
        &self,
        feature: &FeaturePolicy,
        dep: &Dependency,
        platform: Platform,
    ) -> Result<Vec<Utf8PathBuf>, TranslateError> {
        let wildcard = dep.libs.is_empty();
        let stems: Vec<String> = if wildcard {
            vec!["*".to_string()]
        } else {
            dep.libs.iter().map(|s| glob::Pattern::escape(s)).collect()
        };

        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        for dir in &dep.lib_dirs {
            for stem in &stems {
                for pattern in platform.library_patterns(stem) {
                    let matches = self.scanner.matching_files(dir, &pattern).map_err(|e| {
                        TranslateError::ScanFailed {
                            dependency: dep.name.clone(),
                            dir: dir.clone(),
                            message: format!("{e:#}"),
                        }
                    })?;
                    if matches.is_empty() {
                        continue;
                    }
                    for path in matches {
                        if seen.insert(path.clone()) {
                            found.push(path);
                        }
                    }
                    if !wildcard {
                        break;
                    }
                }
            }
        }

        if found.is_empty() {
            let dirs = if dep.lib_dirs.is_empty() {
                "(no library directories)".to_string()
            } else {
                join_paths(&dep.lib_dirs, ',')
            };
            return Err(TranslateError::UnresolvableArtifact {
                feature: feature.name.clone(),
                dependency: dep.name.clone(),
                dirs,
            });
        }

        debug!(dependency = %dep.name, count = found.len(), "scanned library files");
        Ok(found)
    }
}

/// Keeps the config and records every key written more than once.
#[derive(Default)]
struct ConfigWriter {
    config: ConfigSet,
    overrides: Vec<ConfigOverride>,
}

impl ConfigWriter {
    fn set(&mut self, key: &str, value: ConfigValue, by: &str) {
        if let Some(previous) = self.config.set(key, value.clone()) {
            debug!(key, %previous, %value, by, "definition overridden");
            self.overrides.push(ConfigOverride {
                key: key.to_string(),
                previous,
                value,
                by: by.to_string(),
            });
        }
    }
}

fn external_dependencies(policy: &PolicyTable) -> BTreeSet<&str> {
    policy
        .features
        .iter()
        .filter(|f| f.strategy == Strategy::PreferExternal)
        .filter_map(|f| f.dependency.as_deref())
        .collect()
}

fn check_dependencies(graph: &DependencyGraph, policy: &PolicyTable) -> Result<(), TranslateError> {
    for feature in &policy.features {
        if feature.strategy != Strategy::PreferExternal {
            continue;
        }
        let Some(dep) = feature.dependency.as_deref() else {
            continue;
        };
        if !graph.contains(dep) {
            return Err(TranslateError::MissingDependency {
                feature: feature.name.clone(),
                dependency: dep.to_string(),
            });
        }
    }
    Ok(())
}

fn empty_path_list(feature: &FeaturePolicy, dep: &Dependency, key: &str) -> TranslateError {
    TranslateError::EmptyPathList {
        feature: feature.name.clone(),
        dependency: dep.name.clone(),
        key: key.to_string(),
    }
}

fn join_paths(paths: &[Utf8PathBuf], sep: char) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}

fn apply_runtime_renames(
    policy: &PolicyTable,
    dep: &Dependency,
    platform: Platform,
    libraries: &mut [Utf8PathBuf],
    renamed: &mut BTreeSet<(String, String)>,
) {
    for rename in policy
        .runtime_renames
        .iter()
        .filter(|r| r.dependency == dep.name)
    {
        let patterns: Vec<glob::Pattern> = platform
            .library_patterns(&glob::Pattern::escape(&rename.library))
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        for lib in libraries.iter_mut() {
            let Some(file_name) = lib.file_name() else {
                continue;
            };
            if !patterns.iter().any(|p| p.matches(file_name)) {
                continue;
            }
            renamed.insert((rename.dependency.clone(), rename.library.clone()));

            let versioned = platform.versioned_library_name(file_name, &rename.version);
            if versioned != file_name {
                debug!(from = %file_name, to = %versioned, "runtime library renamed");
                lib.set_file_name(versioned);
            }
        }
    }
}

fn check_mutual_exclusion(policy: &PolicyTable, config: &ConfigSet) -> Result<(), TranslateError> {
    for feature in &policy.features {
        match feature.strategy {
            Strategy::PreferBundled => {
                let path_keys = [&feature.include_key, &feature.library_key];
                if let Some(key) = path_keys
                    .into_iter()
                    .flatten()
                    .find(|k| config.contains_key(k))
                {
                    return Err(TranslateError::MutualExclusion {
                        feature: feature.name.clone(),
                        key: key.clone(),
                    });
                }
            }
            Strategy::PreferExternal => {
                if let Some(key) = &feature.builtin_key
                    && config.get(key).is_some_and(ConfigValue::is_on)
                {
                    return Err(TranslateError::MutualExclusion {
                        feature: feature.name.clone(),
                        key: key.clone(),
                    });
                }
            }
            Strategy::Disabled => {}
        }
    }
    Ok(())
}

fn alias_patches(
    graph: &DependencyGraph,
    policy: &PolicyTable,
    external: &BTreeSet<&str>,
) -> Result<Vec<PatchSpec>, TranslateError> {
    let Some(project) = &policy.project else {
        return Ok(vec![]);
    };

    let mut patches = Vec::new();
    for alias in &policy.aliases {
        if !external.contains(alias.dependency.as_str()) {
            debug!(dependency = %alias.dependency, "alias skipped, dependency not external");
            continue;
        }

        let legacy = alias
            .legacy
            .clone()
            .or_else(|| {
                graph
                    .get(&alias.dependency)
                    .and_then(|d| d.legacy_name.clone())
            })
            .ok_or_else(|| TranslateError::MissingLegacyName {
                dependency: alias.dependency.clone(),
            })?;
        let find_name = alias.find_name.as_deref().unwrap_or(&alias.dependency);

        if legacy == find_name {
            debug!(dependency = %alias.dependency, "alias skipped, names already agree");
            continue;
        }

        patches.push(PatchSpec {
            id: format!("alias-{}", alias.dependency),
            path: project.file.clone(),
            anchor: project.anchor.clone(),
            kind: PatchKind::InsertAfter,
            body: alias_body(find_name, &legacy),
            origin: PatchOrigin::Alias,
            description: Some(format!("expose {find_name} as {legacy}")),
        });
    }
    Ok(patches)
}

/// Discovery under the package manager's name, re-exported under the names
/// the legacy search macros read.
fn alias_body(find_name: &str, legacy: &str) -> String {
    [
        format!("find_package({find_name} REQUIRED)"),
        format!("set({legacy}_VERSION ${{{find_name}_VERSION}})"),
        format!("set({legacy}_FOUND ${{{find_name}_FOUND}})"),
        format!("set({legacy}_LIBRARIES ${{{find_name}_LIBRARIES}})"),
        format!("set({legacy}_INCLUDE_DIR ${{{find_name}_INCLUDE_DIRS}})"),
    ]
    .join("\n")
}
