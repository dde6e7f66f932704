//! Configuration file loading for depbridge.
//!
//! Discovers and loads `depbridge.toml` from the working directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use depbridge_core::settings::{CMakeSettings, DEFAULT_POLICY, PolicySource};
use depbridge_types::config::ConfigValue;
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "depbridge.toml";

/// Top-level configuration from depbridge.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepbridgeConfig {
    pub policy: PolicyConfig,

    pub graph: GraphConfig,

    pub cmake: CMakeConfig,

    pub backups: BackupsConfig,

    /// Extra definitions, written after everything the policy produces.
    #[serde(rename = "define")]
    pub defines: Vec<DefineRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Builtin table name (`root/v6-22-02`) or path to a `.toml` table.
    pub source: Option<String>,

    /// Language standard; overrides the table's own default.
    pub cxx_standard: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CMakeConfig {
    pub program: Option<String>,
    pub generator: Option<String>,
    pub build_type: Option<String>,
    pub build: bool,
    pub jobs: Option<u32>,

    /// Run `ctest` after the build.
    pub test: bool,
    pub ctest: Option<String>,
}

/// Backups section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupsConfig {
    /// Whether to create backups before patching.
    pub enabled: bool,

    /// Suffix for backup files.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: ".depbridge.bak".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefineRow {
    pub key: String,
    pub value: ConfigValue,
}

/// Discover the depbridge.toml config file in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a depbridge.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<DepbridgeConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<DepbridgeConfig> {
    let config: DepbridgeConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load an explicit config file, or discover one in `dir`, or fall back to defaults.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<DepbridgeConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(DepbridgeConfig::default()),
    }
}

/// Translate-time settings after merging file and CLI.
#[derive(Debug, Clone)]
pub struct MergedTranslate {
    pub policy: PolicySource,
    pub graph_path: Option<Utf8PathBuf>,
    pub cxx_standard: Option<String>,
    pub defines: Vec<(String, ConfigValue)>,
    pub require_clean_hashes: bool,
}

/// Configure-time settings after merging file and CLI.
#[derive(Debug, Clone)]
pub struct MergedConfigure {
    pub cmake: CMakeSettings,
    pub backups: BackupsConfig,
}

/// CLI values that can override the translate section of the config.
#[derive(Debug, Clone, Default)]
pub struct TranslateOverrides {
    pub policy: Option<String>,
    pub graph: Option<Utf8PathBuf>,
    pub cxx_standard: Option<String>,
    pub defines: Vec<(String, ConfigValue)>,
    pub no_clean_hashes: bool,
}

/// CLI values that can override the cmake section of the config.
#[derive(Debug, Clone, Default)]
pub struct CMakeOverrides {
    pub program: Option<String>,
    pub generator: Option<String>,
    pub build_type: Option<String>,
    pub build: bool,
    pub jobs: Option<u32>,
    pub test: bool,
    pub no_backups: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: DepbridgeConfig,
}

impl ConfigMerger {
    pub fn new(config: DepbridgeConfig) -> Self {
        Self { config }
    }

    /// The policy named by the config file, or the default builtin table.
    pub fn policy_source(&self, cli_policy: Option<&str>) -> PolicySource {
        let name = cli_policy
            .or(self.config.policy.source.as_deref())
            .unwrap_or(DEFAULT_POLICY);
        PolicySource::parse(name)
    }

    /// Merge with translate command CLI arguments.
    ///
    /// CLI defines are appended after the config file's, so they win on
    /// a shared key.
    pub fn merge_translate_args(self, cli: TranslateOverrides) -> MergedTranslate {
        let policy = self.policy_source(cli.policy.as_deref());

        let mut defines: Vec<(String, ConfigValue)> = self
            .config
            .defines
            .into_iter()
            .map(|d| (d.key, d.value))
            .collect();
        defines.extend(cli.defines);

        MergedTranslate {
            policy,
            graph_path: cli.graph.or(self.config.graph.path),
            cxx_standard: non_empty(cli.cxx_standard)
                .or_else(|| non_empty(self.config.policy.cxx_standard)),
            defines,
            require_clean_hashes: !cli.no_clean_hashes,
        }
    }

    /// Merge with configure command CLI arguments.
    pub fn merge_configure_args(self, cli: CMakeOverrides) -> MergedConfigure {
        let defaults = CMakeSettings::default();
        let file = self.config.cmake;
        let mut backups = self.config.backups;
        if cli.no_backups {
            backups.enabled = false;
        }

        MergedConfigure {
            cmake: CMakeSettings {
                program: cli.program.or(file.program).unwrap_or(defaults.program),
                generator: cli.generator.or(file.generator),
                build_type: cli.build_type.or(file.build_type),
                build: cli.build || file.build,
                jobs: cli.jobs.or(file.jobs),
                test: cli.test || file.test,
                ctest_program: file.ctest.unwrap_or(defaults.ctest_program),
            },
            backups,
        }
    }
}

/// An unset environment variable and an empty one mean the same thing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse `KEY=VALUE` definitions. `ON`/`OFF` (any case) become switches.
pub fn parse_cli_defines(defines: &[String]) -> anyhow::Result<Vec<(String, ConfigValue)>> {
    let mut out = Vec::with_capacity(defines.len());
    for entry in defines {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid define '{}': expected KEY=VALUE", entry))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("invalid define '{}': missing key", entry);
        }
        let value = match value.trim() {
            v if v.eq_ignore_ascii_case("on") => ConfigValue::on(),
            v if v.eq_ignore_ascii_case("off") => ConfigValue::off(),
            v => ConfigValue::text(v),
        };
        out.push((key.to_string(), value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_example_config() {
        let contents = r#"
[policy]
source = "root/v6-22-02"
cxx_standard = "17"

[graph]
path = "build/conanbuildinfo.json"

[cmake]
generator = "Ninja"
build_type = "Release"
build = true
jobs = 8

[backups]
enabled = false
suffix = ".orig"

[[define]]
key = "roofit"
value = true

[[define]]
key = "CMAKE_INSTALL_PREFIX"
value = "/opt/root"
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.policy.source.as_deref(), Some("root/v6-22-02"));
        assert_eq!(config.policy.cxx_standard.as_deref(), Some("17"));
        assert_eq!(
            config.graph.path,
            Some(Utf8PathBuf::from("build/conanbuildinfo.json"))
        );
        assert_eq!(config.cmake.generator.as_deref(), Some("Ninja"));
        assert!(config.cmake.build);
        assert_eq!(config.cmake.jobs, Some(8));
        assert!(!config.backups.enabled);
        assert_eq!(
            config.defines,
            vec![
                DefineRow {
                    key: "roofit".to_string(),
                    value: ConfigValue::on()
                },
                DefineRow {
                    key: "CMAKE_INSTALL_PREFIX".to_string(),
                    value: ConfigValue::text("/opt/root")
                },
            ]
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.policy.source.is_none());
        assert!(config.defines.is_empty());
        assert!(config.backups.enabled);
        assert_eq!(config.backups.suffix, ".depbridge.bak");
    }

    #[test]
    fn test_unknown_value_type_is_rejected() {
        let err = parse_config("[[define]]\nkey = \"x\"\nvalue = 3\n").expect_err("integer");
        assert!(format!("{err:#}").contains("invalid TOML"));
    }

    #[test]
    fn test_cli_defines_follow_file_defines() {
        let config = parse_config("[[define]]\nkey = \"roofit\"\nvalue = false\n").unwrap();
        let merged = ConfigMerger::new(config).merge_translate_args(TranslateOverrides {
            defines: vec![("roofit".to_string(), ConfigValue::on())],
            ..Default::default()
        });
        assert_eq!(
            merged.defines,
            vec![
                ("roofit".to_string(), ConfigValue::off()),
                ("roofit".to_string(), ConfigValue::on()),
            ]
        );
        assert!(merged.require_clean_hashes);
    }

    #[test]
    fn test_cli_wins_over_file() {
        let config = parse_config(
            "[policy]\nsource = \"custom.toml\"\ncxx_standard = \"17\"\n[graph]\npath = \"a.json\"\n",
        )
        .unwrap();
        let merged = ConfigMerger::new(config).merge_translate_args(TranslateOverrides {
            policy: Some("root/v6-22-02".to_string()),
            cxx_standard: Some("20".to_string()),
            ..Default::default()
        });
        assert_eq!(
            merged.policy,
            PolicySource::Builtin("root/v6-22-02".to_string())
        );
        assert_eq!(merged.cxx_standard.as_deref(), Some("20"));
        assert_eq!(merged.graph_path, Some(Utf8PathBuf::from("a.json")));
    }

    #[test]
    fn test_file_policy_is_used_without_cli() {
        let config = parse_config("[policy]\nsource = \"policies/custom.toml\"\n").unwrap();
        let merger = ConfigMerger::new(config);
        assert_eq!(
            merger.policy_source(None),
            PolicySource::File(Utf8PathBuf::from("policies/custom.toml"))
        );
    }

    #[test]
    fn test_merge_configure_args() {
        let config = parse_config("[cmake]\nprogram = \"cmake3\"\ngenerator = \"Ninja\"\n").unwrap();
        let merged = ConfigMerger::new(config).merge_configure_args(CMakeOverrides {
            generator: Some("Unix Makefiles".to_string()),
            no_backups: true,
            ..Default::default()
        });
        assert_eq!(merged.cmake.program, "cmake3");
        assert_eq!(merged.cmake.generator.as_deref(), Some("Unix Makefiles"));
        assert!(!merged.cmake.build);
        assert!(!merged.backups.enabled);
    }

    #[test]
    fn test_cmake_test_flag_from_file_or_cli() {
        let config = parse_config("[cmake]\ntest = true\nctest = \"ctest3\"\n").unwrap();
        assert!(config.cmake.test);
        let merged = ConfigMerger::new(config).merge_configure_args(CMakeOverrides::default());
        assert!(merged.cmake.test);
        assert_eq!(merged.cmake.ctest_program, "ctest3");

        let merged = ConfigMerger::new(parse_config("").unwrap()).merge_configure_args(
            CMakeOverrides {
                test: true,
                ..Default::default()
            },
        );
        assert!(merged.cmake.test);
        assert_eq!(merged.cmake.ctest_program, "ctest");
    }

    #[test]
    fn test_empty_cli_standard_falls_back_to_file() {
        let config = parse_config("[policy]\ncxx_standard = \"17\"\n").unwrap();
        let merged = ConfigMerger::new(config).merge_translate_args(TranslateOverrides {
            cxx_standard: Some("  ".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.cxx_standard.as_deref(), Some("17"));

        let config = parse_config("[policy]\ncxx_standard = \"\"\n").unwrap();
        let merged = ConfigMerger::new(config).merge_translate_args(TranslateOverrides {
            cxx_standard: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(merged.cxx_standard, None);
    }

    #[test]
    fn test_parse_cli_defines() {
        let parsed = parse_cli_defines(&[
            "roofit=on".to_string(),
            "CMAKE_INSTALL_PREFIX=/opt/root".to_string(),
            "EMPTY=".to_string(),
        ])
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                ("roofit".to_string(), ConfigValue::on()),
                ("CMAKE_INSTALL_PREFIX".to_string(), ConfigValue::text("/opt/root")),
                ("EMPTY".to_string(), ConfigValue::text("")),
            ]
        );
    }

    #[test]
    fn test_parse_cli_defines_errors() {
        let err = parse_cli_defines(&["novalue".to_string()]).expect_err("no '='");
        assert!(err.to_string().contains("expected KEY=VALUE"));
        let err = parse_cli_defines(&["=x".to_string()]).expect_err("no key");
        assert!(err.to_string().contains("missing key"));
    }

    #[test]
    fn test_load_or_default() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let cfg = load_or_default(None, &root).expect("load default");
        assert!(cfg.policy.source.is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "[policy]\ncxx_standard = \"17\"\n")
            .expect("write config");
        let cfg = load_or_default(None, &root).expect("load discovered");
        assert_eq!(cfg.policy.cxx_standard.as_deref(), Some("17"));

        let err = load_or_default(Some(&root.join("missing.toml")), &root).expect_err("missing");
        assert!(format!("{err:#}").contains("missing.toml"));
    }
}
