//! Clap-free settings for the translate, configure and package pipelines.

use camino::Utf8PathBuf;
use depbridge_types::config::ConfigValue;
use depbridge_types::platform::Platform;

/// Builtin table used when nothing else is configured.
pub const DEFAULT_POLICY: &str = "root/v6-22-02";

/// Where the policy table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// A table compiled into the binary, by `<framework>/<version>` name.
    Builtin(String),
    File(Utf8PathBuf),
}

impl PolicySource {
    /// Anything ending in `.toml` is a file; everything else names a builtin table.
    pub fn parse(s: &str) -> Self {
        if s.ends_with(".toml") {
            PolicySource::File(Utf8PathBuf::from(s))
        } else {
            PolicySource::Builtin(s.to_string())
        }
    }
}

impl Default for PolicySource {
    fn default() -> Self {
        PolicySource::Builtin(DEFAULT_POLICY.to_string())
    }
}

/// Settings for the translate pipeline.
#[derive(Debug, Clone)]
pub struct TranslateSettings {
    pub source_root: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,

    /// Explicit graph document. Discovered in `graph_dir` when unset.
    pub graph_path: Option<Utf8PathBuf>,
    pub graph_dir: Utf8PathBuf,

    pub policy: PolicySource,
    pub platform: Platform,
    pub cxx_standard: Option<String>,

    /// Extra definitions written after everything else.
    pub defines: Vec<(String, ConfigValue)>,

    // Preconditions
    pub require_clean_hashes: bool,
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            source_root: Utf8PathBuf::from("."),
            out_dir: Utf8PathBuf::from("artifacts/depbridge"),
            graph_path: None,
            graph_dir: Utf8PathBuf::from("."),
            policy: PolicySource::default(),
            platform: Platform::current(),
            cxx_standard: None,
            defines: Vec::new(),
            require_clean_hashes: true,
        }
    }
}

/// How CMake is driven after patching.
#[derive(Debug, Clone)]
pub struct CMakeSettings {
    pub program: String,
    pub generator: Option<String>,
    pub build_type: Option<String>,

    /// Also run `cmake --build` after a successful configure.
    pub build: bool,
    pub jobs: Option<u32>,

    /// Run the test suite with `ctest` once the earlier steps succeeded.
    pub test: bool,
    pub ctest_program: String,
}

impl Default for CMakeSettings {
    fn default() -> Self {
        Self {
            program: "cmake".to_string(),
            generator: None,
            build_type: None,
            build: false,
            jobs: None,
            test: false,
            ctest_program: "ctest".to_string(),
        }
    }
}

/// Settings for the configure pipeline.
#[derive(Debug, Clone)]
pub struct ConfigureSettings {
    pub source_root: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    pub build_dir: Utf8PathBuf,

    // Apply behaviour
    pub dry_run: bool,
    pub allow_drift: bool,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,

    pub cmake: CMakeSettings,
}

impl Default for ConfigureSettings {
    fn default() -> Self {
        Self {
            source_root: Utf8PathBuf::from("."),
            out_dir: Utf8PathBuf::from("artifacts/depbridge"),
            build_dir: Utf8PathBuf::from("build"),
            dry_run: true,
            allow_drift: false,
            backup_enabled: true,
            backup_suffix: ".depbridge.bak".to_string(),
            cmake: CMakeSettings::default(),
        }
    }
}

/// Settings for the package pipeline.
#[derive(Debug, Clone)]
pub struct PackageSettings {
    /// Tree produced by the framework's install step.
    pub install_dir: Utf8PathBuf,
    /// Destination; receives the fixed artifact layout.
    pub package_dir: Utf8PathBuf,
    pub policy: PolicySource,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            install_dir: Utf8PathBuf::from("build/install"),
            package_dir: Utf8PathBuf::from("package"),
            policy: PolicySource::default(),
        }
    }
}
