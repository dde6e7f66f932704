use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use depbridge_cli::config::{self, CMakeOverrides, ConfigMerger, TranslateOverrides};
use depbridge_cli::explain::{explain_feature, feature_json, render_feature_table};
use depbridge_core::FsLibraryScanner;
use depbridge_core::adapters::{FsGraphSource, FsWritePort, ProcessCMake};
use depbridge_core::layout::run_package;
use depbridge_core::pipeline::{
    ToolError, load_policy_source, run_configure, run_translate, write_configure_artifacts,
    write_plan_artifacts,
};
use depbridge_core::search::search_cmake_scripts;
use depbridge_core::settings::{ConfigureSettings, PackageSettings, TranslateSettings};
use depbridge_types::platform::Platform;
use depbridge_types::tool::ToolInfo;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "depbridge",
    version,
    about = "Translate a Conan dependency graph into CMake definitions and guarded source patches."
)]
struct Cli {
    /// Config file (default: ./depbridge.toml when present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a plan: CMake definitions plus the patches the source tree needs.
    Translate(TranslateArgs),
    /// Apply a plan's patches and run CMake (default: dry-run).
    Configure(ConfigureArgs),
    /// Copy an install tree into the fixed artifact layout.
    Package(PackageArgs),
    /// List the policy table's features and their strategies.
    ListFeatures(ListFeaturesArgs),
    /// Explain how one feature is sourced and which keys it sets.
    Explain(ExplainArgs),
    /// Search CMakeLists.txt and *.cmake files for a term.
    Search(SearchArgs),
}

#[derive(Debug, Parser)]
struct TranslateArgs {
    /// Framework source root (default: current directory).
    #[arg(long, default_value = ".")]
    source_root: Utf8PathBuf,

    /// Dependency graph document (default: discovered in --graph-dir).
    #[arg(long)]
    graph: Option<Utf8PathBuf>,

    /// Directory searched for depbridge-graph.json / conanbuildinfo.json.
    #[arg(long, default_value = ".")]
    graph_dir: Utf8PathBuf,

    /// Output directory for plan artifacts.
    #[arg(long, default_value = "artifacts/depbridge")]
    out_dir: Utf8PathBuf,

    /// Builtin policy name or path to a policy .toml.
    #[arg(long)]
    policy: Option<String>,

    /// Target platform (default: the host).
    #[arg(long)]
    platform: Option<Platform>,

    /// C++ standard passed as CMAKE_CXX_STANDARD.
    #[arg(long, env = "DEPBRIDGE_CXX_STANDARD")]
    cxx_standard: Option<String>,

    /// Extra definition, written last. Repeatable.
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
    defines: Vec<String>,

    /// Disable sha256 preconditions (not recommended).
    #[arg(long, default_value_t = false)]
    no_clean_hashes: bool,
}

#[derive(Debug, Parser)]
struct ConfigureArgs {
    /// Framework source root (default: current directory).
    #[arg(long, default_value = ".")]
    source_root: Utf8PathBuf,

    /// Directory containing plan.json.
    #[arg(long, default_value = "artifacts/depbridge")]
    out_dir: Utf8PathBuf,

    /// CMake binary directory.
    #[arg(long, default_value = "build")]
    build_dir: Utf8PathBuf,

    /// Write patches and run CMake. If omitted, runs a dry-run and only emits artifacts.
    #[arg(long, default_value_t = false)]
    apply: bool,

    /// Apply even if patch targets changed since the plan was made.
    #[arg(long, default_value_t = false)]
    allow_drift: bool,

    /// Do not keep copies of patched files.
    #[arg(long, default_value_t = false)]
    no_backups: bool,

    /// CMake executable.
    #[arg(long)]
    cmake: Option<String>,

    #[arg(short = 'G', long)]
    generator: Option<String>,

    #[arg(long)]
    build_type: Option<String>,

    /// Run `cmake --build` after configuring.
    #[arg(long, default_value_t = false)]
    build: bool,

    #[arg(short = 'j', long)]
    jobs: Option<u32>,

    /// Run `ctest` after configuring (and building, with --build).
    #[arg(long, default_value_t = false)]
    test: bool,
}

#[derive(Debug, Parser)]
struct PackageArgs {
    /// Install tree produced by the framework's build.
    #[arg(long)]
    install_dir: Utf8PathBuf,

    /// Destination directory.
    #[arg(long)]
    package_dir: Utf8PathBuf,

    /// Builtin policy name or path to a policy .toml.
    #[arg(long)]
    policy: Option<String>,
}

#[derive(Debug, Parser)]
struct ListFeaturesArgs {
    /// Builtin policy name or path to a policy .toml.
    #[arg(long)]
    policy: Option<String>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Feature name (e.g. "lz4", "ssl").
    feature: String,

    /// Builtin policy name or path to a policy .toml.
    #[arg(long)]
    policy: Option<String>,
}

#[derive(Debug, Parser)]
struct SearchArgs {
    term: String,

    /// Directory to search (default: current directory).
    #[arg(long, default_value = ".")]
    root: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file_config = config::load_or_default(cli.config.as_deref(), Utf8Path::new("."))
        .context("load depbridge.toml config")?;
    let merger = ConfigMerger::new(file_config);

    match cli.cmd {
        Command::Translate(args) => cmd_translate(args, merger),
        Command::Configure(args) => cmd_configure(args, merger),
        Command::Package(args) => cmd_package(args, merger),
        Command::ListFeatures(args) => cmd_list_features(args, merger),
        Command::Explain(args) => cmd_explain(args, merger),
        Command::Search(args) => cmd_search(args),
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "depbridge".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        repo: None,
        commit: None,
    }
}

/// Exit code 2 = policy block, 1 = tool error.
fn tool_result<T>(result: Result<T, ToolError>) -> anyhow::Result<Result<T, ExitCode>> {
    match result {
        Ok(v) => Ok(Ok(v)),
        Err(ToolError::PolicyBlock) => {
            error!("policy block");
            Ok(Err(ExitCode::from(2)))
        }
        Err(ToolError::Internal(e)) => Err(e),
    }
}

fn cmd_translate(args: TranslateArgs, merger: ConfigMerger) -> anyhow::Result<ExitCode> {
    let defines = config::parse_cli_defines(&args.defines)?;
    let merged = merger.merge_translate_args(TranslateOverrides {
        policy: args.policy,
        graph: args.graph,
        cxx_standard: args.cxx_standard,
        defines,
        no_clean_hashes: args.no_clean_hashes,
    });
    debug!(?merged, "merged translate config");

    let settings = TranslateSettings {
        source_root: args.source_root,
        out_dir: args.out_dir,
        graph_path: merged.graph_path,
        graph_dir: args.graph_dir,
        policy: merged.policy,
        platform: args.platform.unwrap_or_else(Platform::current),
        cxx_standard: merged.cxx_standard,
        defines: merged.defines,
        require_clean_hashes: merged.require_clean_hashes,
    };

    let graph_source = FsGraphSource::new(settings.graph_path.clone(), settings.graph_dir.clone());
    let outcome = match tool_result(run_translate(
        &settings,
        &graph_source,
        Box::new(FsLibraryScanner),
        tool_info(),
    ))? {
        Ok(outcome) => outcome,
        Err(code) => return Ok(code),
    };

    write_plan_artifacts(&outcome, &settings.out_dir, &FsWritePort)?;

    let summary = &outcome.plan.summary;
    println!(
        "{} definitions ({} external, {} bundled, {} disabled), {} patches over {} files",
        summary.keys_total,
        summary.external,
        summary.bundled,
        summary.disabled,
        summary.patches_total,
        summary.files_touched
    );
    info!("wrote plan to {}", settings.out_dir);
    Ok(ExitCode::SUCCESS)
}

fn cmd_configure(args: ConfigureArgs, merger: ConfigMerger) -> anyhow::Result<ExitCode> {
    let merged = merger.merge_configure_args(CMakeOverrides {
        program: args.cmake,
        generator: args.generator,
        build_type: args.build_type,
        build: args.build,
        jobs: args.jobs,
        test: args.test,
        no_backups: args.no_backups,
    });

    let settings = ConfigureSettings {
        source_root: args.source_root,
        out_dir: args.out_dir,
        build_dir: args.build_dir,
        dry_run: !args.apply,
        allow_drift: args.allow_drift,
        backup_enabled: merged.backups.enabled,
        backup_suffix: merged.backups.suffix,
        cmake: merged.cmake,
    };

    let outcome = match tool_result(run_configure(&settings, &ProcessCMake, tool_info()))? {
        Ok(outcome) => outcome,
        Err(code) => return Ok(code),
    };

    write_configure_artifacts(&outcome, &settings.out_dir, &FsWritePort)?;

    if outcome.policy_block {
        for m in &outcome.report.preconditions.mismatches {
            warn!(path = %m.path, "changed since the plan was made");
        }
        error!(
            "policy block: source tree changed since the plan was made; \
             re-run translate or pass --allow-drift"
        );
        return Ok(ExitCode::from(2));
    }
    if let Some(failure) = outcome.failure {
        anyhow::bail!(failure);
    }

    let s = &outcome.report.summary;
    if settings.dry_run {
        println!(
            "dry-run: {} patches would be applied, {} already present",
            s.applied, s.already_applied
        );
    } else {
        println!(
            "{} patches applied, {} already present, {} files modified",
            s.applied, s.already_applied, s.files_modified
        );
    }
    info!("wrote configure artifacts to {}", settings.out_dir);
    Ok(ExitCode::SUCCESS)
}

fn cmd_package(args: PackageArgs, merger: ConfigMerger) -> anyhow::Result<ExitCode> {
    let settings = PackageSettings {
        install_dir: args.install_dir,
        package_dir: args.package_dir,
        policy: merger.policy_source(args.policy.as_deref()),
    };
    let info = match tool_result(run_package(&settings, &FsWritePort, tool_info()))? {
        Ok(info) => info,
        Err(code) => return Ok(code),
    };
    println!("{} files packaged into {}", info.files.len(), settings.package_dir);
    Ok(ExitCode::SUCCESS)
}

fn cmd_list_features(args: ListFeaturesArgs, merger: ConfigMerger) -> anyhow::Result<ExitCode> {
    let (policy, _) = load_policy_source(&merger.policy_source(args.policy.as_deref()))?;
    match args.format {
        OutputFormat::Text => print!("{}", render_feature_table(&policy)),
        OutputFormat::Json => {
            let rows: Vec<_> = policy.features.iter().map(feature_json).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_explain(args: ExplainArgs, merger: ConfigMerger) -> anyhow::Result<ExitCode> {
    let (policy, _) = load_policy_source(&merger.policy_source(args.policy.as_deref()))?;
    print!("{}", explain_feature(&policy, &args.feature)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_search(args: SearchArgs) -> anyhow::Result<ExitCode> {
    for hit in search_cmake_scripts(&args.root, &args.term)? {
        println!("{hit}");
    }
    Ok(ExitCode::SUCCESS)
}
