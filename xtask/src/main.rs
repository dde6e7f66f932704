use anyhow::Context;
use clap::{Parser, Subcommand};
use fs_err as fs;
use std::process::Command as ProcessCommand;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by depbridge.
    PrintSchemas {
        /// Emit a JSON array instead of one id per line.
        #[arg(long)]
        json: bool,
    },
    /// Write a built-in policy table back out as TOML.
    DumpPolicy {
        /// Built-in table name, e.g. root/v6-22-02.
        #[arg(default_value = "root/v6-22-02")]
        name: String,
        /// Write here instead of stdout.
        #[arg(long)]
        out: Option<String>,
    },
    /// Bless golden fixtures (overwrite expected outputs).
    BlessFixtures,
}

fn schemas() -> [&'static str; 5] {
    use depbridge_types::schema::*;
    [
        DEPBRIDGE_GRAPH_V1,
        DEPBRIDGE_POLICY_V1,
        DEPBRIDGE_PLAN_V1,
        DEPBRIDGE_CONFIGURE_V1,
        DEPBRIDGE_PACKAGE_V1,
    ]
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&schemas())?);
            } else {
                for id in schemas() {
                    println!("{id}");
                }
            }
        }
        Command::DumpPolicy { name, out } => {
            let table = depbridge_policy::builtin(&name)?;
            let text = depbridge_policy::render_policy(&table)?;
            match out {
                Some(path) => {
                    fs::write(&path, text).with_context(|| format!("write {path}"))?;
                    println!("wrote {path}");
                }
                None => print!("{text}"),
            }
        }
        Command::BlessFixtures => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "depbridge-core", "--test", "golden_fixtures"])
                .env("DEPBRIDGE_BLESS", "1")
                .status()
                .context("run golden fixture blessing")?;
            if !status.success() {
                anyhow::bail!("bless-fixtures failed");
            }
        }
    }
    Ok(())
}
