// Biboumi End-to-End Test Driver
//
// Purpose: run the protocol-conformance scenarios against a biboumi binary,
// acting as the XMPP server it connects to as a component.
//
// Usage:
//   cargo run --bin gateway_e2e -- [scenario names...]
//   cargo run --bin gateway_e2e -- --list
//   cargo run --bin gateway_e2e -- inspect simple_kick_20261018_120000.json

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gateway_testing_framework::config::HarnessConfig;
use gateway_testing_framework::orchestrator::{select_scenarios, TestSuite};
use gateway_testing_framework::scenarios::{catalog, load_scenario_file, Scenario};
use gateway_testing_framework::utilities::{
    init_logging, load_artifact, print_artifact_summary, validate_artifact,
};
use log::{info, warn, LevelFilter};
use std::path::PathBuf;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "gateway_e2e")]
#[command(about = "Run end-to-end conformance scenarios against biboumi")]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    /// Scenarios to run (default: all)
    names: Vec<String>,

    /// Harness configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Additional scenarios from a YAML file (repeatable)
    #[arg(short, long = "scenario-file")]
    scenario_file: Vec<PathBuf>,

    /// List the available scenarios and exit
    #[arg(long)]
    list: bool,

    /// Do not start the IRC server (one is already running)
    #[arg(long)]
    no_irc_server: bool,

    /// Run biboumi under valgrind (also enabled by E2E_WITH_VALGRIND)
    #[arg(long)]
    valgrind: bool,

    /// Directory for log files and failure artifacts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Console log level; the per-scenario trace file always gets debug
    #[arg(short, long, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the summary of a failure artifact
    Inspect {
        /// Artifact JSON file
        artifact: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::Inspect { artifact }) = &args.command {
        env_logger::Builder::new().filter_level(args.log_level).init();
        return inspect(artifact).await;
    }

    let config = load_config(&args)?;
    let scenarios = load_scenarios(&args.scenario_file)?;

    if args.list {
        for scenario in &scenarios {
            println!("{:<45} {}", scenario.name, scenario.config);
        }
        return Ok(());
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    let sink = init_logging(args.log_level)?;

    let (selected, unknown) = select_scenarios(scenarios, &args.names);
    let suite = TestSuite::new(config)
        .with_scenarios(selected)
        .with_unknown(unknown)
        .with_trace_sink(sink);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current scenario shuts down");
            let _ = cancel_tx.send(true);
        }
    });

    let report = match suite.run(cancel_rx).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("{}", report.summary());
    std::process::exit(report.exit_code());
}

fn load_config(args: &Args) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.valgrind || std::env::var_os("E2E_WITH_VALGRIND").is_some() {
        config.gateway.valgrind = true;
    }
    if args.no_irc_server {
        config.irc_server.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

/// Built-in catalog followed by the scenarios of every extra file
fn load_scenarios(files: &[PathBuf]) -> Result<Vec<Scenario>> {
    let mut scenarios = catalog::all();
    for file in files {
        for scenario in load_scenario_file(file)? {
            if scenarios.iter().any(|s| s.name == scenario.name) {
                bail!(
                    "Scenario '{}' from {} is already defined",
                    scenario.name,
                    file.display()
                );
            }
            scenarios.push(scenario);
        }
        info!("Loaded scenarios from {}", file.display());
    }
    Ok(scenarios)
}

async fn inspect(path: &PathBuf) -> Result<()> {
    let artifact = load_artifact(path).await?;
    print_artifact_summary(&artifact);
    if let Err(e) = validate_artifact(&artifact) {
        warn!("Artifact looks inconsistent: {:#}", e);
    }
    Ok(())
}
