//! chartup - Helm chart version resolution and update planning CLI
//!
//! Reads chart references extracted from GitOps manifests, fetches the
//! available versions from classic Helm repositories and OCI registries,
//! and reports the update each reference should receive.

use anyhow::Context;
use chartup::cli::CliArgs;
use chartup::config::Config;
use chartup::input::load_manifests;
use chartup::orchestrator::Orchestrator;
use chartup::output::{create_formatter, OutputConfig};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so JSON on stdout stays machine-readable
fn init_tracing(args: &CliArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    if args.verbose {
        eprintln!("chartup v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Charts: {}", args.charts.display());
    }

    let mut config = Config::discover(args.config.as_deref())?;
    if let Some(strategy) = &args.strategy {
        config = config.with_strategy(strategy.clone());
    }

    let manifests = load_manifests(&args.charts)?;

    let orchestrator = Orchestrator::new(&config)
        .context("failed to initialise the version source client")?
        .with_concurrency(args.concurrency);
    let result = orchestrator
        .run_with_progress(&manifests, args.show_progress())
        .await;

    let mut output_config = OutputConfig::from_cli(args.json, args.grouped, args.verbose, args.quiet);
    output_config.color = io::stdout().is_terminal();
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    if result.has_failures() {
        // Partial success - some sources could not be fetched
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
