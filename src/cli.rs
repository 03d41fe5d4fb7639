//! CLI argument parsing module for chartup

use crate::orchestrator::DEFAULT_CONCURRENCY;
use clap::Parser;
use std::path::PathBuf;

/// Parse a fetch concurrency limit; zero is rejected
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let limit: usize = s
        .parse()
        .map_err(|_| format!("invalid concurrency: {}", s))?;
    if limit == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    Ok(limit)
}

/// Helm chart version resolution and update planning
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chartup",
    version,
    about = "Plan Helm chart version updates for GitOps manifests"
)]
pub struct CliArgs {
    /// Chart references file (YAML or JSON)
    #[arg(short = 'f', long, default_value = "charts.yaml")]
    pub charts: PathBuf,

    /// Configuration file (default: .chartup.yaml if present)
    #[arg(short, long, env = "CHARTUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Update strategy: patch, minor, major or all (overrides the config file)
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Maximum number of simultaneous source fetches
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub concurrency: usize,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show updates partitioned by configured groups
    #[arg(long)]
    pub grouped: bool,

    /// Enable verbose output (skips, warnings, debug logs)
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Progress is drawn only for interactive text output
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Default log filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "chartup=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}
