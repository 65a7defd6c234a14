//! Triage CLI
//!
//! Evaluate a routing policy over scripted customer conversations.
//!
//! ## Commands
//!
//! - `run`: evaluate one policy version and print the report as JSON
//! - `compare`: evaluate v0 and v1 on the same conversations
//! - `validate`: check an evaluation config file
//!
//! Reports go to stdout (or `--output`); logs and summaries go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

use triage_core::{ClockConfig, EvaluationConfig, PolicyVersion, Report};
use triage_runtime::EvaluationOrchestrator;

#[derive(Parser)]
#[command(name = "triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate multi-agent dialogue routing policies", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one policy version
    Run {
        /// Policy version (v0 or v1); overrides the config file
        #[arg(short, long, value_parser = parse_policy)]
        policy: Option<PolicyVersion>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Evaluate v0 and v1 on the same conversations
    Compare {
        #[command(flatten)]
        options: RunOptions,
    },

    /// Check an evaluation config file without running it
    Validate {
        /// Config file (YAML or JSON)
        config: PathBuf,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of conversations to generate
    #[arg(short = 'n', long)]
    conversations: Option<usize>,

    /// Seed for the conversation generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Advance the clock by this many microseconds per reading instead of
    /// measuring real time
    #[arg(long, value_name = "STEP_US")]
    fixed_clock: Option<u64>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print a human-readable summary to stderr
    #[arg(long)]
    summary: bool,
}

impl RunOptions {
    fn load(&self, policy: Option<PolicyVersion>) -> Result<EvaluationConfig> {
        let mut config = match &self.config {
            Some(path) => EvaluationConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => EvaluationConfig::new(policy.unwrap_or(PolicyVersion::V1)),
        };

        if let Some(policy) = policy {
            config.policy_version = policy;
        }
        if let Some(count) = self.conversations {
            config.conversation_count = count;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(step_us) = self.fixed_clock {
            config.clock = ClockConfig::FixedStep { step_us };
        }

        config.validate().context("Invalid evaluation config")?;
        debug!(?config, "resolved config");
        Ok(config)
    }
}

#[derive(Serialize)]
struct Comparison<'a> {
    v0: &'a Report,
    v1: &'a Report,
}

fn parse_policy(raw: &str) -> Result<PolicyVersion, String> {
    raw.parse().map_err(|e: triage_core::ConfigError| e.to_string())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { policy, options } => {
            let config = options.load(policy)?;
            let orchestrator = EvaluationOrchestrator::from_env()?;
            let report = orchestrator.evaluate(&config).await?;

            if options.summary {
                eprintln!("{}", report.summary());
            }
            emit(&report.to_json()?, options.output.as_deref())?;
        }

        Commands::Compare { options } => {
            let config = options.load(None)?;
            let orchestrator = EvaluationOrchestrator::from_env()?;
            let (baseline, corrected) = orchestrator.compare(&config).await?;

            if options.summary {
                eprintln!("{}", baseline.summary());
                eprintln!();
                eprintln!("{}", corrected.summary());
            }

            let comparison = Comparison {
                v0: &baseline,
                v1: &corrected,
            };
            emit(
                &serde_json::to_string_pretty(&comparison)?,
                options.output.as_deref(),
            )?;
        }

        Commands::Validate { config } => {
            let loaded = EvaluationConfig::from_file(&config)
                .with_context(|| format!("{} is not a valid evaluation config", config.display()))?;
            println!(
                "{} is valid (policy {}, {} conversations)",
                config.display(),
                loaded.policy_version,
                loaded.conversation_count
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply_to_defaults() {
        let cli = Cli::parse_from(["triage", "run", "-p", "v0", "-n", "3", "--seed", "9", "--fixed-clock", "5"]);
        let Commands::Run { policy, options } = cli.command else {
            panic!("expected run");
        };

        let config = options.load(policy).unwrap();
        assert_eq!(config.policy_version, PolicyVersion::V0);
        assert_eq!(config.conversation_count, 3);
        assert_eq!(config.seed, 9);
        assert_eq!(config.clock, ClockConfig::FixedStep { step_us: 5 });
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(Cli::try_parse_from(["triage", "run", "--policy", "v2"]).is_err());
    }
}
