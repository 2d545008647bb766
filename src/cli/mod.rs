//! Command-line interface for agentation-update.
//!
//! A flat CLI with no subcommands: one invocation runs both update pipelines
//! and exits. Flags control verbosity and the force-reinstall behavior, and
//! an optional TOML file overrides the default paths.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::UpdateConfig;
use crate::core::{RunReport, UpdateOutcome, user_friendly_error};
use crate::orchestrator;

/// Keep agentation and OpenCode up to date.
///
/// Pulls the agentation source checkout forward and rebuilds it, then swaps
/// in the latest prebuilt OpenCode release for this platform. Either half is
/// skipped when its preconditions are not met.
#[derive(Parser, Debug)]
#[command(name = "agentation-update")]
#[command(version)]
#[command(about = "Updates the agentation source checkout and the OpenCode binary")]
pub struct Cli {
    /// Suppress progress output (errors are still printed)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Re-apply updates even when local state already matches upstream
    #[arg(short, long)]
    force: bool,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Runs the updater and returns the process exit code.
    pub async fn execute(self) -> i32 {
        self.init_logging();

        let config = match UpdateConfig::load(self.config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                user_friendly_error(e).display();
                return 1;
            }
        };

        let report = orchestrator::run(&config, self.force).await;

        if !self.quiet {
            print_summary(&report);
        }

        report.exit_code()
    }

    /// Initializes tracing with a level derived from the verbosity flags.
    /// `RUST_LOG` takes precedence when set.
    fn init_logging(&self) {
        let default_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("  agentation source: {}", paint(report.source));
    println!("  opencode binary:   {}", paint(report.release));
}

fn paint(outcome: UpdateOutcome) -> String {
    let label = outcome.as_str();
    match outcome {
        UpdateOutcome::Updated => label.green().to_string(),
        UpdateOutcome::UpToDate => label.cyan().to_string(),
        UpdateOutcome::Skipped => label.yellow().to_string(),
        UpdateOutcome::Failed => label.red().bold().to_string(),
    }
}
