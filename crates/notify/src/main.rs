//! CLI for notify-slack-ci
//!
//! Run `notify-slack-ci --help` for usage information. Every flag can also be
//! supplied through the environment variable named in the help output.

use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notify::config::ActionInputs;
use notify::pipeline::{self, RunError};

/// Exit code for configuration errors, distinct from runtime failures.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "notify-slack-ci")]
#[command(about = "Notify Slack about CI pipeline step results")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    inputs: ActionInputs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("notify=debug,scm=debug,info")
        } else {
            EnvFilter::new("notify=info,scm=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match pipeline::execute(cli.inputs, pipeline::connect).await {
        Ok(report) => {
            tracing::debug!(?report, "Run finished");
            ExitCode::SUCCESS
        }
        Err(e @ RunError::Config(_)) => {
            error!(error = %e, "Invalid configuration");
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
