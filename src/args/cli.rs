use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::config::parse_duration_value;
use crate::error::{AppError, AppResult};

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Verify the Grinder installation and install it when missing
    Install(InstallArgs),
}

#[derive(Debug, Args, Clone)]
pub struct InstallArgs {
    /// Per-mirror download timeout (supports ms/s/m/h)
    #[arg(long = "download-timeout", value_parser = parse_duration_arg)]
    pub download_timeout: Option<Duration>,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Runs The Grinder as a subprocess and streams its KPI log as normalized samples."
)]
pub struct BridgeArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to run file (TOML/JSON). Defaults to ./grinder.toml or ./grinder.json if present.
    #[arg(long = "config", short = 'c')]
    pub config: Option<String>,

    /// Directory for generated files and captured logs (defaults to ~/.grinder-bridge/artifacts/<timestamp>)
    #[arg(long = "artifacts-dir")]
    pub artifacts_dir: Option<String>,

    /// Interval between status checks (supports ms/s/m/h)
    #[arg(long = "poll-interval", value_parser = parse_duration_arg)]
    pub poll_interval: Option<Duration>,

    /// Enable verbose logging (sets log level to debug unless overridden by GRINDER_BRIDGE_LOG/RUST_LOG)
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

pub(crate) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::validation)
}
