//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "remf", version, about = "Resistance / thermo-EMF measurement rig")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/remf.toml")]
    pub config: PathBuf,

    /// Optional step program CSV (strict header); replaces [[steps]]
    #[arg(long, value_name = "FILE")]
    pub steps: Option<PathBuf>,

    /// Print events and errors as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the step program against the simulated rig
    Run {
        /// Stop after this many ticks even if the program is not finished
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Append checkpoint measurements to this results file (tab separated)
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Override sampling.interval_ms (clamped to 200..=10000)
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Also print every thermocouple sample, not only checkpoints
        #[arg(long, action = ArgAction::SetTrue)]
        samples: bool,
    },
    /// Validate the config and print the step program
    Check,
    /// Convert a type-K thermocouple reading to temperature
    Convert {
        /// Thermocouple voltage in millivolts
        #[arg(long, allow_negative_numbers = true)]
        mv: f64,
    },
}
