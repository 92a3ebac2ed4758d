//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Climastat - per-state summaries of NOAA climate observations
///
/// Reads tab-delimited (TDV) observation files and prints record counts,
/// averages, temperature extremes and event counts for every state found,
/// in the order the states first appear.
///
/// Examples:
///   climastat data_tn.tdv data_wa.tdv
///   climastat --utc --format json data/
///   climastat --strict --max-states 50 data_*.tdv
///   climastat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// TDV files (or directories of TDV files) to analyze
    #[arg(
        value_name = "FILE",
        num_args = 1..,
        required_unless_present = "init_config"
    )]
    pub files: Vec<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .climastat.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "CLIMASTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the report to a file instead of standard output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Render observation timestamps in UTC instead of local time
    #[arg(long)]
    pub utc: bool,

    /// Fail if more than this many distinct state codes are found
    #[arg(long, value_name = "COUNT")]
    pub max_states: Option<usize>,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .climastat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text summary (default)
    #[default]
    Text,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.files.is_empty() {
            return Err("At least one input file is required".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_states == Some(0) {
            return Err("Max states must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
