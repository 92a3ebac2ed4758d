//! Climastat - per-state climate summaries
//!
//! A CLI tool that reads tab-delimited NOAA climate observations and
//! reports record counts, averages, temperature extremes and event counts
//! for every state, in the order the states first appear in the input.
//!
//! Exit codes:
//!   0 - Success (including runs where some files could not be opened)
//!   1 - Fatal error (bad config, too many states, malformed line in --strict mode)
//!   2 - Usage error (no input files, unknown flag)

mod analysis;
mod cli;
mod config;
mod ingest;
mod models;
mod report;
mod scanner;

use analysis::Aggregator;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use ingest::IngestOptions;
use std::io::Write;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(args.log_level(config.general.verbose));

    info!("Climastat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(&args, &config) {
        error!("Run failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .climastat.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging. Everything goes to stderr; stdout carries the report.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Aggregate every input and emit the report.
fn run(args: &Args, config: &Config) -> Result<()> {
    let sources = scanner::resolve_inputs(&args.files, &config.input.extensions);

    let mut aggregator = Aggregator::with_capacity_limit(config.aggregation.max_states);
    let options = IngestOptions {
        on_parse_error: config.aggregation.on_parse_error,
        show_progress: !args.quiet,
    };

    let stats = ingest::ingest_sources(&sources, &mut aggregator, options)?;
    info!("Ingest complete: {}", stats);
    if aggregator.is_empty() {
        warn!("No observations were aggregated");
    } else {
        info!(
            "{} state(s) found across {} record(s)",
            aggregator.len(),
            aggregator.records()
        );
    }

    let states = aggregator.finalize();
    let timezone = config.report.timezone;

    let output = match config.report.format {
        OutputFormat::Text => report::generate_text_report(&states, timezone),
        OutputFormat::Json => report::generate_json_report(&states, stats, timezone)?,
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .context("Failed to write report to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
