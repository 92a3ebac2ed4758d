//! Streaming ingest of TDV sources into the aggregator.
//!
//! Sources are read strictly one after another, in the order given, so the
//! aggregation table sees every line in argument order. A source that cannot
//! be opened is logged and skipped; malformed lines are handled according to
//! the configured [`ParseErrorPolicy`].

use crate::analysis::{Aggregator, FoldError};
use crate::config::ParseErrorPolicy;
use crate::models::{IngestStats, ParseError};
use crate::scanner::InputSource;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Options controlling an ingest run.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Policy for malformed lines.
    pub on_parse_error: ParseErrorPolicy,
    /// Whether to draw a progress spinner on stderr.
    pub show_progress: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            on_parse_error: ParseErrorPolicy::Skip,
            show_progress: false,
        }
    }
}

/// Read every source in order and fold its lines into `aggregator`.
///
/// Returns an error only for fatal conditions: a capacity overflow, or a
/// malformed line under [`ParseErrorPolicy::Abort`].
pub fn ingest_sources(
    sources: &[InputSource],
    aggregator: &mut Aggregator,
    options: IngestOptions,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    for source in sources {
        info!("Opening file: {}", source.path.display());

        let file = match File::open(&source.path) {
            Ok(file) => file,
            Err(e) => {
                error!(
                    "Could not open file #{} ({}) for reading: {}",
                    source.argument,
                    source.path.display(),
                    e
                );
                stats.files_failed += 1;
                continue;
            }
        };

        let name = source.path.display().to_string();
        let progress = progress_bar(options.show_progress, &name);
        let result = ingest_reader(
            &name,
            BufReader::new(file),
            aggregator,
            options,
            progress.as_ref(),
        );

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        stats.absorb(result?);
    }

    Ok(stats)
}

/// Fold all lines of one reader into `aggregator`.
///
/// An I/O error part-way through counts the source as failed and keeps
/// whatever was folded before it.
pub fn ingest_reader<R: BufRead>(
    name: &str,
    mut reader: R,
    aggregator: &mut Aggregator,
    options: IngestOptions,
    progress: Option<&ProgressBar>,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    let mut buf = Vec::with_capacity(128);
    let mut line_number = 0u64;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read {} after line {}: {}", name, line_number, e);
                stats.files_failed += 1;
                return Ok(stats);
            }
        }
        line_number += 1;

        let result = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => aggregator.fold(line),
            Err(_) => Err(FoldError::Parse(ParseError::InvalidUtf8)),
        };

        match result {
            Ok(()) => {
                stats.lines_parsed += 1;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
            }
            Err(e) if e.is_recoverable() && options.on_parse_error == ParseErrorPolicy::Skip => {
                let log = || warn!("{}:{}: skipping malformed line: {}", name, line_number, e);
                match progress {
                    Some(pb) => pb.suspend(log),
                    None => log(),
                }
                stats.lines_skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("{} line {}", name, line_number));
            }
        }
    }

    stats.files_read += 1;
    debug!(
        "Finished {}: {} line(s) parsed, {} skipped",
        name, stats.lines_parsed, stats.lines_skipped
    );

    Ok(stats)
}

fn progress_bar(enabled: bool, name: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}: {pos} records")
    {
        pb.set_style(style);
    }
    pb.set_message(name.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}
