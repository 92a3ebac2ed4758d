//! Data models for the climate aggregator.
//!
//! This module contains the core data structures used throughout
//! the application: parsed observations, per-state accumulators and
//! the derived summaries handed to the report generator.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of tab-separated fields in a TDV observation line.
pub const TDV_FIELD_COUNT: usize = 9;

/// Error produced when a single TDV line cannot be turned into an observation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The line did not split into the expected number of fields.
    #[error("expected {expected} tab-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// The state code field was empty.
    #[error("state code is empty")]
    EmptyStateCode,

    /// A numeric field held something that is not a number.
    #[error("invalid {field} value: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// The raw line bytes were not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// A single climate observation parsed from one TDV line.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Two-letter state code (e.g. `TN`).
    pub state: String,
    /// Time of observation, milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,
    /// Relative humidity, 0 - 100%.
    pub humidity: f64,
    /// Whether snow cover was present.
    pub snow: bool,
    /// Cloud cover, 0 - 100%.
    pub cloud_cover: f64,
    /// Whether a lightning strike was recorded.
    pub lightning: bool,
    /// Surface pressure in Pa.
    pub pressure: f64,
    /// Surface temperature in Kelvin.
    pub temperature: f64,
}

impl FromStr for Observation {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();

        if fields.len() != TDV_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: TDV_FIELD_COUNT,
                found: fields.len(),
            });
        }

        let state = fields[0];
        if state.is_empty() {
            return Err(ParseError::EmptyStateCode);
        }

        // fields[2] is the geohash; it feeds no statistic.
        Ok(Self {
            state: state.to_string(),
            timestamp_ms: parse_field("timestamp", fields[1])?,
            humidity: parse_number("humidity", fields[3])?,
            snow: parse_flag("snow", fields[4])?,
            cloud_cover: parse_number("cloud cover", fields[5])?,
            lightning: parse_flag("lightning", fields[6])?,
            pressure: parse_number("pressure", fields[7])?,
            temperature: parse_number("temperature", fields[8])?,
        })
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Measurements must be finite; `NaN` and `inf` parse as `f64` but are not readings.
fn parse_number(field: &'static str, value: &str) -> Result<f64, ParseError> {
    let number: f64 = parse_field(field, value)?;
    if !number.is_finite() {
        return Err(ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    Ok(number)
}

/// Flags are written as `0`/`1` or `0.0`/`1.0`; any non-zero value is set.
fn parse_flag(field: &'static str, value: &str) -> Result<bool, ParseError> {
    Ok(parse_number(field, value)? != 0.0)
}

/// A temperature extremum and the moment it was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    /// Temperature in Kelvin.
    pub kelvin: f64,
    /// Observation timestamp in milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,
}

impl Extremum {
    fn of(observation: &Observation) -> Self {
        Self {
            kelvin: observation.temperature,
            timestamp_ms: observation.timestamp_ms,
        }
    }
}

/// Running statistics for one state.
///
/// An accumulator only comes into existence through [`StateAccumulator::new`],
/// which folds the first observation for the state. `record_count` is
/// therefore never zero and every average is well defined.
#[derive(Debug, Clone, PartialEq)]
pub struct StateAccumulator {
    code: String,
    record_count: u64,
    humidity_sum: f64,
    cloud_sum: f64,
    temperature_sum: f64,
    pressure_sum: f64,
    lightning_count: u64,
    snow_count: u64,
    min_temperature: Extremum,
    max_temperature: Extremum,
}

impl StateAccumulator {
    /// Seed an accumulator from the first observation seen for its state.
    pub fn new(observation: &Observation) -> Self {
        Self {
            code: observation.state.clone(),
            record_count: 1,
            humidity_sum: observation.humidity,
            cloud_sum: observation.cloud_cover,
            temperature_sum: observation.temperature,
            pressure_sum: observation.pressure,
            lightning_count: u64::from(observation.lightning),
            snow_count: u64::from(observation.snow),
            min_temperature: Extremum::of(observation),
            max_temperature: Extremum::of(observation),
        }
    }

    /// Fold another observation for the same state.
    pub fn fold(&mut self, observation: &Observation) {
        debug_assert_eq!(self.code, observation.state);

        self.record_count += 1;
        self.humidity_sum += observation.humidity;
        self.cloud_sum += observation.cloud_cover;
        self.temperature_sum += observation.temperature;
        self.pressure_sum += observation.pressure;
        self.lightning_count += u64::from(observation.lightning);
        self.snow_count += u64::from(observation.snow);

        // Independent checks: ties keep the earlier timestamp.
        if observation.temperature < self.min_temperature.kelvin {
            self.min_temperature = Extremum::of(observation);
        }
        if observation.temperature > self.max_temperature.kelvin {
            self.max_temperature = Extremum::of(observation);
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn lightning_count(&self) -> u64 {
        self.lightning_count
    }

    pub fn snow_count(&self) -> u64 {
        self.snow_count
    }

    pub fn min_temperature(&self) -> Extremum {
        self.min_temperature
    }

    pub fn max_temperature(&self) -> Extremum {
        self.max_temperature
    }

    pub fn average_humidity(&self) -> f64 {
        self.humidity_sum / self.record_count as f64
    }

    pub fn average_cloud_cover(&self) -> f64 {
        self.cloud_sum / self.record_count as f64
    }

    /// Average surface temperature in Kelvin.
    pub fn average_temperature(&self) -> f64 {
        self.temperature_sum / self.record_count as f64
    }

    pub fn average_pressure(&self) -> f64 {
        self.pressure_sum / self.record_count as f64
    }
}

/// Convert a Kelvin reading to degrees Fahrenheit.
pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    kelvin * 1.8 - 459.67
}

/// Counters describing one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Sources that were opened and read.
    pub files_read: usize,
    /// Sources that could not be opened or read to completion.
    pub files_failed: usize,
    /// Lines folded into the table.
    pub lines_parsed: u64,
    /// Malformed lines that were skipped.
    pub lines_skipped: u64,
}

impl IngestStats {
    /// Add the counters of another run into this one.
    pub fn absorb(&mut self, other: IngestStats) {
        self.files_read += other.files_read;
        self.files_failed += other.files_failed;
        self.lines_parsed += other.lines_parsed;
        self.lines_skipped += other.lines_skipped;
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s) read, {} failed, {} line(s) parsed, {} skipped",
            self.files_read, self.files_failed, self.lines_parsed, self.lines_skipped
        )
    }
}

/// Presentation-ready summary of one state, used by the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub code: String,
    pub records: u64,
    pub average_humidity: f64,
    pub average_temperature_f: f64,
    pub max_temperature_f: f64,
    pub max_temperature_at: String,
    pub min_temperature_f: f64,
    pub min_temperature_at: String,
    pub lightning_strikes: u64,
    pub snow_cover_records: u64,
    pub average_cloud_cover: f64,
    pub average_pressure_pa: f64,
}

/// The complete JSON report document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub states_found: Vec<String>,
    pub states: Vec<StateSummary>,
    pub ingest: IngestStats,
}
