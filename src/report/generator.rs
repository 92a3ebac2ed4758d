//! Report generation.
//!
//! This module renders finished per-state accumulators as the plain-text
//! summary or as a JSON document.

use crate::config::TimeZoneMode;
use crate::models::{kelvin_to_fahrenheit, IngestStats, Report, StateAccumulator, StateSummary};
use anyhow::Result;
use chrono::{DateTime, Local, SecondsFormat, Utc};

/// `ctime`-style layout, e.g. `Mon Aug  3 11:00:00 2015`.
const CALENDAR_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Generate the plain-text report, states in table order.
pub fn generate_text_report(states: &[StateAccumulator], timezone: TimeZoneMode) -> String {
    let mut output = String::new();

    output.push_str(&generate_states_found_line(states));

    for state in states {
        output.push_str(&generate_state_block(state, timezone));
    }

    output
}

/// The leading line listing every state code, each followed by a space.
fn generate_states_found_line(states: &[StateAccumulator]) -> String {
    let mut line = String::from("States found: ");
    for state in states {
        line.push_str(state.code());
        line.push(' ');
    }
    line.push('\n');
    line
}

/// Generate the summary block for a single state.
fn generate_state_block(state: &StateAccumulator, timezone: TimeZoneMode) -> String {
    let mut block = String::new();
    let max = state.max_temperature();
    let min = state.min_temperature();

    block.push_str(&format!("-- State: {} --\n", state.code()));
    block.push_str(&format!("Number of Records: {}\n", state.record_count()));
    block.push_str(&format!(
        "Average Humidity: {:.1}%\n",
        state.average_humidity()
    ));
    block.push_str(&format!(
        "Average Temperature: {:.1}F\n",
        kelvin_to_fahrenheit(state.average_temperature())
    ));
    block.push_str(&format!(
        "Max Temperature: {:.1}F\n",
        kelvin_to_fahrenheit(max.kelvin)
    ));
    block.push_str(&format!(
        "Max Temperature on: {}\n",
        format_calendar(max.timestamp_ms, timezone)
    ));
    block.push_str(&format!(
        "Min Temperature: {:.1}F\n",
        kelvin_to_fahrenheit(min.kelvin)
    ));
    block.push_str(&format!(
        "Min Temperature on: {}\n",
        format_calendar(min.timestamp_ms, timezone)
    ));
    block.push_str(&format!("Lightning Strikes: {}\n", state.lightning_count()));
    block.push_str(&format!("Records with Snow Cover: {}\n", state.snow_count()));
    block.push_str(&format!(
        "Average Cloud Cover: {:.1}% \n",
        state.average_cloud_cover()
    ));

    block
}

/// Build the presentation summary of one accumulator.
pub fn summarize(state: &StateAccumulator, timezone: TimeZoneMode) -> StateSummary {
    let max = state.max_temperature();
    let min = state.min_temperature();

    StateSummary {
        code: state.code().to_string(),
        records: state.record_count(),
        average_humidity: state.average_humidity(),
        average_temperature_f: kelvin_to_fahrenheit(state.average_temperature()),
        max_temperature_f: kelvin_to_fahrenheit(max.kelvin),
        max_temperature_at: format_rfc3339(max.timestamp_ms, timezone),
        min_temperature_f: kelvin_to_fahrenheit(min.kelvin),
        min_temperature_at: format_rfc3339(min.timestamp_ms, timezone),
        lightning_strikes: state.lightning_count(),
        snow_cover_records: state.snow_count(),
        average_cloud_cover: state.average_cloud_cover(),
        average_pressure_pa: state.average_pressure(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(
    states: &[StateAccumulator],
    ingest: IngestStats,
    timezone: TimeZoneMode,
) -> Result<String> {
    let report = Report {
        states_found: states.iter().map(|s| s.code().to_string()).collect(),
        states: states.iter().map(|s| summarize(s, timezone)).collect(),
        ingest,
    };

    let mut json = serde_json::to_string_pretty(&report)?;
    json.push('\n');
    Ok(json)
}

/// Whole seconds of a millisecond timestamp, as a UTC instant.
fn instant(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp_ms.div_euclid(1000), 0)
}

fn format_calendar(timestamp_ms: i64, timezone: TimeZoneMode) -> String {
    match (instant(timestamp_ms), timezone) {
        (Some(at), TimeZoneMode::Utc) => at.format(CALENDAR_FORMAT).to_string(),
        (Some(at), TimeZoneMode::Local) => {
            at.with_timezone(&Local).format(CALENDAR_FORMAT).to_string()
        }
        (None, _) => format!("<invalid timestamp {}>", timestamp_ms),
    }
}

fn format_rfc3339(timestamp_ms: i64, timezone: TimeZoneMode) -> String {
    match (instant(timestamp_ms), timezone) {
        (Some(at), TimeZoneMode::Utc) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
        (Some(at), TimeZoneMode::Local) => at
            .with_timezone(&Local)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        (None, _) => format!("<invalid timestamp {}>", timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Aggregator;

    fn aggregate(lines: &[&str]) -> Vec<StateAccumulator> {
        let mut agg = Aggregator::new();
        for line in lines {
            agg.fold(line).unwrap();
        }
        agg.finalize()
    }

    #[test]
    fn test_single_record_report() {
        let states = aggregate(&["TN\t1000\tgeo\t50.0\t0\t60.0\t1\t1000.0\t290.0"]);
        let report = generate_text_report(&states, TimeZoneMode::Utc);

        let expected = "States found: TN \n\
                        -- State: TN --\n\
                        Number of Records: 1\n\
                        Average Humidity: 50.0%\n\
                        Average Temperature: 62.3F\n\
                        Max Temperature: 62.3F\n\
                        Max Temperature on: Thu Jan  1 00:00:01 1970\n\
                        Min Temperature: 62.3F\n\
                        Min Temperature on: Thu Jan  1 00:00:01 1970\n\
                        Lightning Strikes: 1\n\
                        Records with Snow Cover: 0\n\
                        Average Cloud Cover: 60.0% \n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_empty_report() {
        let report = generate_text_report(&[], TimeZoneMode::Utc);
        assert_eq!(report, "States found: \n");
    }

    #[test]
    fn test_states_in_first_seen_order() {
        let states = aggregate(&[
            "WA\t1000\tgeo\t50.0\t0\t60.0\t1\t1000.0\t290.0",
            "TN\t2000\tgeo\t50.0\t0\t60.0\t1\t1000.0\t290.0",
            "WA\t3000\tgeo\t50.0\t0\t60.0\t1\t1000.0\t290.0",
        ]);
        let report = generate_text_report(&states, TimeZoneMode::Utc);

        assert!(report.starts_with("States found: WA TN \n"));
        let wa = report.find("-- State: WA --").unwrap();
        let tn = report.find("-- State: TN --").unwrap();
        assert!(wa < tn);
    }

    #[test]
    fn test_extremes_and_timestamps() {
        let states = aggregate(&[
            "TN\t1438560000000\tgeo\t40.0\t1\t50.0\t0\t1000.0\t300.0",
            "TN\t1438599600000\tgeo\t60.0\t0\t70.0\t1\t1000.0\t316.7",
            "TN\t1424404800000\tgeo\t50.0\t1\t30.0\t1\t1000.0\t249.2",
        ]);
        let report = generate_text_report(&states, TimeZoneMode::Utc);

        assert!(report.contains("Number of Records: 3\n"));
        assert!(report.contains("Average Humidity: 50.0%\n"));
        assert!(report.contains("Max Temperature: 110.4F\n"));
        assert!(report.contains("Max Temperature on: Mon Aug  3 11:00:00 2015\n"));
        assert!(report.contains("Min Temperature: -11.1F\n"));
        assert!(report.contains("Min Temperature on: Fri Feb 20 04:00:00 2015\n"));
        assert!(report.contains("Lightning Strikes: 2\n"));
        assert!(report.contains("Records with Snow Cover: 2\n"));
        assert!(report.contains("Average Cloud Cover: 50.0% \n"));
    }

    #[test]
    fn test_max_temperature_on_separate_line() {
        let states = aggregate(&["TN\t1000\tgeo\t50.0\t0\t60.0\t1\t1000.0\t290.0"]);
        let report = generate_text_report(&states, TimeZoneMode::Utc);

        assert!(report.contains("Max Temperature: 62.3F\nMax Temperature on: "));
        assert!(report.contains("Min Temperature: 62.3F\nMin Temperature on: "));
        assert!(!report.contains("F on "));
    }

    #[test]
    fn test_identical_runs_render_identically() {
        let lines = [
            "WA\t1000\tgeo\t61.0\t0\t55.0\t1\t1000.0\t281.3",
            "TN\t2000\tgeo\t49.0\t1\t53.0\t0\t1000.0\t287.9",
            "WA\t3000\tgeo\t62.0\t1\t54.0\t0\t1000.0\t279.4",
        ];
        let first = generate_text_report(&aggregate(&lines), TimeZoneMode::Utc);
        let second = generate_text_report(&aggregate(&lines), TimeZoneMode::Utc);
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_json_report() {
        let states = aggregate(&["TN\t1000\tgeo\t50.0\t0\t60.0\t1\t1000.0\t290.0"]);
        let stats = IngestStats {
            files_read: 1,
            files_failed: 1,
            lines_parsed: 1,
            lines_skipped: 0,
        };
        let json = generate_json_report(&states, stats, TimeZoneMode::Utc).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["states_found"], serde_json::json!(["TN"]));
        assert_eq!(value["states"][0]["records"], 1);
        assert_eq!(value["states"][0]["lightning_strikes"], 1);
        assert_eq!(value["states"][0]["average_pressure_pa"], 1000.0);
        assert_eq!(
            value["states"][0]["max_temperature_at"],
            "1970-01-01T00:00:01Z"
        );
        assert_eq!(value["ingest"]["files_failed"], 1);
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert_eq!(
            format_calendar(i64::MAX, TimeZoneMode::Utc),
            format!("<invalid timestamp {}>", i64::MAX)
        );
    }
}
