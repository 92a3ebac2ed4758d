//! Streaming per-state aggregation.
//!
//! The [`Aggregator`] owns the aggregation table: one [`StateAccumulator`]
//! per state code, iterated in the order the codes were first seen.

use crate::models::{Observation, ParseError, StateAccumulator};
use std::collections::HashMap;
use thiserror::Error;

/// Error returned when a line cannot be folded into the table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoldError {
    /// The line is malformed. The table is left untouched.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A new state code would exceed the configured capacity.
    #[error("too many states: {limit} already tracked, cannot add {code}")]
    Capacity { limit: usize, code: String },
}

impl FoldError {
    /// Whether the error only concerns the offending line.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FoldError::Parse(_))
    }
}

/// Ordered mapping from state code to its running statistics.
#[derive(Debug, Default)]
pub struct Aggregator {
    states: Vec<StateAccumulator>,
    index: HashMap<String, usize>,
    max_states: Option<usize>,
    records: u64,
}

impl Aggregator {
    /// Create an aggregator with no bound on the number of states.
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator that refuses to track more than `max_states` codes.
    pub fn with_capacity_limit(max_states: Option<usize>) -> Self {
        Self {
            max_states,
            ..Self::default()
        }
    }

    /// Parse a raw TDV line and fold it into the table.
    ///
    /// Blank lines are ignored.
    pub fn fold(&mut self, line: &str) -> Result<(), FoldError> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let observation: Observation = line.parse()?;
        self.fold_observation(&observation)
    }

    /// Fold an already parsed observation into the table.
    pub fn fold_observation(&mut self, observation: &Observation) -> Result<(), FoldError> {
        if let Some(&slot) = self.index.get(&observation.state) {
            self.states[slot].fold(observation);
        } else {
            if let Some(limit) = self.max_states {
                if self.states.len() >= limit {
                    return Err(FoldError::Capacity {
                        limit,
                        code: observation.state.clone(),
                    });
                }
            }

            self.index
                .insert(observation.state.clone(), self.states.len());
            self.states.push(StateAccumulator::new(observation));
        }

        self.records += 1;
        Ok(())
    }

    /// Number of distinct state codes tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Total number of observations folded in.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Look up the accumulator for a state code.
    #[cfg(test)]
    pub fn get(&self, code: &str) -> Option<&StateAccumulator> {
        self.index.get(code).map(|&slot| &self.states[slot])
    }

    /// Consume the aggregator, yielding accumulators in first-seen order.
    pub fn finalize(self) -> Vec<StateAccumulator> {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(state: &str, timestamp: i64, temperature: f64) -> String {
        format!("{state}\t{timestamp}\tgeo\t50.0\t0\t60.0\t1\t1000.0\t{temperature}")
    }

    #[test]
    fn test_first_seen_order() {
        let mut agg = Aggregator::new();
        agg.fold(&line("WA", 1, 280.0)).unwrap();
        agg.fold(&line("TN", 2, 290.0)).unwrap();
        agg.fold(&line("WA", 3, 300.0)).unwrap();

        let codes: Vec<_> = agg
            .finalize()
            .iter()
            .map(|s| s.code().to_string())
            .collect();
        assert_eq!(codes, vec!["WA", "TN"]);
    }

    #[test]
    fn test_record_counts_sum_to_parsed_lines() {
        let mut agg = Aggregator::new();
        let lines = [
            line("WA", 1, 280.0),
            line("TN", 2, 290.0),
            "TN\tbroken".to_string(),
            line("CA", 3, 300.0),
            line("WA", 4, 270.0),
            String::new(),
            line("WA", 5, 275.0),
        ];

        let mut parsed = 0;
        for l in &lines {
            if l.trim().is_empty() {
                continue;
            }
            if agg.fold(l).is_ok() {
                parsed += 1;
            }
        }

        assert_eq!(parsed, 5);
        assert_eq!(agg.records(), 5);
        let states = agg.finalize();
        let total: u64 = states.iter().map(|s| s.record_count()).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_malformed_line_leaves_table_untouched() {
        let mut agg = Aggregator::new();
        agg.fold(&line("TN", 1, 290.0)).unwrap();

        let err = agg.fold("TN\t1000\tgeo\t50.0\t0").unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            FoldError::Parse(ParseError::FieldCount { found: 5, .. })
        ));

        assert_eq!(agg.len(), 1);
        assert_eq!(agg.records(), 1);
        assert_eq!(agg.get("TN").map(|s| s.record_count()), Some(1));
    }

    #[test]
    fn test_malformed_first_line_creates_no_state() {
        let mut agg = Aggregator::new();
        assert!(agg.fold("NV\t1000\tgeo\tx\t0\t60.0\t1\t1000.0\t290.0").is_err());
        assert!(agg.is_empty());
        assert!(agg.get("NV").is_none());
    }

    #[test]
    fn test_non_finite_temperature_keeps_extrema() {
        let mut agg = Aggregator::new();
        agg.fold("TN\t1\tgeo\t50.0\t0\t60.0\t1\t1000.0\tNaN")
            .unwrap_err();
        assert!(agg.is_empty());

        agg.fold(&line("TN", 2, 250.0)).unwrap();
        agg.fold(&line("TN", 3, 320.0)).unwrap();
        let err = agg
            .fold("TN\t4\tgeo\t50.0\t0\t60.0\t1\t1000.0\tinf")
            .unwrap_err();
        assert!(err.is_recoverable());

        let tn = agg.get("TN").unwrap();
        assert_eq!(tn.record_count(), 2);
        assert_eq!(tn.min_temperature().kelvin, 250.0);
        assert_eq!(tn.min_temperature().timestamp_ms, 2);
        assert_eq!(tn.max_temperature().kelvin, 320.0);
        assert_eq!(tn.max_temperature().timestamp_ms, 3);
        assert_eq!(tn.average_temperature(), 285.0);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let mut agg = Aggregator::new();
        agg.fold("").unwrap();
        agg.fold("   \r\n").unwrap();
        assert!(agg.is_empty());
        assert_eq!(agg.records(), 0);
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut agg = Aggregator::new();
        for i in 0..120 {
            agg.fold(&line(&format!("S{i}"), i, 280.0)).unwrap();
        }
        assert_eq!(agg.len(), 120);
    }

    #[test]
    fn test_capacity_limit() {
        let mut agg = Aggregator::with_capacity_limit(Some(2));
        agg.fold(&line("WA", 1, 280.0)).unwrap();
        agg.fold(&line("TN", 2, 290.0)).unwrap();
        // Existing codes still fold once the table is full.
        agg.fold(&line("WA", 3, 300.0)).unwrap();

        let err = agg.fold(&line("CA", 4, 300.0)).unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(
            err,
            FoldError::Capacity {
                limit: 2,
                code: "CA".to_string()
            }
        );
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.records(), 3);
    }

    #[test]
    fn test_identical_input_is_deterministic() {
        let input = [
            line("WA", 1, 280.0),
            line("TN", 2, 290.0),
            line("WA", 3, 301.5),
            line("TN", 4, 288.25),
        ];

        let run = || {
            let mut agg = Aggregator::new();
            for l in &input {
                agg.fold(l).unwrap();
            }
            agg.finalize()
        };

        assert_eq!(run(), run());
    }
}
