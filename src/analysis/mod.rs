//! Analysis modules.
//!
//! Folding of parsed observations into per-state statistics.

pub mod aggregator;

pub use aggregator::*;
