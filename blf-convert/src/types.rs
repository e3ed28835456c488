//! Core types for the BLF conversion pipeline
//!
//! This module defines the data the pipeline flows: raw bus frames, decoded
//! signal values, per-signal sample series, and the per-chunk / consolidated
//! result shapes exchanged between the chunk decoder and the merger.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Raw CAN frame from a BLF log file
///
/// This represents a single bus event as read from the log file, before any
/// signal decoding. Timestamps are seconds since measurement start and are
/// non-decreasing within one log.
#[derive(Debug, Clone, PartialEq)]
pub struct BusFrame {
    /// Arbitration ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame payload bytes (0-8 for classic CAN, up to 64 for CAN-FD)
    pub data: Vec<u8>,
    /// Timestamp in seconds
    pub timestamp: f64,
}

/// Errors that can occur during conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to parse BLF file: {0}")]
    LogParse(String),

    #[error("Failed to parse DBC file: {0}")]
    DbcParse(String),

    #[error("No message definition for CAN ID 0x{0:X}")]
    MessageNotFound(u32),

    #[error("Frame payload too short for signal '{0}'")]
    PayloadTooShort(String),

    #[error("Invalid merge input: {0}")]
    Validation(String),

    #[error("Invalid signal series: {0}")]
    InvalidSeries(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A decoded signal value before sample formatting
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// Signed integer value (no scaling)
    Integer(i64),
    /// Floating-point value (after factor/offset scaling)
    Float(f64),
    /// Boolean value (single bit, no scaling)
    Boolean(bool),
    /// Textual value from a value table
    Text(String),
}

impl fmt::Display for SignalValue {
    /// Canonical sample form: floats are fixed to 3 decimal digits, every
    /// other kind uses its natural string form. This is the one-way
    /// formatting applied at decode time.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{:.3}", v),
            SignalValue::Boolean(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            SignalValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// One timestamped, formatted sample of a signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSample {
    /// Timestamp in seconds, taken from the originating frame
    pub timestamp: f64,
    /// Formatted value (see [`SignalValue`] display rules)
    pub value: String,
}

/// Ordered sample series for one signal
///
/// Append-only: samples arrive in frame order and the series keeps them in
/// that order. Timestamps must be non-decreasing; `is_ordered` checks the
/// invariant and the merger enforces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSeries {
    samples: Vec<SignalSample>,
}

impl SignalSeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample
    pub fn push(&mut self, timestamp: f64, value: String) {
        self.samples.push(SignalSample { timestamp, value });
    }

    /// Append all samples of `other`, preserving their order
    pub fn extend_from(&mut self, other: &SignalSeries) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// All samples in arrival order
    pub fn samples(&self) -> &[SignalSample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True if timestamps are non-decreasing
    pub fn is_ordered(&self) -> bool {
        self.samples
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }
}

impl FromIterator<(f64, String)> for SignalSeries {
    fn from_iter<I: IntoIterator<Item = (f64, String)>>(iter: I) -> Self {
        let mut series = SignalSeries::new();
        for (timestamp, value) in iter {
            series.push(timestamp, value);
        }
        series
    }
}

/// The output of decoding one chunk of frames
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult {
    /// Decoded series per signal name
    pub series_by_name: BTreeMap<String, SignalSeries>,
    /// Requested signals that appeared in at least one frame of this chunk
    pub found: BTreeSet<String>,
}

impl PartialResult {
    /// Create an empty partial result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decoded sample for a requested signal
    pub fn record(&mut self, name: &str, timestamp: f64, value: String) {
        if !self.found.contains(name) {
            self.found.insert(name.to_string());
        }
        self.series_by_name
            .entry(name.to_string())
            .or_default()
            .push(timestamp, value);
    }

    /// Check the shape invariants of this result
    ///
    /// Returns one message per violated check: the found set must be a
    /// subset of the series keys, and every series must be chronologically
    /// ordered. An empty vector means the result is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for name in &self.found {
            if !self.series_by_name.contains_key(name) {
                violations.push(format!("found signal '{}' has no series", name));
            }
        }
        for (name, series) in &self.series_by_name {
            if !series.is_ordered() {
                violations.push(format!("series '{}' is not chronologically ordered", name));
            }
        }
        violations
    }
}

/// The union of all per-chunk results, in chunk order
///
/// Produced once per run by the merger and not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedResult {
    /// Consolidated series per signal name
    pub series_by_name: BTreeMap<String, SignalSeries>,
    /// Requested signals found in at least one chunk
    pub found: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_value_formatting() {
        assert_eq!(SignalValue::Float(1.23456).to_string(), "1.235");
        assert_eq!(SignalValue::Integer(5).to_string(), "5");
        assert_eq!(SignalValue::Boolean(true).to_string(), "true");
        assert_eq!(SignalValue::Text("text".to_string()).to_string(), "text");
    }

    #[test]
    fn test_series_preserves_order() {
        let mut series = SignalSeries::new();
        series.push(0.1, "1.234".to_string());
        series.push(0.2, "2.345".to_string());
        assert_eq!(series.len(), 2);
        assert!(series.is_ordered());
        assert_eq!(series.samples()[0].value, "1.234");
        assert_eq!(series.samples()[1].timestamp, 0.2);
    }

    #[test]
    fn test_series_detects_disorder() {
        let series: SignalSeries = vec![(0.2, "a".to_string()), (0.1, "b".to_string())]
            .into_iter()
            .collect();
        assert!(!series.is_ordered());
    }

    #[test]
    fn test_partial_result_record() {
        let mut result = PartialResult::new();
        result.record("signal1", 0.1, "1.234".to_string());
        result.record("signal1", 0.2, "2.345".to_string());
        assert!(result.found.contains("signal1"));
        assert_eq!(result.series_by_name["signal1"].len(), 2);
        assert!(result.validate().is_empty());
    }

    #[test]
    fn test_partial_result_validate_found_without_series() {
        let mut result = PartialResult::new();
        result.found.insert("ghost".to_string());
        let violations = result.validate();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("ghost"));
    }
}
