//! BLF Conversion Library
//!
//! Extracts a bounded set of named signals from Vector BLF logs and
//! persists them for downstream inspection.
//!
//! # Architecture
//!
//! The pipeline is a chain of small, separately testable stages:
//! - Frame reading: BLF objects become [`types::BusFrame`]s (single pass,
//!   file closed before decoding starts)
//! - Chunk decoding: the frame stream is partitioned into bounded chunks
//!   and each chunk is decoded independently against the requested signal
//!   filter -- a pure function, safe to run on a worker pool
//! - Merging: partial results are validated and combined strictly in chunk
//!   order, preserving chronological sample order per signal
//! - Persisting: the consolidated series are written to one MF4 container
//!   and, for the CSV target, exported as per-signal tabular artifacts that
//!   are re-titled after the signal name recovered from their header
//!
//! Per-frame decode failures are skipped; structural violations (malformed
//! merge input, empty series map) fail the run.
//!
//! # Example Usage
//!
//! ```no_run
//! use blf_convert::{BlfConverter, ConvertConfig, OutputFormat};
//! use std::path::PathBuf;
//!
//! let config = ConvertConfig::new().with_chunk_size(150_000);
//! let converter = BlfConverter::new(
//!     "trace.blf",
//!     &[PathBuf::from("powertrain.dbc")],
//!     vec!["EngineSpeed".to_string(), "VehicleSpeed".to_string()],
//!     config,
//! ).unwrap();
//!
//! let outcome = converter.convert(OutputFormat::Csv).unwrap();
//! for (signal, path) in &outcome.artifacts {
//!     println!("{} -> {:?}", signal, path);
//! }
//! ```

pub mod chunk;
pub mod config;
pub mod export;
pub mod formats;
pub mod mdf;
pub mod merge;
pub mod pipeline;
pub mod rename;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use chunk::decode_chunk;
pub use config::ConvertConfig;
pub use merge::merge_results;
pub use pipeline::{BlfConverter, ConvertOutcome, OutputFormat};
pub use rename::{CsvFileRenamer, RenameErrorKind, RenameReport};
pub use signals::SignalDatabase;
pub use types::{
    BusFrame, ConsolidatedResult, ConvertError, PartialResult, Result, SignalSample,
    SignalSeries, SignalValue,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty database decodes nothing
        let db = SignalDatabase::new();
        assert_eq!(db.num_messages(), 0);
        assert!(db.decode_frame(0x123, &[0x00]).is_err());
    }
}
