//! Conversion pipeline
//!
//! The [`BlfConverter`] is the entry point of the library: it loads the
//! signal database once, reads the frame stream, drives chunk decoding
//! (sequentially or on the rayon pool), merges the partial results in chunk
//! order, persists the consolidated container and, for the CSV target,
//! exports and re-titles the per-signal tabular artifacts.

use crate::chunk::decode_chunk;
use crate::config::ConvertConfig;
use crate::export::export_series;
use crate::formats::read_frames;
use crate::merge::merge_results;
use crate::rename::{CsvFileRenamer, RenameReport};
use crate::signals::SignalDatabase;
use crate::types::{BusFrame, ConsolidatedResult, PartialResult, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Conversion target format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Consolidated MF4 container only
    Mf4,
    /// MF4 container plus renamed per-signal CSV artifacts
    Csv,
}

/// Result of a conversion run
#[derive(Debug)]
pub struct ConvertOutcome {
    /// Path of the written MF4 container
    pub mf4_path: PathBuf,
    /// Requested signals never found in any frame
    pub not_found: BTreeSet<String>,
    /// Recovered signal name -> CSV artifact path (CSV target only)
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Renaming batch report (CSV target only)
    pub rename: Option<RenameReport>,
}

/// Decodes a BLF file against a set of requested signals
pub struct BlfConverter {
    blf: PathBuf,
    db: SignalDatabase,
    wanted: BTreeSet<String>,
    config: ConvertConfig,
}

impl BlfConverter {
    /// Create a converter for one BLF file
    ///
    /// All DBC files are loaded into the signal database here, before any
    /// frame is read.
    pub fn new(
        blf: impl Into<PathBuf>,
        dbc_files: &[PathBuf],
        signals: impl IntoIterator<Item = String>,
        config: ConvertConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut db = SignalDatabase::new();
        for dbc in dbc_files {
            db.add_dbc_file(dbc)?;
        }
        log::info!(
            "Signal database loaded: {} messages, {} signals",
            db.num_messages(),
            db.num_signals()
        );

        Ok(Self {
            blf: blf.into(),
            db,
            wanted: signals.into_iter().collect(),
            config,
        })
    }

    /// Name of the BLF file without its suffix
    pub fn name(&self) -> &str {
        self.blf
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
    }

    /// Output directory for the converted files: a folder next to the BLF
    /// file, named after it
    pub fn output_dir(&self) -> PathBuf {
        self.blf
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(self.name())
    }

    /// Convert the BLF file to the requested target format
    pub fn convert(&self, format: OutputFormat) -> Result<ConvertOutcome> {
        match format {
            OutputFormat::Mf4 => self.convert_to_mf4(),
            OutputFormat::Csv => self.convert_to_csv(),
        }
    }

    /// Decode the whole frame stream into a consolidated result
    ///
    /// The stream is read once and closed before decoding begins. Chunks
    /// are decoded independently; the rayon indexed map keeps the collected
    /// results in chunk position order regardless of completion order, which
    /// is what the merger relies on.
    fn decode_signals(&self) -> Result<ConsolidatedResult> {
        let frames = read_frames(&self.blf)?;
        let chunks: Vec<&[BusFrame]> = frames.chunks(self.config.chunk_size).collect();
        log::info!(
            "Decoding {} frames in {} chunk(s), chunk size {}",
            frames.len(),
            chunks.len(),
            self.config.chunk_size
        );

        let results: Vec<PartialResult> = if self.config.parallel {
            chunks
                .par_iter()
                .map(|chunk| decode_chunk(&self.db, chunk, &self.wanted))
                .collect()
        } else {
            chunks
                .iter()
                .map(|chunk| decode_chunk(&self.db, chunk, &self.wanted))
                .collect()
        };

        merge_results(results)
    }

    /// Which requested signals never showed up
    fn report_not_found(&self, merged: &ConsolidatedResult) -> BTreeSet<String> {
        let not_found: BTreeSet<String> =
            self.wanted.difference(&merged.found).cloned().collect();
        if !not_found.is_empty() {
            log::warn!(
                "The following signals were not found: {}",
                not_found.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        not_found
    }

    /// Write the consolidated container under `<out>/mf4/<name>.mf4`
    fn write_mf4(&self, merged: &ConsolidatedResult) -> Result<PathBuf> {
        let mf4_dir = self.output_dir().join("mf4");
        fs::create_dir_all(&mf4_dir)?;
        let target = mf4_dir.join(format!("{}.mf4", self.name()));
        crate::mdf::save_signals(&merged.series_by_name, &target, self.config.overwrite)
    }

    fn convert_to_mf4(&self) -> Result<ConvertOutcome> {
        let merged = self.decode_signals()?;
        let not_found = self.report_not_found(&merged);
        let mf4_path = self.write_mf4(&merged)?;
        Ok(ConvertOutcome {
            mf4_path,
            not_found,
            artifacts: BTreeMap::new(),
            rename: None,
        })
    }

    fn convert_to_csv(&self) -> Result<ConvertOutcome> {
        let merged = self.decode_signals()?;
        let not_found = self.report_not_found(&merged);
        let mf4_path = self.write_mf4(&merged)?;

        let csv_dir = self.output_dir().join("csv");
        fs::create_dir_all(&csv_dir)?;
        export_series(&merged.series_by_name, &csv_dir, self.name())?;

        let report = CsvFileRenamer::new(&csv_dir).rename_files()?;
        if !report.is_clean() {
            log::warn!(
                "{} CSV artifact(s) could not be renamed",
                report.failures.len()
            );
        }

        // Only successfully renamed artifacts enter the map; failed ones
        // stay in the report under their original paths.
        let artifacts = report.renamed.clone();
        Ok(ConvertOutcome {
            mf4_path,
            not_found,
            artifacts,
            rename: Some(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertConfig;

    #[test]
    fn test_invalid_config_rejected() {
        let config = ConvertConfig::new().with_chunk_size(0);
        let result = BlfConverter::new("trace.blf", &[], Vec::new(), config);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_layout_follows_blf_name() {
        let converter = BlfConverter::new(
            "/data/logs/Logging2023.blf",
            &[],
            Vec::new(),
            ConvertConfig::default(),
        )
        .unwrap();

        assert_eq!(converter.name(), "Logging2023");
        assert_eq!(
            converter.output_dir(),
            PathBuf::from("/data/logs/Logging2023")
        );
    }

    #[test]
    fn test_missing_blf_fails_run() {
        let converter = BlfConverter::new(
            "nonexistent.blf",
            &[],
            vec!["signal1".to_string()],
            ConvertConfig::default(),
        )
        .unwrap();

        assert!(converter.convert(OutputFormat::Mf4).is_err());
    }
}
