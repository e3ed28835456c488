//! Per-signal tabular export
//!
//! Converts consolidated series into one flat CSV artifact per signal,
//! written under channel-group file names. The header row carries the
//! timestamp column first and the signal name second; the renamer later
//! recovers the signal identity from that second column.

use crate::types::{Result, SignalSeries};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Export every series as `<stem>.ChannelGroup_<n>.csv` inside `dir`
///
/// Returns the written paths in group order.
pub fn export_series(
    series_by_name: &BTreeMap<String, SignalSeries>,
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(series_by_name.len());

    for (index, (name, series)) in series_by_name.iter().enumerate() {
        let path = dir.join(format!("{}.ChannelGroup_{}.csv", stem, index));
        let mut writer = csv::Writer::from_path(&path)?;

        writer.write_record(["timestamps", name])?;
        for sample in series.samples() {
            writer.write_record([sample.timestamp.to_string(), sample.value.clone()])?;
        }
        writer.flush()?;

        log::debug!("Exported {} samples of '{}' to {:?}", series.len(), name, path);
        written.push(path);
    }

    Ok(written)
}
