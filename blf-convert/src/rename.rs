//! Column-signal renaming
//!
//! The tabular exporter writes one CSV per signal under arbitrary
//! channel-group names. This module recovers the true signal identity from
//! each artifact's header (the second column name), optionally maps it
//! through a caller-provided signal-name mapping, and re-titles the file.
//! Per-artifact failures never abort the batch; they are reported with a
//! distinct reason each and flip the batch result to not-clean.

use crate::types::Result;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Why one artifact could not be renamed
#[derive(Debug, Clone, PartialEq)]
pub enum RenameErrorKind {
    /// The header row could not be read at all (I/O or CSV parse failure)
    ReadError(String),
    /// The header was readable but has fewer than two columns
    TooFewColumns(usize),
    /// The computed destination already exists; the source is left in place
    Conflict(PathBuf),
    /// The rename itself failed on the filesystem
    Io(String),
}

impl std::fmt::Display for RenameErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenameErrorKind::ReadError(e) => write!(f, "could not read header: {}", e),
            RenameErrorKind::TooFewColumns(n) => {
                write!(f, "header has {} column(s), need at least 2", n)
            }
            RenameErrorKind::Conflict(dest) => {
                write!(f, "destination {:?} already exists", dest)
            }
            RenameErrorKind::Io(e) => write!(f, "rename failed: {}", e),
        }
    }
}

/// One artifact that could not be renamed, and why
#[derive(Debug, Clone, PartialEq)]
pub struct RenameFailure {
    pub path: PathBuf,
    pub kind: RenameErrorKind,
}

/// Outcome of a renaming batch
#[derive(Debug, Clone, Default)]
pub struct RenameReport {
    /// Recovered signal name -> final artifact path
    pub renamed: BTreeMap<String, PathBuf>,
    /// Artifacts left under their original names
    pub failures: Vec<RenameFailure>,
}

impl RenameReport {
    /// True only if every artifact renamed with no conflicts and no
    /// parse failures
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Renames CSV artifacts after their second column name
pub struct CsvFileRenamer {
    dir: PathBuf,
    mapping: Option<HashMap<String, String>>,
}

impl CsvFileRenamer {
    /// Create a renamer for one artifact directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mapping: None,
        }
    }

    /// Create a renamer that maps recovered column names through
    /// `mapping` before renaming (unmapped names pass through unchanged)
    pub fn with_mapping(dir: impl Into<PathBuf>, mapping: HashMap<String, String>) -> Self {
        Self {
            dir: dir.into(),
            mapping: Some(mapping),
        }
    }

    /// Recover the signal identity of one artifact from its header row
    ///
    /// Only the header is read; the file body is never scanned.
    fn signal_name(&self, path: &Path) -> std::result::Result<String, RenameErrorKind> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| RenameErrorKind::ReadError(e.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|e| RenameErrorKind::ReadError(e.to_string()))?;

        if headers.len() < 2 {
            return Err(RenameErrorKind::TooFewColumns(headers.len()));
        }

        let column = &headers[1];
        Ok(match &self.mapping {
            Some(mapping) => mapping.get(column).cloned().unwrap_or_else(|| column.to_string()),
            None => column.to_string(),
        })
    }

    /// Rename every CSV artifact in the directory after its recovered
    /// signal name
    ///
    /// Processing always runs to completion; per-artifact failures are
    /// collected in the report. Already-canonical artifacts are kept as-is,
    /// so re-running over the same directory introduces no new conflicts.
    pub fn rename_files(&self) -> Result<RenameReport> {
        let mut report = RenameReport::default();

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().map(|e| e == "csv").unwrap_or(false))
            .collect();
        paths.sort();

        for path in paths {
            let name = match self.signal_name(&path) {
                Ok(name) => name,
                Err(kind) => {
                    log::warn!("Skipping {:?}: {}", path, kind);
                    report.failures.push(RenameFailure { path, kind });
                    continue;
                }
            };

            let dest = self.dir.join(format!("{}.csv", name));
            if dest == path {
                // Already canonical, nothing to do.
                report.renamed.insert(name, dest);
                continue;
            }
            if dest.exists() {
                log::warn!(
                    "Cannot rename {:?} to {:?}: destination already exists",
                    path,
                    dest
                );
                report.failures.push(RenameFailure {
                    path,
                    kind: RenameErrorKind::Conflict(dest),
                });
                continue;
            }

            match fs::rename(&path, &dest) {
                Ok(()) => {
                    log::debug!("Renamed {:?} -> {:?}", path, dest);
                    report.renamed.insert(name, dest);
                }
                Err(e) => {
                    log::warn!("Failed to rename {:?}: {}", path, e);
                    report.failures.push(RenameFailure {
                        path,
                        kind: RenameErrorKind::Io(e.to_string()),
                    });
                }
            }
        }

        Ok(report)
    }
}
