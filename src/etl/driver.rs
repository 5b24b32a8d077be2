//! Batch driver: discovers the files of one input family and loads them one
//! transaction at a time.

use super::report::ReconciliationLog;
use super::transform::{transform_log_file, transform_song_file, LogFileStats};
use crate::error::EtlError;
use crate::warehouse::SqliteWarehouseStore;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// The two input families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Song,
    Log,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCategory::Song => write!(f, "song"),
            FileCategory::Log => write!(f, "log"),
        }
    }
}

/// What the driver does when a file fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch and the run at the first failed file.
    #[default]
    Abort,
    /// Roll back the failed file, record it and go on with the next one.
    Skip,
}

#[derive(Debug)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: EtlError,
}

/// Outcome of one batch.
#[derive(Debug)]
pub struct BatchReport {
    pub category: FileCategory,
    pub files_found: usize,
    pub files_processed: usize,
    pub failed_files: Vec<FailedFile>,
    /// Lookup misses of the committed files, in file order.
    pub reconciliation: ReconciliationLog,
    pub stats: LogFileStats,
}

impl BatchReport {
    fn new(category: FileCategory, files_found: usize) -> Self {
        Self {
            category,
            files_found,
            files_processed: 0,
            failed_files: Vec::new(),
            reconciliation: ReconciliationLog::new(),
            stats: LogFileStats::default(),
        }
    }
}

/// Lists the files under `root` with the given extension, sorted by path.
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, EtlError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| EtlError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

pub struct BatchDriver<'a> {
    store: &'a mut SqliteWarehouseStore,
    extension: String,
    policy: FailurePolicy,
}

impl<'a> BatchDriver<'a> {
    pub fn new(store: &'a mut SqliteWarehouseStore, extension: &str, policy: FailurePolicy) -> Self {
        Self {
            store,
            extension: extension.to_string(),
            policy,
        }
    }

    /// Loads every file of `category` found under `dir`.
    ///
    /// Each file is committed on its own. A failed file is rolled back and,
    /// under `FailurePolicy::Abort`, ends the batch with the error; files
    /// committed before it stay committed.
    pub fn run(&mut self, category: FileCategory, dir: &Path) -> Result<BatchReport, EtlError> {
        let files = discover_files(dir, &self.extension)?;
        let total = files.len();
        info!("{} files found in {}", total, dir.display());

        let mut report = BatchReport::new(category, total);
        for (index, path) in files.into_iter().enumerate() {
            match self.process_file(category, &path) {
                Ok((mut reconciliation, stats)) => {
                    report.reconciliation.append(&mut reconciliation);
                    report.stats.add(&stats);
                    report.files_processed += 1;
                    info!("{}/{} files processed.", index + 1, total);
                }
                Err(e) => {
                    let failure = EtlError::FileFailed {
                        path: path.clone(),
                        source: Box::new(e),
                    };
                    match self.policy {
                        FailurePolicy::Abort => {
                            error!("{}", failure);
                            return Err(failure);
                        }
                        FailurePolicy::Skip => {
                            warn!("Skipping file: {}", failure);
                            report.failed_files.push(FailedFile {
                                path,
                                error: failure,
                            });
                        }
                    }
                }
            }
        }

        if !report.failed_files.is_empty() {
            warn!(
                "{} of {} {} files were skipped",
                report.failed_files.len(),
                total,
                category
            );
        }
        Ok(report)
    }

    // Reconciliation entries are only handed back once the transaction has
    // committed, so a rolled back file contributes none.
    fn process_file(
        &mut self,
        category: FileCategory,
        path: &Path,
    ) -> Result<(ReconciliationLog, LogFileStats), EtlError> {
        let mut reconciliation = ReconciliationLog::new();
        let stats = self.store.in_transaction(|tx| match category {
            FileCategory::Song => transform_song_file(tx, path).map(|_| LogFileStats::default()),
            FileCategory::Log => transform_log_file(tx, path, &mut reconciliation),
        })?;
        Ok((reconciliation, stats))
    }
}
