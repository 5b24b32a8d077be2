//! Reconciliation report.
//!
//! Playbacks whose song/artist lookup missed are accumulated here during a
//! log batch and written out as CSV for later backfill.

use crate::error::EtlError;
use crate::warehouse::ReconciliationEntry;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const REPORT_HEADER: [&str; 3] = ["song", "artist", "length"];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconciliationLog {
    entries: Vec<ReconciliationEntry>,
}

impl ReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ReconciliationEntry) {
        self.entries.push(entry);
    }

    /// Moves all entries of `other` to the end of this log.
    pub fn append(&mut self, other: &mut ReconciliationLog) {
        self.entries.append(&mut other.entries);
    }

    pub fn entries(&self) -> &[ReconciliationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the header and one row per entry. An empty log still yields the
    /// header line.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(REPORT_HEADER)?;
        for entry in &self.entries {
            csv_writer.serialize(entry)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the report to `path`, replacing any previous report.
    pub fn write_to_path(&self, path: &Path) -> Result<(), EtlError> {
        let to_report_error = |source: csv::Error| EtlError::Report {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(|e| to_report_error(e.into()))?;
        self.write_csv(file).map_err(to_report_error)
    }
}
