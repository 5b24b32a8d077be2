//! End-to-end run: song batch, log batch, reconciliation report.

use super::driver::{BatchDriver, BatchReport, FileCategory};
use crate::config::AppConfig;
use crate::error::EtlError;
use crate::warehouse::{SqliteWarehouseStore, WarehouseCounts};
use tracing::{info, warn};

/// What a completed run did.
#[derive(Debug)]
pub struct PipelineSummary {
    pub songs: BatchReport,
    pub logs: BatchReport,
    pub counts: WarehouseCounts,
}

impl PipelineSummary {
    pub fn failed_files(&self) -> usize {
        self.songs.failed_files.len() + self.logs.failed_files.len()
    }
}

/// Runs the whole load against the database named in `config`.
///
/// The song batch runs first so that the log batch can resolve song and
/// artist keys. The reconciliation report is written after the log batch,
/// even when it has no entries. On error the store is dropped, which closes
/// the connection.
pub fn run_pipeline(config: &AppConfig) -> Result<PipelineSummary, EtlError> {
    let mut store = SqliteWarehouseStore::open(&config.db_path, config.busy_timeout)?;
    if config.reset_schema {
        warn!("Resetting warehouse schema, all loaded rows are dropped");
        store.reset_schema()?;
    }

    let (songs, logs) = {
        let mut driver =
            BatchDriver::new(&mut store, &config.file_extension, config.on_file_error);
        let songs = driver.run(FileCategory::Song, &config.song_data_dir)?;
        let logs = driver.run(FileCategory::Log, &config.log_data_dir)?;
        (songs, logs)
    };

    logs.reconciliation.write_to_path(&config.report_path)?;
    info!(
        "{} logs do not have matched songs and artists",
        logs.reconciliation.len()
    );
    info!(
        "Reconciliation report written to {}",
        config.report_path.display()
    );

    let counts = store.get_counts()?;
    info!("Warehouse contains:");
    info!("  {} songs", counts.songs);
    info!("  {} artists", counts.artists);
    info!("  {} users", counts.users);
    info!("  {} time rows", counts.time);
    info!("  {} songplays", counts.songplays);

    store.close()?;

    let summary = PipelineSummary {
        songs,
        logs,
        counts,
    };
    if summary.failed_files() > 0 {
        warn!("{} files were skipped", summary.failed_files());
    }
    Ok(summary)
}
