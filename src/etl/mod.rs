mod driver;
mod pipeline;
mod records;
mod report;
mod timestamp;
mod transform;

pub use driver::{
    discover_files, BatchDriver, BatchReport, FailedFile, FailurePolicy, FileCategory,
};
pub use pipeline::{run_pipeline, PipelineSummary};
pub use records::{LogEventRecord, SongFileRecord, SongPlay, NEXT_SONG_PAGE};
pub use report::{ReconciliationLog, REPORT_HEADER};
pub use timestamp::{decompose, decompose_in, START_TIME_FORMAT};
pub use transform::{transform_log_file, transform_song_file, write_playback_event, LogFileStats};
