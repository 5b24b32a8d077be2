mod file_config;

pub use file_config::FileConfig;

use crate::etl::FailurePolicy;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "sparkify.db";
pub const DEFAULT_SONG_DATA_DIR: &str = "data/song_data";
pub const DEFAULT_LOG_DATA_DIR: &str = "data/log_data";
pub const DEFAULT_REPORT_PATH: &str = "check_list.csv";
pub const DEFAULT_FILE_EXTENSION: &str = "json";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// CLI arguments that can be used for config resolution.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
    pub report_path: PathBuf,
    pub file_extension: String,
    pub on_file_error: FailurePolicy,
    pub reset_schema: bool,
    pub busy_timeout_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            song_data_dir: PathBuf::from(DEFAULT_SONG_DATA_DIR),
            log_data_dir: PathBuf::from(DEFAULT_LOG_DATA_DIR),
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            on_file_error: FailurePolicy::default(),
            reset_schema: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
    pub report_path: PathBuf,
    /// Extension of the input files, without the dot.
    pub file_extension: String,
    pub on_file_error: FailurePolicy,
    pub reset_schema: bool,
    pub busy_timeout: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.db_path.clone());

        let song_data_dir = file
            .song_data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.song_data_dir.clone());
        check_input_dir(&song_data_dir, "song_data_dir")?;

        let log_data_dir = file
            .log_data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.log_data_dir.clone());
        check_input_dir(&log_data_dir, "log_data_dir")?;

        let report_path = file
            .report_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.report_path.clone());

        let file_extension = file
            .file_extension
            .unwrap_or_else(|| cli.file_extension.clone());
        let file_extension = file_extension.trim_start_matches('.').to_string();
        if file_extension.is_empty() {
            bail!("file_extension must not be empty");
        }

        let on_file_error = file.on_file_error.unwrap_or(cli.on_file_error);
        let reset_schema = file.reset_schema.unwrap_or(cli.reset_schema);
        let busy_timeout =
            Duration::from_millis(file.busy_timeout_ms.unwrap_or(cli.busy_timeout_ms));

        Ok(Self {
            db_path,
            song_data_dir,
            log_data_dir,
            report_path,
            file_extension,
            on_file_error,
            reset_schema,
            busy_timeout,
        })
    }
}

fn check_input_dir(dir: &Path, name: &str) -> Result<()> {
    if !dir.exists() {
        bail!("{} does not exist: {:?}", name, dir);
    }
    if !dir.is_dir() {
        bail!("{} is not a directory: {:?}", name, dir);
    }
    Ok(())
}
