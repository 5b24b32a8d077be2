use anyhow::{Context, Result};
use clap::Parser;
use sparkify_etl::config::{
    DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DB_PATH, DEFAULT_FILE_EXTENSION, DEFAULT_LOG_DATA_DIR,
    DEFAULT_REPORT_PATH, DEFAULT_SONG_DATA_DIR,
};
use sparkify_etl::{run_pipeline, AppConfig, CliConfig, FailurePolicy, FileConfig};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl")]
#[command(about = "Load Sparkify song metadata and activity logs into a SQLite star schema")]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override command line values.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite warehouse database file. Created if missing.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Directory holding the song-metadata files.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_SONG_DATA_DIR)]
    pub song_data_dir: PathBuf,

    /// Directory holding the activity-log files.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_LOG_DATA_DIR)]
    pub log_data_dir: PathBuf,

    /// Where to write the CSV of playbacks without a matching song.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_REPORT_PATH)]
    pub report_path: PathBuf,

    /// Extension of the input files.
    #[clap(long, default_value = DEFAULT_FILE_EXTENSION)]
    pub file_extension: String,

    /// What to do when a file fails to load.
    #[clap(long, value_enum, ignore_case = true, default_value = "abort")]
    pub on_file_error: FailurePolicy,

    /// Drop and recreate all warehouse tables before loading.
    #[clap(long, default_value_t = false)]
    pub reset_schema: bool,

    /// How long a statement waits on a locked database, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            song_data_dir: self.song_data_dir.clone(),
            log_data_dir: self.log_data_dir.clone(),
            report_path: self.report_path.clone(),
            file_extension: self.file_extension.clone(),
            on_file_error: self.on_file_error,
            reset_schema: self.reset_schema,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Warehouse database: {}", config.db_path.display());
    info!("Song data: {}", config.song_data_dir.display());
    info!("Log data: {}", config.log_data_dir.display());

    let summary = run_pipeline(&config)?;
    info!(
        "Loaded {} song files and {} log files",
        summary.songs.files_processed, summary.logs.files_processed
    );
    Ok(())
}
