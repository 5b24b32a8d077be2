//! Sparkify ETL Library
//!
//! Loads song metadata and user activity logs into a SQLite star schema.
//! The library is used by the `sparkify-etl` binary and by the integration
//! tests.

pub mod config;
pub mod error;
pub mod etl;
pub mod sqlite_persistence;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use error::EtlError;
pub use etl::{run_pipeline, FailurePolicy, FileCategory, PipelineSummary};
pub use warehouse::{SqliteWarehouseStore, WarehouseCounts};
