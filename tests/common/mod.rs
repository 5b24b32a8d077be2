//! Common test infrastructure
//!
//! Builds throwaway data directories with song and log files, and the
//! `AppConfig` that points a pipeline run at them.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{DataDirs, SETANTA_MATINS};
//!
//! let data = DataDirs::new();
//! data.add_song_file("A/A/A/TRAAAAA.json", &[SETANTA_MATINS]);
//! let summary = sparkify_etl::run_pipeline(&data.config()).unwrap();
//! ```

#![allow(dead_code)]

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{DataDirs, LogFixture};
