//! Per-file transforms.
//!
//! Each transform reads one input file and writes its rows through a
//! `WarehouseWriter`. The caller owns the transaction boundary.

use super::records::{parse_lines, LogEventRecord, SongFileRecord, SongPlay};
use super::report::ReconciliationLog;
use super::timestamp::decompose;
use crate::error::EtlError;
use crate::warehouse::{DimensionWriter, PlaybackEvent, ReconciliationEntry, WarehouseWriter};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, warn};

/// Counters of a single log file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogFileStats {
    /// Non-blank lines in the file.
    pub events_read: usize,
    /// Events with page "NextSong"; each produced one songplay row.
    pub songplays_written: usize,
    /// Songplays written with null song/artist keys.
    pub lookups_missed: usize,
}

impl LogFileStats {
    pub fn add(&mut self, other: &LogFileStats) {
        self.events_read += other.events_read;
        self.songplays_written += other.songplays_written;
        self.lookups_missed += other.lookups_missed;
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<(usize, T)>, EtlError> {
    let content = std::fs::read_to_string(path).map_err(|source| EtlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_lines(&content).map_err(|(line, source)| EtlError::validation(line, source))
}

/// Loads the song and artist rows of one song-metadata file.
///
/// Song files are expected to hold exactly one record. When a file holds
/// more, only the first one is loaded and the rest are reported as ignored.
pub fn transform_song_file<W: DimensionWriter>(writer: &W, path: &Path) -> Result<(), EtlError> {
    let mut records = read_records::<SongFileRecord>(path)?.into_iter();
    let (line, record) = records
        .next()
        .ok_or(EtlError::EmptyFile)?;

    let ignored = records.count();
    if ignored > 0 {
        warn!(
            "{:?} holds {} extra song records, only the first one is loaded",
            path, ignored
        );
    }

    let (song, artist) = record
        .into_rows()
        .map_err(|source| EtlError::validation(line, source))?;
    writer.upsert_song(&song)?;
    writer.upsert_artist(&artist)?;
    Ok(())
}

/// Loads one activity-log file.
///
/// Only "NextSong" events are loaded. In file order, every event first
/// yields a time row, then a user row, then a songplay row. Lookup misses are
/// pushed to `reconciliation`.
pub fn transform_log_file<W: WarehouseWriter>(
    writer: &W,
    path: &Path,
    reconciliation: &mut ReconciliationLog,
) -> Result<LogFileStats, EtlError> {
    let records = read_records::<LogEventRecord>(path)?;
    let mut stats = LogFileStats {
        events_read: records.len(),
        ..Default::default()
    };

    let plays = records
        .into_iter()
        .filter(|(_, record)| record.is_song_play())
        .map(|(line, record)| {
            record
                .into_song_play()
                .map_err(|source| EtlError::validation(line, source))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for play in &plays {
        writer.upsert_time(&decompose(play.ts))?;
    }

    for play in &plays {
        writer.upsert_user(&play.user)?;
    }

    for play in &plays {
        let missed_before = reconciliation.len();
        write_playback_event(writer, play, reconciliation)?;
        stats.songplays_written += 1;
        stats.lookups_missed += reconciliation.len() - missed_before;
    }

    debug!(
        "{:?}: {} events, {} songplays, {} lookup misses",
        path, stats.events_read, stats.songplays_written, stats.lookups_missed
    );
    Ok(stats)
}

/// Resolves the song/artist keys of `play` and appends its songplay row.
///
/// A lookup miss is not an error: the row is written with null keys and the
/// (song, artist, length) triple goes to `reconciliation`.
pub fn write_playback_event<W: WarehouseWriter>(
    writer: &W,
    play: &SongPlay,
    reconciliation: &mut ReconciliationLog,
) -> Result<i64, EtlError> {
    let song_artist = writer.resolve(&play.song, &play.artist, play.length)?;
    if song_artist.is_none() {
        reconciliation.record(ReconciliationEntry {
            song: play.song.clone(),
            artist: play.artist.clone(),
            length: play.length,
        });
    }

    let event = PlaybackEvent {
        start_time: decompose(play.ts).start_time,
        user_id: play.user.user_id,
        level: play.user.level,
        song_artist,
        session_id: play.session_id,
        location: play.location.clone(),
        user_agent: play.user_agent.clone(),
    };
    Ok(writer.insert_songplay(&event)?)
}
