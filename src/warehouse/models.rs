//! Row types of the analytics warehouse.
//!
//! Dimension rows (songs, artists, users, time) are looked up by the
//! `songplays` fact rows. All types here are already validated; raw input
//! records are projected into them by the `etl::records` module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of the `songs` dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    /// Track length in seconds.
    pub duration: f64,
}

/// A row of the `artists` dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Subscription tier of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionLevel {
    Free,
    Paid,
}

impl SubscriptionLevel {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SubscriptionLevel::Free => "free",
            SubscriptionLevel::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionLevel::Free),
            "paid" => Some(SubscriptionLevel::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A row of the `users` dimension.
///
/// Identity fields are fixed by the first write; `level` follows the most
/// recent write.
#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: SubscriptionLevel,
}

/// A row of the `time` dimension, keyed by the second-granularity
/// `start_time` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeRecord {
    pub start_time: String,
    pub hour: u32,
    pub day: u32,
    /// ISO-8601 week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// Monday = 0 .. Sunday = 6.
    pub weekday: u32,
}

/// The song/artist key pair a playback event resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongArtistKeys {
    pub song_id: String,
    pub artist_id: String,
}

/// A row of the `songplays` fact table.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackEvent {
    pub start_time: String,
    pub user_id: i64,
    pub level: SubscriptionLevel,
    /// `None` when the (title, artist, duration) lookup missed.
    pub song_artist: Option<SongArtistKeys>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// A stored `songplays` row, as read back from the warehouse.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredPlayback {
    pub songplay_id: i64,
    pub event: PlaybackEvent,
}

/// A playback whose song/artist lookup failed at load time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReconciliationEntry {
    pub song: String,
    pub artist: String,
    pub length: f64,
}

/// Row counts of every warehouse table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WarehouseCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}
