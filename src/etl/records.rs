//! Raw input records and their projection into warehouse rows.
//!
//! Both input families are newline-delimited JSON. Every field is optional at
//! parse time so that a missing field is reported as a `ValidationError`
//! naming it, instead of a generic serde error.

use crate::warehouse::validation::{
    require, require_text, validate_artist, validate_song, validate_user, ValidationError,
    ValidationResult,
};
use crate::warehouse::{ArtistRecord, SongRecord, SubscriptionLevel, UserRecord};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Page value of the log events that represent a song being played.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// One line of a song-metadata file.
#[derive(Debug, Clone, Deserialize)]
pub struct SongFileRecord {
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i32>,
    pub duration: Option<f64>,
    pub artist_name: Option<String>,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

impl SongFileRecord {
    /// Projects the record into its song and artist rows.
    pub fn into_rows(self) -> ValidationResult<(SongRecord, ArtistRecord)> {
        let artist_id = require_text(self.artist_id, "artist_id")?;

        let song = SongRecord {
            song_id: require_text(self.song_id, "song_id")?,
            title: require_text(self.title, "title")?,
            artist_id: artist_id.clone(),
            year: require(self.year, "year")?,
            duration: require(self.duration, "duration")?,
        };
        validate_song(&song)?;

        let artist = ArtistRecord {
            artist_id,
            name: require_text(self.artist_name, "artist_name")?,
            location: self.artist_location,
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        };
        validate_artist(&artist)?;

        Ok((song, artist))
    }
}

/// `userId` shows up both as a number and as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawUserId {
    Number(i64),
    Text(String),
}

impl RawUserId {
    fn parse(self) -> ValidationResult<i64> {
        match self {
            RawUserId::Number(id) => Ok(id),
            RawUserId::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::EmptyField { field: "userId" });
                }
                trimmed.parse().map_err(|_| ValidationError::InvalidValue {
                    field: "userId",
                    value: text.clone(),
                })
            }
        }
    }
}

/// One line of a user-activity log file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventRecord {
    /// Epoch milliseconds.
    pub ts: Option<f64>,
    pub page: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub user_id: Option<RawUserId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// A validated "NextSong" event.
#[derive(Debug, Clone, PartialEq)]
pub struct SongPlay {
    pub ts: f64,
    pub song: String,
    pub artist: String,
    pub length: f64,
    pub user: UserRecord,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl LogEventRecord {
    pub fn is_song_play(&self) -> bool {
        self.page.as_deref() == Some(NEXT_SONG_PAGE)
    }

    pub fn into_song_play(self) -> ValidationResult<SongPlay> {
        let level = require_text(self.level, "level")?;
        let level = SubscriptionLevel::parse(&level).ok_or(ValidationError::InvalidValue {
            field: "level",
            value: level,
        })?;

        let user = UserRecord {
            user_id: require(self.user_id, "userId")?.parse()?,
            first_name: require_text(self.first_name, "firstName")?,
            last_name: require_text(self.last_name, "lastName")?,
            gender: require_text(self.gender, "gender")?,
            level,
        };
        validate_user(&user)?;

        Ok(SongPlay {
            ts: require(self.ts, "ts")?,
            song: require_text(self.song, "song")?,
            artist: require_text(self.artist, "artist")?,
            length: require(self.length, "length")?,
            user,
            session_id: require(self.session_id, "sessionId")?,
            location: self.location,
            user_agent: self.user_agent,
        })
    }
}

/// Parses every non-blank line of `content`, returning each record with its
/// 1-based line number.
pub fn parse_lines<T: DeserializeOwned>(
    content: &str,
) -> Result<Vec<(usize, T)>, (usize, ValidationError)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map(|record| (index + 1, record))
                .map_err(|e| (index + 1, ValidationError::from(e)))
        })
        .collect()
}
