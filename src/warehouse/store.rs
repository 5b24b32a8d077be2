//! SQLite-backed warehouse store.
//!
//! The store owns a single connection. All writes go through a
//! `WarehouseTransaction`, one per input file: the transaction commits when
//! the file's transform succeeds and rolls back when it is dropped after a
//! failure.

use super::models::*;
use super::schema::WAREHOUSE_VERSIONED_SCHEMAS;
use super::{DimensionWriter, FactWriter, SongResolver};
use crate::error::EtlError;
use crate::sqlite_persistence::VersionedSchema;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub struct SqliteWarehouseStore {
    conn: Connection,
}

fn latest_schema() -> &'static VersionedSchema {
    &WAREHOUSE_VERSIONED_SCHEMAS[WAREHOUSE_VERSIONED_SCHEMAS.len() - 1]
}

/// Creates missing tables and checks the existing ones match the schema.
fn prepare_schema(conn: &Connection) -> Result<()> {
    let schema = latest_schema();
    schema
        .create(conn)
        .context("Failed to create warehouse tables")?;
    schema
        .validate(conn)
        .with_context(|| format!("Warehouse schema validation failed for version {}", schema.version))
}

impl SqliteWarehouseStore {
    /// Opens (or creates) the warehouse database at `db_path`.
    ///
    /// `busy_timeout` bounds how long a statement waits on a locked database
    /// before failing.
    pub fn open<P: AsRef<Path>>(db_path: P, busy_timeout: Duration) -> Result<Self, EtlError> {
        let path = db_path.as_ref();
        let conn = Connection::open(path).map_err(|source| EtlError::Connection {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(busy_timeout)
            .map_err(|source| EtlError::Connection {
                path: path.to_path_buf(),
                source,
            })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL journal")?;

        prepare_schema(&conn)?;
        info!("Opened warehouse database at {:?}", path);

        Ok(Self { conn })
    }

    /// Creates an in-memory warehouse (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, EtlError> {
        let conn = Connection::open_in_memory().map_err(|source| EtlError::Connection {
            path: ":memory:".into(),
            source,
        })?;
        prepare_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Drops all warehouse tables and recreates them empty.
    pub fn reset_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        let schema = latest_schema();
        schema.drop_all(&tx)?;
        schema.create(&tx)?;
        tx.commit()?;
        info!("Warehouse schema reset to version {}", schema.version);
        Ok(())
    }

    /// Runs `f` inside a transaction, committing only if it succeeds.
    pub fn in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&WarehouseTransaction<'_>) -> Result<T, E>,
        E: From<anyhow::Error>,
    {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin transaction")?;
        let writer = WarehouseTransaction { tx };
        let value = f(&writer)?;
        writer
            .tx
            .commit()
            .context("Failed to commit transaction")?;
        Ok(value)
    }

    /// Closes the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> Result<(), EtlError> {
        self.conn
            .close()
            .map_err(|(_, e)| EtlError::Store(anyhow::Error::new(e).context("Failed to close warehouse")))
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    pub fn get_counts(&self) -> Result<WarehouseCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(WarehouseCounts {
            songs: count("songs")?,
            artists: count("artists")?,
            users: count("users")?,
            time: count("time")?,
            songplays: count("songplays")?,
        })
    }

    pub fn get_song(&self, song_id: &str) -> Result<Option<SongRecord>> {
        let song = self
            .conn
            .query_row(
                "SELECT song_id, title, artist_id, year, duration FROM songs WHERE song_id = ?1",
                params![song_id],
                |row| {
                    Ok(SongRecord {
                        song_id: row.get(0)?,
                        title: row.get(1)?,
                        artist_id: row.get(2)?,
                        year: row.get(3)?,
                        duration: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(song)
    }

    pub fn get_artist(&self, artist_id: &str) -> Result<Option<ArtistRecord>> {
        let artist = self
            .conn
            .query_row(
                "SELECT artist_id, name, location, latitude, longitude FROM artists WHERE artist_id = ?1",
                params![artist_id],
                |row| {
                    Ok(ArtistRecord {
                        artist_id: row.get(0)?,
                        name: row.get(1)?,
                        location: row.get(2)?,
                        latitude: row.get(3)?,
                        longitude: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(artist)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, first_name, last_name, gender, level FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((user_id, first_name, last_name, gender, level)) => {
                let level = SubscriptionLevel::parse(&level)
                    .with_context(|| format!("Unknown level '{}' for user {}", level, user_id))?;
                Ok(Some(UserRecord {
                    user_id,
                    first_name,
                    last_name,
                    gender,
                    level,
                }))
            }
            None => Ok(None),
        }
    }

    pub fn get_time(&self, start_time: &str) -> Result<Option<TimeRecord>> {
        let time = self
            .conn
            .query_row(
                "SELECT start_time, hour, day, week, month, year, weekday FROM time WHERE start_time = ?1",
                params![start_time],
                |row| {
                    Ok(TimeRecord {
                        start_time: row.get(0)?,
                        hour: row.get(1)?,
                        day: row.get(2)?,
                        week: row.get(3)?,
                        month: row.get(4)?,
                        year: row.get(5)?,
                        weekday: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(time)
    }

    /// All songplay rows in insertion order.
    pub fn get_songplays(&self) -> Result<Vec<StoredPlayback>> {
        let mut stmt = self.conn.prepare(
            "SELECT songplay_id, start_time, user_id, level, song_id, artist_id,
                    session_id, location, user_agent
             FROM songplays ORDER BY songplay_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(songplay_id, start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)|
                 -> Result<StoredPlayback> {
                    let level = SubscriptionLevel::parse(&level).with_context(|| {
                        format!("Unknown level '{}' in songplay {}", level, songplay_id)
                    })?;
                    let song_artist = match (song_id, artist_id) {
                        (Some(song_id), Some(artist_id)) => Some(SongArtistKeys { song_id, artist_id }),
                        _ => None,
                    };
                    Ok(StoredPlayback {
                        songplay_id,
                        event: PlaybackEvent {
                            start_time,
                            user_id,
                            level,
                            song_artist,
                            session_id,
                            location,
                            user_agent,
                        },
                    })
                },
            )
            .collect()
    }
}

/// Write access to the warehouse scoped to one transaction.
pub struct WarehouseTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl DimensionWriter for WarehouseTransaction<'_> {
    fn upsert_song(&self, song: &SongRecord) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO songs (song_id, title, artist_id, year, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(song_id) DO NOTHING",
        )?;
        stmt.execute(params![
            song.song_id,
            song.title,
            song.artist_id,
            song.year,
            song.duration
        ])?;
        Ok(())
    }

    fn upsert_artist(&self, artist: &ArtistRecord) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO artists (artist_id, name, location, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(artist_id) DO NOTHING",
        )?;
        stmt.execute(params![
            artist.artist_id,
            artist.name,
            artist.location,
            artist.latitude,
            artist.longitude
        ])?;
        Ok(())
    }

    fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO users (user_id, first_name, last_name, gender, level)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET level = excluded.level",
        )?;
        stmt.execute(params![
            user.user_id,
            user.first_name,
            user.last_name,
            user.gender,
            user.level.as_db_str()
        ])?;
        Ok(())
    }

    fn upsert_time(&self, time: &TimeRecord) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(start_time) DO NOTHING",
        )?;
        stmt.execute(params![
            time.start_time,
            time.hour,
            time.day,
            time.week,
            time.month,
            time.year,
            time.weekday
        ])?;
        Ok(())
    }
}

impl SongResolver for WarehouseTransaction<'_> {
    fn resolve(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongArtistKeys>> {
        // Duration is compared with exact float equality.
        let mut stmt = self.tx.prepare_cached(
            "SELECT songs.song_id, songs.artist_id
             FROM songs JOIN artists ON songs.artist_id = artists.artist_id
             WHERE songs.title = ?1 AND artists.name = ?2 AND songs.duration = ?3
             LIMIT 1",
        )?;
        let keys = stmt
            .query_row(params![title, artist_name, duration], |row| {
                Ok(SongArtistKeys {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })
            .optional()?;
        if keys.is_none() {
            debug!(
                "No song matches title={:?} artist={:?} duration={}",
                title, artist_name, duration
            );
        }
        Ok(keys)
    }
}

impl FactWriter for WarehouseTransaction<'_> {
    fn insert_songplay(&self, event: &PlaybackEvent) -> Result<i64> {
        let (song_id, artist_id) = match &event.song_artist {
            Some(keys) => (Some(keys.song_id.as_str()), Some(keys.artist_id.as_str())),
            None => (None, None),
        };
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id,
                                    session_id, location, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(params![
            event.start_time,
            event.user_id,
            event.level.as_db_str(),
            song_id,
            artist_id,
            event.session_id,
            event.location,
            event.user_agent
        ])?;
        Ok(self.tx.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_song() -> SongRecord {
        SongRecord {
            song_id: "SOZCTXZ12AB0182364".to_string(),
            title: "Setanta matins".to_string(),
            artist_id: "AR5KOSW1187FB35FF4".to_string(),
            year: 0,
            duration: 269.58322,
        }
    }

    fn make_artist() -> ArtistRecord {
        ArtistRecord {
            artist_id: "AR5KOSW1187FB35FF4".to_string(),
            name: "Elena".to_string(),
            location: Some("Dubai UAE".to_string()),
            latitude: Some(49.80388),
            longitude: Some(15.47491),
        }
    }

    fn make_user(level: SubscriptionLevel) -> UserRecord {
        UserRecord {
            user_id: 15,
            first_name: "Lily".to_string(),
            last_name: "Koch".to_string(),
            gender: "F".to_string(),
            level,
        }
    }

    fn make_time(start_time: &str) -> TimeRecord {
        TimeRecord {
            start_time: start_time.to_string(),
            hour: 2,
            day: 12,
            week: 46,
            month: 11,
            year: 2018,
            weekday: 0,
        }
    }

    fn make_event(song_artist: Option<SongArtistKeys>) -> PlaybackEvent {
        PlaybackEvent {
            start_time: "2018-11-12 02:46:36".to_string(),
            user_id: 15,
            level: SubscriptionLevel::Paid,
            song_artist,
            session_id: 818,
            location: Some("Chicago-Naperville-Elgin, IL-IN-WI".to_string()),
            user_agent: None,
        }
    }

    fn seed_song_and_artist(store: &mut SqliteWarehouseStore) {
        store
            .in_transaction(|tx| -> Result<()> {
                tx.upsert_song(&make_song())?;
                tx.upsert_artist(&make_artist())
            })
            .unwrap();
    }

    #[test]
    fn test_song_and_artist_upserts_are_first_writer_wins() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();
        seed_song_and_artist(&mut store);

        let mut changed_song = make_song();
        changed_song.title = "Something else".to_string();
        let mut changed_artist = make_artist();
        changed_artist.name = "Not Elena".to_string();
        store
            .in_transaction(|tx| -> Result<()> {
                tx.upsert_song(&changed_song)?;
                tx.upsert_artist(&changed_artist)
            })
            .unwrap();

        let counts = store.get_counts().unwrap();
        assert_eq!(counts.songs, 1);
        assert_eq!(counts.artists, 1);
        assert_eq!(
            store.get_song("SOZCTXZ12AB0182364").unwrap(),
            Some(make_song())
        );
        assert_eq!(
            store.get_artist("AR5KOSW1187FB35FF4").unwrap(),
            Some(make_artist())
        );
    }

    #[test]
    fn test_artist_with_null_coordinates() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();
        let artist = ArtistRecord {
            artist_id: "ARD7TVE1187B99BFB1".to_string(),
            name: "Casual".to_string(),
            location: Some(String::new()),
            latitude: None,
            longitude: None,
        };
        store
            .in_transaction(|tx| tx.upsert_artist(&artist))
            .unwrap();

        assert_eq!(store.get_artist("ARD7TVE1187B99BFB1").unwrap(), Some(artist));
    }

    #[test]
    fn test_user_upsert_overwrites_only_level() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();
        store
            .in_transaction(|tx| tx.upsert_user(&make_user(SubscriptionLevel::Free)))
            .unwrap();

        let mut renamed = make_user(SubscriptionLevel::Paid);
        renamed.first_name = "Lilian".to_string();
        renamed.gender = "M".to_string();
        store
            .in_transaction(|tx| tx.upsert_user(&renamed))
            .unwrap();

        let stored = store.get_user(15).unwrap().unwrap();
        assert_eq!(stored.level, SubscriptionLevel::Paid);
        assert_eq!(stored.first_name, "Lily");
        assert_eq!(stored.gender, "F");
        assert_eq!(store.get_counts().unwrap().users, 1);
    }

    #[test]
    fn test_time_upsert_dedups_by_start_time() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();
        store
            .in_transaction(|tx| -> Result<()> {
                tx.upsert_time(&make_time("2018-11-12 02:46:36"))?;
                tx.upsert_time(&make_time("2018-11-12 02:46:36"))?;
                tx.upsert_time(&make_time("2018-11-12 02:46:37"))
            })
            .unwrap();

        assert_eq!(store.get_counts().unwrap().time, 2);
        assert_eq!(
            store.get_time("2018-11-12 02:46:36").unwrap(),
            Some(make_time("2018-11-12 02:46:36"))
        );
    }

    #[test]
    fn test_resolve_requires_all_three_fields() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();
        seed_song_and_artist(&mut store);

        store
            .in_transaction(|tx| -> Result<()> {
                let keys = tx.resolve("Setanta matins", "Elena", 269.58322)?;
                assert_eq!(
                    keys,
                    Some(SongArtistKeys {
                        song_id: "SOZCTXZ12AB0182364".to_string(),
                        artist_id: "AR5KOSW1187FB35FF4".to_string(),
                    })
                );
                assert_eq!(tx.resolve("Setanta matins", "Someone", 269.58322)?, None);
                assert_eq!(tx.resolve("Other title", "Elena", 269.58322)?, None);
                // No tolerance on duration
                assert_eq!(tx.resolve("Setanta matins", "Elena", 269.583)?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_insert_songplay_with_and_without_keys() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();
        let keys = SongArtistKeys {
            song_id: "SOZCTXZ12AB0182364".to_string(),
            artist_id: "AR5KOSW1187FB35FF4".to_string(),
        };

        let (first_id, second_id) = store
            .in_transaction(|tx| -> Result<(i64, i64)> {
                Ok((
                    tx.insert_songplay(&make_event(Some(keys.clone())))?,
                    tx.insert_songplay(&make_event(None))?,
                ))
            })
            .unwrap();
        assert!(second_id > first_id);

        let plays = store.get_songplays().unwrap();
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0].event, make_event(Some(keys)));
        assert_eq!(plays[1].event, make_event(None));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut store = SqliteWarehouseStore::open_in_memory().unwrap();

        let result: Result<()> = store.in_transaction(|tx| {
            tx.upsert_song(&make_song())?;
            Err(anyhow::anyhow!("transform failed"))
        });
        assert!(result.is_err());

        assert_eq!(store.get_counts().unwrap(), WarehouseCounts::default());
    }

    #[test]
    fn test_reopen_keeps_data_and_reset_clears_it() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("warehouse.db");

        let mut store = SqliteWarehouseStore::open(&db_path, Duration::from_secs(1)).unwrap();
        seed_song_and_artist(&mut store);
        store.close().unwrap();

        let mut store = SqliteWarehouseStore::open(&db_path, Duration::from_secs(1)).unwrap();
        assert_eq!(store.get_counts().unwrap().songs, 1);

        store.reset_schema().unwrap();
        assert_eq!(store.get_counts().unwrap(), WarehouseCounts::default());
        store.close().unwrap();
    }

    #[test]
    fn test_open_rejects_mismatched_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("warehouse.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute("CREATE TABLE songs (song_id TEXT PRIMARY KEY)", [])
                .unwrap();
        }

        let result = SqliteWarehouseStore::open(&db_path, Duration::from_secs(1));
        assert!(matches!(result, Err(EtlError::Store(_))));
    }

    #[test]
    fn test_open_reports_connection_error() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("missing_dir").join("warehouse.db");

        let result = SqliteWarehouseStore::open(&db_path, Duration::from_secs(1));
        assert!(matches!(result, Err(EtlError::Connection { .. })));
    }
}
