mod models;
mod schema;
mod store;
pub mod validation;

pub use models::*;
pub use schema::WAREHOUSE_VERSIONED_SCHEMAS;
pub use store::{SqliteWarehouseStore, WarehouseTransaction};
pub use validation::ValidationError;

use anyhow::Result;

/// Idempotent writes of dimension rows.
pub trait DimensionWriter {
    /// Inserts the song unless a song with the same id exists.
    fn upsert_song(&self, song: &SongRecord) -> Result<()>;

    /// Inserts the artist unless an artist with the same id exists.
    fn upsert_artist(&self, artist: &ArtistRecord) -> Result<()>;

    /// Inserts the user, or overwrites only `level` when the id exists.
    fn upsert_user(&self, user: &UserRecord) -> Result<()>;

    /// Inserts the time row unless its `start_time` key exists.
    fn upsert_time(&self, time: &TimeRecord) -> Result<()>;
}

/// Lookup of the song/artist pair a playback refers to.
pub trait SongResolver {
    /// Exact match on title, artist name and duration. Returns `None` when no
    /// song matches all three.
    fn resolve(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongArtistKeys>>;
}

pub trait FactWriter {
    /// Appends a songplay row and returns its id.
    fn insert_songplay(&self, event: &PlaybackEvent) -> Result<i64>;
}

/// Everything a per-file transform needs from the warehouse.
pub trait WarehouseWriter: DimensionWriter + SongResolver + FactWriter {}

impl<T: DimensionWriter + SongResolver + FactWriter> WarehouseWriter for T {}
