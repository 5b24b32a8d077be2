//! Fixture data directories

use serde_json::json;
use sparkify_etl::{AppConfig, CliConfig, FailurePolicy, FileConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
pub struct SongFixture {
    pub song_id: &'static str,
    pub title: &'static str,
    pub artist_id: &'static str,
    pub artist_name: &'static str,
    pub year: i32,
    pub duration: f64,
    pub location: Option<&'static str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl SongFixture {
    pub fn to_json_line(&self) -> String {
        json!({
            "num_songs": 1,
            "artist_id": self.artist_id,
            "artist_latitude": self.latitude,
            "artist_longitude": self.longitude,
            "artist_location": self.location,
            "artist_name": self.artist_name,
            "song_id": self.song_id,
            "title": self.title,
            "duration": self.duration,
            "year": self.year,
        })
        .to_string()
    }
}

/// One activity-log event. `page` defaults to "NextSong".
#[derive(Debug, Clone)]
pub struct LogFixture {
    pub page: &'static str,
    pub ts: i64,
    pub user_id: i64,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub level: &'static str,
    pub song: &'static str,
    pub artist: &'static str,
    pub length: f64,
}

impl LogFixture {
    /// A "NextSong" event playing `song` by user `user_id`.
    pub fn play(ts: i64, user_id: i64, level: &'static str, song: &SongFixture) -> Self {
        Self {
            page: "NextSong",
            ts,
            user_id,
            first_name: "Lily",
            last_name: "Koch",
            level,
            song: song.title,
            artist: song.artist_name,
            length: song.duration,
        }
    }

    pub fn with_page(mut self, page: &'static str) -> Self {
        self.page = page;
        self
    }

    pub fn with_names(mut self, first_name: &'static str, last_name: &'static str) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn to_json_line(&self) -> String {
        json!({
            "artist": self.artist,
            "auth": "Logged In",
            "firstName": self.first_name,
            "gender": "F",
            "itemInSession": 0,
            "lastName": self.last_name,
            "length": self.length,
            "level": self.level,
            "location": "Chicago-Naperville-Elgin, IL-IN-WI",
            "method": "PUT",
            "page": self.page,
            "registration": 1541048010796.0,
            "sessionId": 818,
            "song": self.song,
            "status": 200,
            "ts": self.ts,
            "userAgent": "Mozilla/5.0 (Windows NT 6.1; WOW64)",
            "userId": self.user_id.to_string(),
        })
        .to_string()
    }
}

/// A temporary directory with `song_data/`, `log_data/` and room for the
/// database and the report.
pub struct DataDirs {
    pub dir: TempDir,
}

impl DataDirs {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("song_data")).unwrap();
        fs::create_dir(dir.path().join("log_data")).unwrap();
        Self { dir }
    }

    pub fn song_dir(&self) -> PathBuf {
        self.dir.path().join("song_data")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("log_data")
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("sparkify.db")
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.path().join("check_list.csv")
    }

    pub fn add_song_file(&self, relative: &str, songs: &[SongFixture]) -> PathBuf {
        let lines: Vec<String> = songs.iter().map(SongFixture::to_json_line).collect();
        self.write_lines(&self.song_dir(), relative, &lines)
    }

    pub fn add_log_file(&self, relative: &str, events: &[LogFixture]) -> PathBuf {
        let lines: Vec<String> = events.iter().map(LogFixture::to_json_line).collect();
        self.write_lines(&self.log_dir(), relative, &lines)
    }

    pub fn add_raw_log_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.log_dir().join(relative);
        write_file(&path, content);
        path
    }

    pub fn config(&self) -> AppConfig {
        self.config_with(FileConfig::default())
    }

    pub fn config_with_policy(&self, policy: FailurePolicy) -> AppConfig {
        self.config_with(FileConfig {
            on_file_error: Some(policy),
            ..Default::default()
        })
    }

    pub fn config_with(&self, file_config: FileConfig) -> AppConfig {
        let cli = CliConfig {
            db_path: self.db_path(),
            song_data_dir: self.song_dir(),
            log_data_dir: self.log_dir(),
            report_path: self.report_path(),
            ..Default::default()
        };
        AppConfig::resolve(&cli, Some(file_config)).unwrap()
    }

    pub fn read_report(&self) -> String {
        fs::read_to_string(self.report_path()).unwrap()
    }

    fn write_lines(&self, root: &Path, relative: &str, lines: &[String]) -> PathBuf {
        let path = root.join(relative);
        let mut content = lines.join("\n");
        content.push('\n');
        write_file(&path, &content);
        path
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
