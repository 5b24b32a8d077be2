//! Shared constants for end-to-end tests

use super::fixtures::SongFixture;

/// 2018-11-12T02:46:36.796Z
pub const TS_1: i64 = 1541990796796;

/// Same second as `TS_1`.
pub const TS_1_SAME_SECOND: i64 = 1541990796999;

/// 2018-11-12T02:51:04Z
pub const TS_2: i64 = 1541991064000;

pub const USER_LILY: i64 = 15;
pub const USER_KATE: i64 = 80;

pub const SETANTA_MATINS: SongFixture = SongFixture {
    song_id: "SOZCTXZ12AB0182364",
    title: "Setanta matins",
    artist_id: "AR5KOSW1187FB35FF4",
    artist_name: "Elena",
    year: 0,
    duration: 269.58322,
    location: Some("Dubai UAE"),
    latitude: Some(49.80388),
    longitude: Some(15.47491),
};

pub const I_DIDNT_MEAN_TO: SongFixture = SongFixture {
    song_id: "SOMZWCG12A8C13C480",
    title: "I Didn't Mean To",
    artist_id: "ARD7TVE1187B99BFB1",
    artist_name: "Casual",
    year: 0,
    duration: 218.93179,
    location: Some("California - LA"),
    latitude: None,
    longitude: None,
};
