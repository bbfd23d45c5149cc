//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Track information held by the playlist
///
/// Contains all metadata needed for playback and for the notification.
/// Treated as immutable once added to a playlist: replacing a track means
/// removing it and adding the new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: String,

    /// Where the backend reads the audio from
    pub source: MediaSource,

    /// Track duration (zero when unknown)
    pub duration: Duration,

    /// Cover art reference (path or URL)
    pub cover: Option<String>,
}

impl Track {
    /// Whether the track is streamed (buffering updates are meaningful)
    pub fn is_streamed(&self) -> bool {
        matches!(self.source, MediaSource::Remote(_))
    }

    /// Track duration in milliseconds, `None` when unknown
    pub fn duration_ms(&self) -> Option<u64> {
        let ms = self.duration.as_millis() as u64;
        (ms > 0).then_some(ms)
    }

    /// "Artist - Album" line used by notifications
    pub fn subtitle(&self) -> String {
        match (self.artist.is_empty(), self.album.is_empty()) {
            (false, false) => format!("{} - {}", self.artist, self.album),
            (false, true) => self.artist.clone(),
            (true, false) => self.album.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Playable source reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    /// File on the device
    Local(PathBuf),

    /// Streamed over the network
    Remote(String),
}

/// Playback lifecycle phase
///
/// Exactly one value holds at any time; every read is a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    /// Nothing has been played yet
    Idle,

    /// Backend is preparing the current track
    Preparing,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Stopped (explicitly, at the end of the playlist, or after a batch failure)
    Stopped,

    /// Backend reported an error for the current track
    Error,
}

impl PlayState {
    /// Preparing or Playing
    pub fn is_active(self) -> bool {
        matches!(self, PlayState::Preparing | PlayState::Playing)
    }

    pub fn is_playing(self) -> bool {
        self == PlayState::Playing
    }
}

/// Next/previous selection policy
///
/// Orthogonal to playlist order: shuffle never reorders the playlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Stop at the end of the playlist
    Sequential,

    /// Wrap around at both ends
    #[default]
    LoopAll,

    /// Repeat the current track
    LoopOne,

    /// Random order without repeats until every track has played
    Shuffle,
}

impl PlayMode {
    /// Mode selected by the next tap on a single mode-toggle button
    pub fn cycle(self) -> Self {
        match self {
            PlayMode::LoopAll => PlayMode::Shuffle,
            PlayMode::Shuffle => PlayMode::LoopOne,
            PlayMode::LoopOne => PlayMode::Sequential,
            PlayMode::Sequential => PlayMode::LoopAll,
        }
    }
}

/// Shortest accepted progress sampling interval
pub const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Longest accepted progress sampling interval
pub const MAX_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for the playback engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Progress sampling interval while playing (default: 300ms, clamped to 200-500ms)
    pub progress_interval: Duration,

    /// Initial play mode (default: LoopAll)
    pub play_mode: PlayMode,

    /// Initial (left, right) volume (default: 1.0, 1.0)
    pub volume: (f32, f32),

    /// Capacity of the engine inbox shared by commands and backend callbacks
    pub queue_capacity: usize,
}

impl PlaybackConfig {
    /// Sampling interval clamped into the accepted range
    pub fn effective_progress_interval(&self) -> Duration {
        self.progress_interval
            .clamp(MIN_PROGRESS_INTERVAL, MAX_PROGRESS_INTERVAL)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(300),
            play_mode: PlayMode::default(),
            volume: (1.0, 1.0),
            queue_capacity: 64,
        }
    }
}
