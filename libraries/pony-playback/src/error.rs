//! Error types for playback management

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback errors returned synchronously from commands
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Argument rejected before anything changed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Playlist is empty, nothing to play
    #[error("No current track")]
    NoCurrentTrack,

    /// Track id is not in the playlist
    #[error("Track not in playlist: {0}")]
    TrackNotFound(String),

    /// Audio focus could not be acquired
    #[error("Audio focus denied")]
    FocusDenied,

    /// Engine thread is gone
    #[error("Playback engine stopped")]
    EngineStopped,
}

/// Faults reported by the audio backend
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BackendFault {
    /// Track source missing or unreadable
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Backend cannot play the format or stream
    #[error("Decode error: {0}")]
    Decode(String),

    /// Anything else the backend reports
    #[error("{0}")]
    Other(String),
}

impl BackendFault {
    /// Faults after which the engine moves on to the next track
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            BackendFault::SourceUnavailable(_) | BackendFault::Decode(_)
        )
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
