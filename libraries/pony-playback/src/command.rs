//! Messages accepted by the engine's inbox
//!
//! Commands from the host, reports from the backend and the focus provider
//! all travel through one queue, so the engine applies them strictly in
//! arrival order.

use crossbeam_channel::Sender;

use crate::backend::{BackendEvent, Generation};
use crate::error::Result;
use crate::types::{PlayMode, Track};

/// Host commands
#[derive(Debug, Clone)]
pub enum Command {
    AddAndPlay(Track),
    ReplaceAll { tracks: Vec<Track>, track: Track },
    Play(Option<Track>),
    Delete(Track),
    ClearPlaylist,
    PlayPause,
    StartPlayer,
    PausePlayer { abandon_focus: bool },
    StopPlayer,
    Next,
    Prev,
    SeekTo(i64),
    SetVolume { left: f32, right: f32 },
    SetPlayMode(PlayMode),
}

/// Read-only queries answered on the engine's thread
#[derive(Debug)]
pub enum Query {
    AudioPosition(Sender<u64>),
    AudioSessionId(Sender<i32>),
}

#[derive(Debug)]
pub(crate) enum EngineMessage {
    Backend {
        generation: Generation,
        event: BackendEvent,
    },
    FocusLost,
    Command {
        command: Command,
        reply: Option<Sender<Result<()>>>,
    },
    Query(Query),
    Shutdown,
}

/// Whether the engine's owner should keep going after a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Shutdown,
}
