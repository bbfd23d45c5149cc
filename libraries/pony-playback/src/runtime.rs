//! Dedicated engine thread
//!
//! One worker owns the [`PlaybackEngine`] and consumes its inbox: host
//! commands, backend reports and focus loss, in arrival order. Between
//! messages it sleeps until the next progress sample is due.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    backend::EngineCallbacks,
    command::{Command, EngineMessage, Flow, Query},
    engine::PlaybackEngine,
    error::{PlaybackError, Result},
    observable::EngineStreams,
    session::{SessionHandle, SessionToken},
    types::{PlayMode, Track},
};

/// Spawns engines onto their own thread
pub struct EngineThread;

impl EngineThread {
    /// Move `engine` onto a new worker thread
    pub fn spawn(engine: PlaybackEngine) -> EngineHandle {
        let tx = engine.inbox_sender();
        let inbox = engine.inbox();
        let streams = engine.streams();
        let session = engine.session();
        let callbacks = engine.callbacks();

        let worker = thread::spawn(move || Self::run(engine, inbox));
        info!("Engine thread spawned (session {})", session.token());

        EngineHandle {
            tx,
            streams,
            session,
            callbacks,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Worker main loop
    fn run(mut engine: PlaybackEngine, inbox: Receiver<EngineMessage>) {
        loop {
            let received = match engine.next_tick_in(Instant::now()) {
                Some(wait) => match inbox.recv_timeout(wait) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match inbox.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };

            if let Some(message) = received {
                if engine.handle_message(message) == Flow::Shutdown {
                    break;
                }
                engine.process_deferred();
            }
            engine.on_tick(Instant::now());
        }

        engine.teardown();
        debug!("Engine thread exiting");
    }
}

/// Cloneable handle to an engine running on an [`EngineThread`]
///
/// Commands block until the engine has applied them and return its result.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMessage>,
    streams: EngineStreams,
    session: SessionHandle,
    callbacks: EngineCallbacks,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EngineHandle {
    /// Run `command` on the engine thread and wait for its result
    pub fn send(&self, command: Command) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(EngineMessage::Command {
                command,
                reply: Some(reply_tx),
            })
            .map_err(|_| PlaybackError::EngineStopped)?;
        reply_rx.recv().map_err(|_| PlaybackError::EngineStopped)?
    }

    /// Queue `command` without waiting for it
    pub fn post(&self, command: Command) -> Result<()> {
        self.tx
            .send(EngineMessage::Command {
                command,
                reply: None,
            })
            .map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn add_and_play(&self, track: Track) -> Result<()> {
        self.send(Command::AddAndPlay(track))
    }

    pub fn replace_all(&self, tracks: Vec<Track>, track: Track) -> Result<()> {
        self.send(Command::ReplaceAll { tracks, track })
    }

    pub fn play(&self, track: Option<Track>) -> Result<()> {
        self.send(Command::Play(track))
    }

    pub fn delete(&self, track: Track) -> Result<()> {
        self.send(Command::Delete(track))
    }

    pub fn clear_playlist(&self) -> Result<()> {
        self.send(Command::ClearPlaylist)
    }

    pub fn play_pause(&self) -> Result<()> {
        self.send(Command::PlayPause)
    }

    pub fn start_player(&self) -> Result<()> {
        self.send(Command::StartPlayer)
    }

    pub fn pause_player(&self, abandon_focus: bool) -> Result<()> {
        self.send(Command::PausePlayer { abandon_focus })
    }

    pub fn stop_player(&self) -> Result<()> {
        self.send(Command::StopPlayer)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Result<()> {
        self.send(Command::Next)
    }

    pub fn prev(&self) -> Result<()> {
        self.send(Command::Prev)
    }

    pub fn seek_to(&self, msec: i64) -> Result<()> {
        self.send(Command::SeekTo(msec))
    }

    pub fn set_volume(&self, left: f32, right: f32) -> Result<()> {
        self.send(Command::SetVolume { left, right })
    }

    pub fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.send(Command::SetPlayMode(mode))
    }

    pub fn audio_position(&self) -> Result<u64> {
        let (reply_tx, reply_rx) = bounded(1);
        self.query(Query::AudioPosition(reply_tx))?;
        reply_rx.recv().map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn audio_session_id(&self) -> Result<i32> {
        let (reply_tx, reply_rx) = bounded(1);
        self.query(Query::AudioSessionId(reply_tx))?;
        reply_rx.recv().map_err(|_| PlaybackError::EngineStopped)
    }

    pub fn session_token(&self) -> SessionToken {
        self.session.token()
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    pub fn streams(&self) -> EngineStreams {
        self.streams.clone()
    }

    /// Reporting handle for backend and focus collaborators
    pub fn callbacks(&self) -> EngineCallbacks {
        self.callbacks.clone()
    }

    /// Tear the engine down and join the worker
    ///
    /// Any clone may call this; later calls return immediately.
    pub fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return;
        };

        if self.tx.send(EngineMessage::Shutdown).is_err() {
            debug!("Engine thread already gone");
        }
        if worker.join().is_err() {
            warn!("Engine thread panicked");
        }
        info!("Engine thread stopped (session {})", self.session.token());
    }

    fn query(&self, query: Query) -> Result<()> {
        self.tx
            .send(EngineMessage::Query(query))
            .map_err(|_| PlaybackError::EngineStopped)
    }
}
