//! Pony Player - Playback Engine
//!
//! Platform-agnostic playback control for a background music service.
//!
//! This crate provides:
//! - An ordered, de-duplicated playlist with a current position
//! - Play modes (Sequential, LoopAll, LoopOne, Shuffle with a shuffle bag)
//! - A playback state machine over an asynchronous audio backend
//! - Progress sampling while playing
//! - Observable streams for UI synchronization
//! - An optional dedicated engine thread
//!
//! # Architecture
//!
//! `pony-playback` never touches audio hardware. Decoding and output are
//! behind [`AudioBackend`]; audio-focus arbitration is behind [`AudioFocus`].
//! Backend reports carry a [`Generation`] so that reports for a superseded
//! track are discarded.
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use pony_playback::{
//!     AudioBackend, BackendFault, EngineCallbacks, Generation, MediaSource, NoopFocus,
//!     PlayState, PlaybackConfig, PlaybackEngine, Track,
//! };
//! use std::time::Duration;
//!
//! // Backend that prepares instantly
//! #[derive(Default)]
//! struct InstantBackend {
//!     callbacks: Option<EngineCallbacks>,
//! }
//!
//! impl AudioBackend for InstantBackend {
//!     fn attach(&mut self, callbacks: EngineCallbacks) {
//!         self.callbacks = Some(callbacks);
//!     }
//!     fn prepare(&mut self, generation: Generation, _track: &Track) -> Result<(), BackendFault> {
//!         if let Some(callbacks) = &self.callbacks {
//!             callbacks.prepared(generation).ok();
//!         }
//!         Ok(())
//!     }
//!     fn start(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn seek_to(&mut self, _position_ms: u64) {}
//!     fn set_volume(&mut self, _left: f32, _right: f32) {}
//!     fn position_ms(&self) -> u64 { 0 }
//!     fn audio_session_id(&self) -> i32 { 1 }
//! }
//!
//! let mut engine = PlaybackEngine::new(
//!     PlaybackConfig::default(),
//!     Box::new(InstantBackend::default()),
//!     Box::new(NoopFocus),
//! );
//!
//! engine.add_and_play(Track {
//!     id: "track1".to_string(),
//!     title: "My Song".to_string(),
//!     artist: "Artist Name".to_string(),
//!     album: "Album Name".to_string(),
//!     source: MediaSource::Local("/music/song.mp3".into()),
//!     duration: Duration::from_secs(180),
//!     cover: None,
//! });
//!
//! // Apply the backend's "prepared" report
//! engine.process_pending();
//! assert_eq!(engine.state(), PlayState::Playing);
//! ```
//!
//! # Example: Observing State
//!
//! ```rust,no_run
//! # use pony_playback::PlaybackEngine;
//! # fn observe(engine: &PlaybackEngine) {
//! let states = engine.streams().play_state.subscribe();
//! while let Some(state) = states.recv() {
//!     println!("state: {:?}", state);
//! }
//! # }
//! ```

mod backend;
mod command;
mod engine;
mod error;
mod focus;
mod observable;
pub mod play_mode;
mod playlist;
mod progress;
mod runtime;
mod session;
pub mod types;

// Public exports
pub use backend::{AudioBackend, BackendEvent, EngineCallbacks, Generation};
pub use command::{Command, Query};
pub use engine::{PlaybackEngine, NO_AUDIO_SESSION};
pub use error::{BackendFault, PlaybackError, Result};
pub use focus::{AudioFocus, NoopFocus};
pub use observable::{
    EngineSignal, EngineStreams, EventStream, Observable, ObservableReader, Subscription,
};
pub use play_mode::PlayModeSelector;
pub use playlist::{PlaylistStore, Removed};
pub use progress::ProgressReporter;
pub use runtime::{EngineHandle, EngineThread};
pub use session::{SessionHandle, SessionToken};
pub use types::{
    MediaSource, PlayMode, PlayState, PlaybackConfig, Track, MAX_PROGRESS_INTERVAL,
    MIN_PROGRESS_INTERVAL,
};
