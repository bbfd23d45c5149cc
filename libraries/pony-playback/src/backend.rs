//! Platform-agnostic audio backend trait
//!
//! The backend decodes and outputs audio; the engine only drives it through
//! a handful of primitives. Preparation is asynchronous: the backend reports
//! back through [`EngineCallbacks`], possibly from its own thread, and the
//! engine applies those reports on its own serialization point.

use crossbeam_channel::{Sender, TrySendError};
use tracing::debug;

use crate::command::EngineMessage;
use crate::error::{BackendFault, PlaybackError, Result};
use crate::types::Track;

/// Identifies one preparation request
///
/// Every new preparation (and every stop) moves the engine to a new
/// generation; callbacks tagged with an older one are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Report from the backend about a preparation
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Ready to start
    Prepared,

    /// Reached the end of the track
    Completed,

    /// Preparation or playback failed
    Error(BackendFault),

    /// Streaming buffer fill (0-100)
    Buffering(u8),
}

/// Audio backend driven by the playback engine
///
/// Mirrors a media-player object: prepare a source, then start, pause,
/// stop, seek and query it. Implementations must not block in these calls.
pub trait AudioBackend: Send {
    /// Called once by the engine with the handle to report through
    fn attach(&mut self, callbacks: EngineCallbacks);

    /// Begin preparing `track`; report `Prepared` or `Error` for `generation`
    ///
    /// Returning an error is equivalent to reporting it.
    fn prepare(
        &mut self,
        generation: Generation,
        track: &Track,
    ) -> std::result::Result<(), BackendFault>;

    /// Start or resume output of the prepared track
    fn start(&mut self);

    fn pause(&mut self);

    /// Stop and release the prepared track
    fn stop(&mut self);

    fn seek_to(&mut self, position_ms: u64);

    /// Per-channel volume, already clamped to 0.0-1.0
    fn set_volume(&mut self, left: f32, right: f32);

    /// Current position of the prepared track
    fn position_ms(&self) -> u64;

    /// Duration reported by the decoder, when known
    fn duration_ms(&self) -> Option<u64> {
        None
    }

    /// Platform audio session id
    fn audio_session_id(&self) -> i32;
}

/// Thread-safe handle for reporting into the engine
///
/// Used by the backend for preparation reports and by the audio-focus
/// provider for involuntary focus loss. Every report is queued and applied
/// by the engine's owner, never directly.
#[derive(Debug, Clone)]
pub struct EngineCallbacks {
    tx: Sender<EngineMessage>,
}

impl EngineCallbacks {
    pub(crate) fn new(tx: Sender<EngineMessage>) -> Self {
        Self { tx }
    }

    pub fn prepared(&self, generation: Generation) -> Result<()> {
        self.send(EngineMessage::Backend {
            generation,
            event: BackendEvent::Prepared,
        })
    }

    pub fn completed(&self, generation: Generation) -> Result<()> {
        self.send(EngineMessage::Backend {
            generation,
            event: BackendEvent::Completed,
        })
    }

    pub fn error(&self, generation: Generation, fault: BackendFault) -> Result<()> {
        self.send(EngineMessage::Backend {
            generation,
            event: BackendEvent::Error(fault),
        })
    }

    /// Buffering updates are dropped rather than blocking when the queue is full
    pub fn buffering(&self, generation: Generation, percent: u8) -> Result<()> {
        let message = EngineMessage::Backend {
            generation,
            event: BackendEvent::Buffering(percent.min(100)),
        };
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("Engine queue full, dropping buffering update");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(PlaybackError::EngineStopped),
        }
    }

    /// The platform took audio focus away
    pub fn focus_lost(&self) -> Result<()> {
        self.send(EngineMessage::FocusLost)
    }

    fn send(&self, message: EngineMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| PlaybackError::EngineStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn generations_advance() {
        let first = Generation::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 1);
    }

    #[test]
    fn callbacks_queue_messages() {
        let (tx, rx) = bounded(4);
        let callbacks = EngineCallbacks::new(tx);

        callbacks.prepared(Generation::default()).unwrap();
        callbacks.buffering(Generation::default(), 250).unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineMessage::Backend {
                event: BackendEvent::Prepared,
                ..
            }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineMessage::Backend {
                event: BackendEvent::Buffering(100),
                ..
            }
        ));
    }

    #[test]
    fn full_queue_drops_buffering_only() {
        let (tx, _rx) = bounded(1);
        let callbacks = EngineCallbacks::new(tx);

        callbacks.buffering(Generation::default(), 10).unwrap();
        // Queue is full; buffering is dropped instead of blocking
        assert!(callbacks.buffering(Generation::default(), 20).is_ok());
    }

    #[test]
    fn stopped_engine_reports_error() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let callbacks = EngineCallbacks::new(tx);
        assert_eq!(callbacks.focus_lost(), Err(PlaybackError::EngineStopped));
    }
}
