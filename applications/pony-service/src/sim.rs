//! Timer-driven audio backend
//!
//! Simulates a media player without producing sound: preparation completes
//! after a delay, playback "completes" once the track's duration has elapsed
//! and positions advance with the wall clock. Missing local files fail
//! preparation with `SourceUnavailable`; remote sources report buffering.

use pony_playback::{AudioBackend, BackendFault, EngineCallbacks, Generation, MediaSource, Track};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Default delay before reporting "prepared"
pub const DEFAULT_PREPARE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Loaded {
    duration_ms: u64,
    /// Position when output last started or was seeked
    offset_ms: u64,
    /// Set while playing
    started_at: Option<Instant>,
}

impl Loaded {
    fn position_ms(&self) -> u64 {
        let elapsed = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let position = self.offset_ms + elapsed;
        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    generation: Generation,
    loaded: Option<Loaded>,
    /// Bumped whenever a pending timer must not fire
    epoch: u64,
}

/// Simulated [`AudioBackend`]
pub struct SimulatedBackend {
    callbacks: Option<EngineCallbacks>,
    prepare_delay: Duration,
    session_id: i32,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new(prepare_delay: Duration) -> Self {
        Self {
            callbacks: None,
            prepare_delay,
            session_id: 1,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire `report` after `delay` unless the epoch moved on
    fn schedule<F>(&self, delay: Duration, epoch: u64, report: F)
    where
        F: FnOnce(&EngineCallbacks) + Send + 'static,
    {
        let Some(callbacks) = self.callbacks.clone() else {
            tracing::warn!("Simulated backend used before attach");
            return;
        };
        let state = Arc::clone(&self.state);
        thread::spawn(move || {
            thread::sleep(delay);
            let current = state.lock().unwrap_or_else(PoisonError::into_inner).epoch;
            if current == epoch {
                report(&callbacks);
            }
        });
    }

    /// Arm the completion timer for the loaded track
    fn arm_completion(&self) {
        let (remaining, epoch, generation) = {
            let mut state = self.lock();
            state.epoch += 1;
            let Some(loaded) = &state.loaded else {
                return;
            };
            if loaded.duration_ms == 0 || loaded.started_at.is_none() {
                return;
            }
            let remaining = loaded.duration_ms.saturating_sub(loaded.position_ms());
            (
                Duration::from_millis(remaining),
                state.epoch,
                state.generation,
            )
        };
        self.schedule(remaining, epoch, move |callbacks| {
            let _ = callbacks.completed(generation);
        });
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(DEFAULT_PREPARE_DELAY)
    }
}

impl AudioBackend for SimulatedBackend {
    fn attach(&mut self, callbacks: EngineCallbacks) {
        self.callbacks = Some(callbacks);
    }

    fn prepare(&mut self, generation: Generation, track: &Track) -> Result<(), BackendFault> {
        if let MediaSource::Local(path) = &track.source {
            if !path.exists() {
                return Err(BackendFault::SourceUnavailable(path.display().to_string()));
            }
        }

        let epoch = {
            let mut state = self.lock();
            state.epoch += 1;
            state.generation = generation;
            state.loaded = Some(Loaded {
                duration_ms: track.duration_ms().unwrap_or(0),
                ..Loaded::default()
            });
            state.epoch
        };

        let streamed = track.is_streamed();
        tracing::debug!("Simulating preparation of {}", track.id);
        self.schedule(self.prepare_delay, epoch, move |callbacks| {
            if streamed {
                for percent in [25, 50, 75, 100] {
                    let _ = callbacks.buffering(generation, percent);
                }
            }
            let _ = callbacks.prepared(generation);
        });
        Ok(())
    }

    fn start(&mut self) {
        {
            let mut state = self.lock();
            let Some(loaded) = state.loaded.as_mut() else {
                return;
            };
            if loaded.started_at.is_none() {
                loaded.started_at = Some(Instant::now());
            }
        }
        self.arm_completion();
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        state.epoch += 1;
        if let Some(loaded) = state.loaded.as_mut() {
            loaded.offset_ms = loaded.position_ms();
            loaded.started_at = None;
        }
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.epoch += 1;
        state.loaded = None;
    }

    fn seek_to(&mut self, position_ms: u64) {
        let playing = {
            let mut state = self.lock();
            let Some(loaded) = state.loaded.as_mut() else {
                return;
            };
            loaded.offset_ms = position_ms;
            if loaded.started_at.is_some() {
                loaded.started_at = Some(Instant::now());
            }
            loaded.started_at.is_some()
        };
        if playing {
            self.arm_completion();
        }
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        tracing::debug!("Simulated volume {:.2}/{:.2}", left, right);
    }

    fn position_ms(&self) -> u64 {
        self.lock().loaded.as_ref().map_or(0, Loaded::position_ms)
    }

    fn duration_ms(&self) -> Option<u64> {
        self.lock()
            .loaded
            .as_ref()
            .map(|l| l.duration_ms)
            .filter(|&d| d > 0)
    }

    fn audio_session_id(&self) -> i32 {
        self.session_id
    }
}
