//! Shared fixtures for engine integration tests

use pony_playback::{
    AudioBackend, AudioFocus, BackendFault, EngineCallbacks, Generation, MediaSource, PlayMode,
    PlaybackConfig, PlaybackEngine, Track,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT_LOGGING: Once = Once::new();

/// Route engine logs to the test harness output
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("pony_playback=debug")
            .with_test_writer()
            .try_init();
    });
}

// ===== Tracks =====

pub fn create_test_track(id: &str) -> Track {
    create_test_track_ms(id, 180_000)
}

pub fn create_test_track_ms(id: &str, duration_ms: u64) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        source: MediaSource::Local(format!("/music/{}.mp3", id).into()),
        duration: Duration::from_millis(duration_ms),
        cover: None,
    }
}

pub fn create_remote_track(id: &str) -> Track {
    Track {
        source: MediaSource::Remote(format!("https://stream.example.com/{}.mp3", id)),
        ..create_test_track(id)
    }
}

// ===== Backend =====

#[derive(Default)]
struct Recorded {
    prepared: Vec<(Generation, String)>,
    starts: usize,
    pauses: usize,
    stops: usize,
    seeks: Vec<u64>,
    volumes: Vec<(f32, f32)>,
    position_ms: u64,
    fail_sync: HashSet<String>,
    auto_prepare: bool,
}

/// Test-side view of a [`RecordingBackend`]
#[derive(Clone, Default)]
pub struct BackendProbe {
    recorded: Arc<Mutex<Recorded>>,
    callbacks: Arc<Mutex<Option<EngineCallbacks>>>,
}

impl BackendProbe {
    fn callbacks(&self) -> EngineCallbacks {
        self.callbacks
            .lock()
            .unwrap()
            .clone()
            .expect("backend not attached")
    }

    pub fn last_generation(&self) -> Generation {
        self.recorded
            .lock()
            .unwrap()
            .prepared
            .last()
            .expect("nothing prepared")
            .0
    }

    /// Ids passed to `prepare`, oldest first
    pub fn prepared_ids(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap()
            .prepared
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Report "prepared" for the latest preparation
    pub fn prepare_ok(&self) {
        self.callbacks().prepared(self.last_generation()).unwrap();
    }

    pub fn complete(&self) {
        self.callbacks().completed(self.last_generation()).unwrap();
    }

    pub fn fail(&self, fault: BackendFault) {
        self.callbacks()
            .error(self.last_generation(), fault)
            .unwrap();
    }

    pub fn buffering(&self, percent: u8) {
        self.callbacks()
            .buffering(self.last_generation(), percent)
            .unwrap();
    }

    pub fn lose_focus(&self) {
        self.callbacks().focus_lost().unwrap();
    }

    /// Make `prepare` fail synchronously for this track id
    pub fn fail_on(&self, id: &str) {
        self.recorded.lock().unwrap().fail_sync.insert(id.to_string());
    }

    /// Report "prepared" from another thread on every `prepare`
    pub fn auto_prepare(&self) {
        self.recorded.lock().unwrap().auto_prepare = true;
    }

    pub fn set_position(&self, position_ms: u64) {
        self.recorded.lock().unwrap().position_ms = position_ms;
    }

    pub fn starts(&self) -> usize {
        self.recorded.lock().unwrap().starts
    }

    pub fn pauses(&self) -> usize {
        self.recorded.lock().unwrap().pauses
    }

    pub fn stops(&self) -> usize {
        self.recorded.lock().unwrap().stops
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.recorded.lock().unwrap().seeks.clone()
    }

    pub fn last_volume(&self) -> Option<(f32, f32)> {
        self.recorded.lock().unwrap().volumes.last().copied()
    }
}

/// Backend that records every call and reports only when told to
pub struct RecordingBackend {
    probe: BackendProbe,
}

impl RecordingBackend {
    pub fn new() -> (Self, BackendProbe) {
        let probe = BackendProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl AudioBackend for RecordingBackend {
    fn attach(&mut self, callbacks: EngineCallbacks) {
        *self.probe.callbacks.lock().unwrap() = Some(callbacks);
    }

    fn prepare(&mut self, generation: Generation, track: &Track) -> Result<(), BackendFault> {
        let mut recorded = self.probe.recorded.lock().unwrap();
        recorded.prepared.push((generation, track.id.clone()));
        if recorded.fail_sync.contains(&track.id) {
            return Err(BackendFault::SourceUnavailable(track.id.clone()));
        }
        if recorded.auto_prepare {
            let callbacks = self.probe.callbacks();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(5));
                let _ = callbacks.prepared(generation);
            });
        }
        Ok(())
    }

    fn start(&mut self) {
        self.probe.recorded.lock().unwrap().starts += 1;
    }

    fn pause(&mut self) {
        self.probe.recorded.lock().unwrap().pauses += 1;
    }

    fn stop(&mut self) {
        let mut recorded = self.probe.recorded.lock().unwrap();
        recorded.stops += 1;
        recorded.position_ms = 0;
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut recorded = self.probe.recorded.lock().unwrap();
        recorded.seeks.push(position_ms);
        recorded.position_ms = position_ms;
    }

    fn set_volume(&mut self, left: f32, right: f32) {
        self.probe.recorded.lock().unwrap().volumes.push((left, right));
    }

    fn position_ms(&self) -> u64 {
        self.probe.recorded.lock().unwrap().position_ms
    }

    fn audio_session_id(&self) -> i32 {
        42
    }
}

// ===== Focus =====

/// Test-side view of a [`FakeFocus`]
#[derive(Clone)]
pub struct FocusProbe {
    granted: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
    abandons: Arc<AtomicUsize>,
}

impl FocusProbe {
    pub fn deny(&self) {
        self.granted.store(false, Ordering::SeqCst);
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn abandons(&self) -> usize {
        self.abandons.load(Ordering::SeqCst)
    }
}

pub struct FakeFocus {
    probe: FocusProbe,
}

impl FakeFocus {
    pub fn new() -> (Self, FocusProbe) {
        let probe = FocusProbe {
            granted: Arc::new(AtomicBool::new(true)),
            requests: Arc::new(AtomicUsize::new(0)),
            abandons: Arc::new(AtomicUsize::new(0)),
        };
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl AudioFocus for FakeFocus {
    fn request(&mut self) -> bool {
        self.probe.requests.fetch_add(1, Ordering::SeqCst);
        self.probe.granted.load(Ordering::SeqCst)
    }

    fn abandon(&mut self) {
        self.probe.abandons.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== Engine =====

pub struct Harness {
    pub engine: PlaybackEngine,
    pub backend: BackendProbe,
    pub focus: FocusProbe,
}

impl Harness {
    pub fn new(mode: PlayMode) -> Self {
        init_logging();
        let (backend, backend_probe) = RecordingBackend::new();
        let (focus, focus_probe) = FakeFocus::new();
        let config = PlaybackConfig {
            play_mode: mode,
            ..PlaybackConfig::default()
        };
        Self {
            engine: PlaybackEngine::new(config, Box::new(backend), Box::new(focus)),
            backend: backend_probe,
            focus: focus_probe,
        }
    }

    /// Report "prepared" and apply it
    pub fn prepared(&mut self) {
        self.backend.prepare_ok();
        self.engine.process_pending();
    }

    /// Report completion and apply it
    pub fn completed(&mut self) {
        self.backend.complete();
        self.engine.process_pending();
    }

    pub fn failed(&mut self, fault: BackendFault) {
        self.backend.fail(fault);
        self.engine.process_pending();
    }

    /// Load `ids` and start the first one
    pub fn load(&mut self, ids: &[&str]) -> Vec<Track> {
        let tracks: Vec<Track> = ids.iter().map(|id| create_test_track(id)).collect();
        self.engine
            .replace_all(tracks.clone(), tracks[0].clone())
            .unwrap();
        tracks
    }

    pub fn current_id(&self) -> Option<String> {
        self.engine.current_track().map(|t| t.id.clone())
    }
}
