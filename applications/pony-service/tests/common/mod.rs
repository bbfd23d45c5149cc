/// Common test utilities and fixtures
use async_trait::async_trait;
use pony_playback::{MediaSource, NoopFocus, Track};
use pony_service::{
    CoverLoader, NotificationContent, NotificationSink, PlayService, ServiceConfig, ServiceParts,
    SimulatedBackend,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// What the sink was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Show(NotificationContent),
    Cancel,
}

/// Sink that records every call
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Every notification shown, oldest first
    pub fn shown(&self) -> Vec<NotificationContent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Show(content) => Some(content),
                SinkEvent::Cancel => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<SinkEvent> {
        self.events().last().cloned()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, content: NotificationContent) {
        self.events.lock().unwrap().push(SinkEvent::Show(content));
    }

    async fn cancel(&self) {
        self.events.lock().unwrap().push(SinkEvent::Cancel);
    }
}

/// Cover loader returning the track id as bytes after a delay
pub struct SlowCovers {
    pub delay: Duration,
}

#[async_trait]
impl CoverLoader for SlowCovers {
    async fn load(&self, track: &Track) -> Option<Vec<u8>> {
        track.cover.as_ref()?;
        tokio::time::sleep(self.delay).await;
        Some(track.id.clone().into_bytes())
    }
}

/// Track backed by a real (empty) file in `dir`
pub fn create_file_track(dir: &Path, id: &str, duration_ms: u64) -> Track {
    let path = dir.join(format!("{}.mp3", id));
    std::fs::write(&path, b"").unwrap();
    Track {
        id: id.to_string(),
        title: format!("Song {}", id),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        source: MediaSource::Local(path),
        duration: Duration::from_millis(duration_ms),
        cover: Some(format!("covers/{}.jpg", id)),
    }
}

/// Track whose file does not exist
pub fn create_missing_track(dir: &Path, id: &str) -> Track {
    Track {
        source: MediaSource::Local(dir.join(format!("missing-{}.mp3", id))),
        ..create_file_track(dir, id, 60_000)
    }
}

/// Running service with a recording sink
pub struct TestService {
    pub service: PlayService,
    pub sink: Arc<RecordingSink>,
    pub dir: TempDir,
}

impl TestService {
    pub fn start() -> Self {
        Self::start_with(ServiceConfig::default(), Duration::from_millis(5))
    }

    pub fn start_with(config: ServiceConfig, cover_delay: Duration) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let parts = ServiceParts {
            backend: Box::new(SimulatedBackend::new(Duration::from_millis(10))),
            focus: Box::new(NoopFocus),
            sink: sink.clone(),
            covers: Arc::new(SlowCovers { delay: cover_delay }),
        };
        let service = PlayService::create(&config, parts).unwrap();
        Self {
            service,
            sink,
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn track(&self, id: &str) -> Track {
        create_file_track(self.dir.path(), id, 60_000)
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
