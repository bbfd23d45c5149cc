//! Now-playing notification
//!
//! The presenter follows the engine's `current_track` and `play_state`
//! streams and renders a [`NotificationContent`] to a [`NotificationSink`].
//! Each render is shown first without artwork; cover art is loaded by a
//! background task that is aborted as soon as a newer render supersedes it.
//! Taps on the notification come back as [`NotificationAction`]s and are
//! re-issued through the ordinary engine commands: the play and pause
//! buttons both toggle through `play_pause`, the next button calls `next`.

use async_trait::async_trait;
use pony_playback::{EngineHandle, PlayState, SessionHandle, Subscription, Track};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::NotificationSettings;
use crate::error::Result;

/// How often stream bridges re-check for shutdown
const BRIDGE_POLL: Duration = Duration::from_millis(100);

/// Button on the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Play,
    Pause,
    Next,
}

/// Everything needed to draw the notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContent {
    pub track_id: String,
    pub title: String,
    /// "artist - album"
    pub subtitle: String,
    pub playing: bool,
    /// Play while paused, Pause while playing
    pub primary_action: NotificationAction,
    pub secondary_action: NotificationAction,
    pub custom_layout: bool,
    pub cover: Option<Vec<u8>>,
}

impl NotificationContent {
    fn render(track: &Track, state: PlayState, custom_layout: bool) -> Self {
        let playing = state.is_active();
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            subtitle: track.subtitle(),
            playing,
            primary_action: if playing {
                NotificationAction::Pause
            } else {
                NotificationAction::Play
            },
            secondary_action: NotificationAction::Next,
            custom_layout,
            cover: None,
        }
    }
}

/// Platform notification surface
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Show or replace the notification
    async fn show(&self, content: NotificationContent);

    /// Remove the notification
    async fn cancel(&self);
}

/// Cover art source
#[async_trait]
pub trait CoverLoader: Send + Sync {
    async fn load(&self, track: &Track) -> Option<Vec<u8>>;
}

/// Reads `Track::cover` as a file path
#[derive(Debug, Default, Clone, Copy)]
pub struct FileCoverLoader;

#[async_trait]
impl CoverLoader for FileCoverLoader {
    async fn load(&self, track: &Track) -> Option<Vec<u8>> {
        let path = PathBuf::from(track.cover.as_ref()?);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("No cover art at {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Sink that only logs, for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn show(&self, content: NotificationContent) {
        tracing::info!(
            "Notification: {} | {} [{:?}] {}",
            content.title,
            content.subtitle,
            content.primary_action,
            if content.cover.is_some() {
                "with cover"
            } else {
                "no cover"
            }
        );
    }

    async fn cancel(&self) {
        tracing::info!("Notification cancelled");
    }
}

/// Re-issue a notification tap as an engine command
pub async fn dispatch_action(engine: &EngineHandle, action: NotificationAction) -> Result<()> {
    let engine = engine.clone();
    tokio::task::spawn_blocking(move || match action {
        NotificationAction::Play | NotificationAction::Pause => engine.play_pause(),
        NotificationAction::Next => engine.next(),
    })
    .await??;
    Ok(())
}

enum Update {
    Track(Option<Track>),
    State(PlayState),
}

/// Collaborators of the presenter
pub struct PresenterParts {
    pub sink: Arc<dyn NotificationSink>,
    pub covers: Arc<dyn CoverLoader>,
    pub settings: NotificationSettings,
}

/// Running notification presenter
pub struct NotificationPresenter {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl NotificationPresenter {
    /// Start presenting; must be called inside a tokio runtime
    pub fn start(
        engine: EngineHandle,
        parts: PresenterParts,
        actions: mpsc::Receiver<NotificationAction>,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(32);
        let streams = engine.streams();
        let session = engine.session();

        bridge(
            streams.current_track.subscribe(),
            session.clone(),
            updates_tx.clone(),
            Update::Track,
        );
        bridge(
            streams.play_state.subscribe(),
            session,
            updates_tx,
            Update::State,
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(engine, parts, updates_rx, actions, stop_rx));
        tracing::info!("Notification presenter started");

        Self {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    /// Cancel the notification and wait for the presenter to finish
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Presenter may already have exited
            let _ = stop_tx.send(());
        }
        self.task.await?;
        tracing::info!("Notification presenter stopped");
        Ok(())
    }
}

/// Forward a crossbeam subscription into the presenter's queue
fn bridge<T, F>(
    subscription: Subscription<T>,
    session: SessionHandle,
    tx: mpsc::Sender<Update>,
    wrap: F,
) where
    T: Send + 'static,
    F: Fn(T) -> Update + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        while session.is_active() && !tx.is_closed() {
            if let Some(value) = subscription.recv_timeout(BRIDGE_POLL) {
                if tx.blocking_send(wrap(value)).is_err() {
                    break;
                }
            }
        }
    });
}

async fn run(
    engine: EngineHandle,
    parts: PresenterParts,
    mut updates: mpsc::Receiver<Update>,
    mut actions: mpsc::Receiver<NotificationAction>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut track: Option<Track> = None;
    let mut state = PlayState::Idle;
    let mut cover_task: Option<JoinHandle<()>> = None;
    let mut showing = false;

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            update = updates.recv() => {
                let Some(update) = update else { break };
                match update {
                    Update::Track(next) => track = next,
                    Update::State(next) => state = next,
                }

                if let Some(task) = cover_task.take() {
                    task.abort();
                }
                if !parts.settings.enabled {
                    continue;
                }

                match &track {
                    Some(track) => {
                        let content =
                            NotificationContent::render(track, state, parts.settings.custom_layout);
                        parts.sink.show(content.clone()).await;
                        showing = true;

                        if parts.settings.load_covers && track.cover.is_some() {
                            cover_task = Some(spawn_cover_load(
                                track.clone(),
                                content,
                                Arc::clone(&parts.sink),
                                Arc::clone(&parts.covers),
                            ));
                        }
                    }
                    None => {
                        if showing {
                            parts.sink.cancel().await;
                            showing = false;
                        }
                    }
                }
            }
            Some(action) = actions.recv() => {
                tracing::debug!("Notification action {:?}", action);
                if let Err(e) = dispatch_action(&engine, action).await {
                    tracing::warn!("Notification action {:?} failed: {}", action, e);
                }
            }
        }
    }

    if let Some(task) = cover_task.take() {
        task.abort();
    }
    if showing {
        parts.sink.cancel().await;
    }
}

fn spawn_cover_load(
    track: Track,
    content: NotificationContent,
    sink: Arc<dyn NotificationSink>,
    covers: Arc<dyn CoverLoader>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(bytes) = covers.load(&track).await {
            sink.show(NotificationContent {
                cover: Some(bytes),
                ..content
            })
            .await;
        }
    })
}
