//! Background playback service
//!
//! Wires an engine (on its own thread) to a notification presenter. Created
//! and torn down explicitly by the host; after teardown the engine's session
//! handle reports inactive and every command fails with `EngineStopped`.

use pony_playback::{
    AudioBackend, AudioFocus, EngineHandle, EngineStreams, EngineThread, PlaybackEngine,
    SessionToken,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::notification::{
    CoverLoader, FileCoverLoader, NotificationAction, NotificationPresenter, NotificationSink,
    PresenterParts,
};

/// Platform collaborators of the service
pub struct ServiceParts {
    pub backend: Box<dyn AudioBackend>,
    pub focus: Box<dyn AudioFocus>,
    pub sink: Arc<dyn NotificationSink>,
    pub covers: Arc<dyn CoverLoader>,
}

impl ServiceParts {
    /// Parts with covers read from the filesystem
    pub fn new(
        backend: Box<dyn AudioBackend>,
        focus: Box<dyn AudioFocus>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            backend,
            focus,
            sink,
            covers: Arc::new(FileCoverLoader),
        }
    }
}

/// Running playback service
pub struct PlayService {
    engine: EngineHandle,
    presenter: NotificationPresenter,
    actions: mpsc::Sender<NotificationAction>,
}

impl PlayService {
    /// Build the engine, spawn its thread and start the presenter
    ///
    /// Must be called inside a tokio runtime.
    pub fn create(config: &ServiceConfig, parts: ServiceParts) -> Result<Self> {
        config.validate()?;

        let engine = PlaybackEngine::new(config.playback_config(), parts.backend, parts.focus);
        let engine = EngineThread::spawn(engine);

        let (actions, actions_rx) = mpsc::channel(16);
        let presenter = NotificationPresenter::start(
            engine.clone(),
            PresenterParts {
                sink: parts.sink,
                covers: parts.covers,
                settings: config.notification.clone(),
            },
            actions_rx,
        );

        tracing::info!("Play service created (session {})", engine.session_token());
        Ok(Self {
            engine,
            presenter,
            actions,
        })
    }

    /// Command surface of the engine
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn streams(&self) -> EngineStreams {
        self.engine.streams()
    }

    /// Token for platform transport-control integrations
    pub fn session_token(&self) -> SessionToken {
        self.engine.session_token()
    }

    /// Where notification taps are delivered
    pub fn action_sender(&self) -> mpsc::Sender<NotificationAction> {
        self.actions.clone()
    }

    /// Remove the notification, stop playback and join the engine thread
    pub async fn teardown(self) -> Result<()> {
        let Self {
            engine, presenter, ..
        } = self;

        presenter.stop().await?;
        let session = engine.session_token();
        tokio::task::spawn_blocking(move || engine.shutdown()).await?;
        tracing::info!("Play service torn down (session {})", session);
        Ok(())
    }
}
