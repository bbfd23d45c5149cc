//! Pony Service Library
//!
//! Hosts the playback engine as a background service with a now-playing
//! notification, a simulated backend and file/environment configuration.
//!
//! This library exposes the core components for the binary and for testing.

pub mod config;
pub mod error;
pub mod notification;
pub mod service;
pub mod sim;

// Re-export commonly used types for convenience
pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use notification::{
    dispatch_action, CoverLoader, FileCoverLoader, LogSink, NotificationAction,
    NotificationContent, NotificationPresenter, NotificationSink, PresenterParts,
};
pub use service::{PlayService, ServiceParts};
pub use sim::SimulatedBackend;
