//! Session handle for platform transport-control integrations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque token identifying one engine instance
///
/// Minted at engine construction, never changed by commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token plus a liveness flag shared with the engine
///
/// `is_active()` turns false once the engine is torn down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    token: SessionToken,
    active: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            token: SessionToken::generate(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.active.store(false, Ordering::Release);
    }
}
