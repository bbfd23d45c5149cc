//! Observable state for UI synchronization
//!
//! Each stream holds its latest value and a list of subscribers. A new
//! subscriber receives the latest value immediately, then every update in
//! publish order. Subscribers are served in registration order; dropped
//! subscribers are pruned on the next publish.
//!
//! Only the engine publishes. Observers get an [`ObservableReader`], which
//! can read and subscribe but never write.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::BackendFault;
use crate::types::{PlayMode, PlayState, Track};

struct Inner<T> {
    value: T,
    subscribers: Vec<Sender<T>>,
}

impl<T: Clone> Inner<T> {
    fn broadcast(&mut self, value: &T) {
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Values are replaced whole, so a poisoned lock still holds a valid one
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest-value holder with push-based, multi-subscriber delivery
pub struct Observable<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value: initial,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Publish a value to every subscriber, even if unchanged
    pub fn set(&self, value: T) {
        let mut inner = lock(&self.inner);
        inner.broadcast(&value);
        inner.value = value;
    }

    /// Snapshot of the latest value
    pub fn get(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Read-only handle for observers
    pub fn reader(&self) -> ObservableReader<T> {
        ObservableReader {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        self.reader().subscribe()
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Publish only when the value differs from the latest one
    ///
    /// Returns whether anything was published.
    pub fn set_if_changed(&self, value: T) -> bool {
        let mut inner = lock(&self.inner);
        if inner.value == value {
            return false;
        }
        inner.broadcast(&value);
        inner.value = value;
        true
    }
}

/// Read-only face of an [`Observable`]
pub struct ObservableReader<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ObservableReader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> ObservableReader<T> {
    pub fn get(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Register a subscriber; the latest value is already waiting in it
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let mut inner = lock(&self.inner);
        // Cannot fail: we hold the receiver
        let _ = tx.send(inner.value.clone());
        inner.subscribers.push(tx);
        Subscription { rx }
    }

    /// Number of live subscribers (as of the last publish)
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

/// Broadcast channel without replay, for transient signals
pub struct EventStream<T> {
    subscribers: Arc<Mutex<Vec<Sender<T>>>>,
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: Clone> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> EventStream<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn emit(&self, event: T) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Receive events emitted from now on
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        lock(&self.subscribers).push(tx);
        Subscription { rx }
    }
}

/// Receiving end of a stream
///
/// Dropping it unsubscribes.
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next value without waiting
    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next value; `None` once the publisher is gone
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Wait at most `timeout` for the next value
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything received so far, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Most recent pending value, discarding older ones
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }

    /// Underlying receiver, for `crossbeam_channel::select!`
    pub fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }
}

/// Transient signals that are not part of any state stream
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// `play(None)` with an empty playlist
    NoCurrentTrack,

    /// Audio focus refused; playback did not start
    FocusDenied,

    /// A full pass over the playlist failed to start anything
    AllTracksFailed {
        /// Consecutive failed preparations
        attempts: usize,
    },

    /// A track failed; the engine may already be moving on
    PlaybackFailed {
        track_id: String,
        fault: BackendFault,
    },
}

/// Read-only handles to every engine stream
#[derive(Clone)]
pub struct EngineStreams {
    pub playlist: ObservableReader<Vec<Track>>,
    pub current_track: ObservableReader<Option<Track>>,
    pub play_state: ObservableReader<PlayState>,
    pub play_progress: ObservableReader<u64>,
    pub buffering_percent: ObservableReader<u8>,
    pub play_mode: ObservableReader<PlayMode>,
    pub signals: EventStream<EngineSignal>,
}
