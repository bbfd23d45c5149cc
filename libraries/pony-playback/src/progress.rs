//! Progress sampling while playing
//!
//! The reporter does not read the backend itself; it tells its owner when a
//! sample is due and filters what gets published. Duration stays
//! authoritative from track metadata, this is only elapsed time.

use std::time::{Duration, Instant};

/// Periodic progress sampler
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    interval: Duration,

    /// Next sample time; `None` while suspended
    next_due: Option<Instant>,

    /// Last published value within the current track
    last: u64,
}

impl ProgressReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
            last: 0,
        }
    }

    /// Resume sampling; the first sample is due immediately
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    /// Suspend sampling; no sample is due until `start` again
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a sample is due at `now`; schedules the following one
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                // After a stall, resynchronise instead of firing a burst
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }

    /// Time left until the next sample, `None` while suspended
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Filter a backend sample
    ///
    /// Returns the value to publish, or `None` for a repeat or a value
    /// behind the last published one.
    pub fn accept(&mut self, sample_ms: u64) -> Option<u64> {
        if sample_ms <= self.last {
            return None;
        }
        self.last = sample_ms;
        Some(sample_ms)
    }

    /// New baseline after a track change or seek
    pub fn rebase(&mut self, position_ms: u64) {
        self.last = position_ms;
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}
