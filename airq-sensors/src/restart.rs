//! Deferred measurement restart.
//!
//! Between samples the particulate sensors are stopped to save the fan and laser,
//! and restarted shortly before the next sample is due so that readings have time
//! to stabilise. The restart is held as a deadline owned by the session rather
//! than a background timer, so closing the session cancels it.
use std::time::{Duration, Instant};

/// A pending restart, if any.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestartSchedule {
    due: Option<Instant>,
}

impl RestartSchedule {
    /// Schedule with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart delay for a sampling `period` that needs `warm_up` before the
    /// next sample, i.e. `period - warm_up` (zero if the warm-up is longer).
    pub fn delay_for(period: Duration, warm_up: Duration) -> Duration {
        period.saturating_sub(warm_up)
    }

    /// Arm the restart to fire `delay` after `now`, replacing any pending one.
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.due = Some(now + delay);
    }

    /// Cancel the pending restart. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    /// When the pending restart is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.due
    }

    /// True if a restart is pending.
    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Consume the pending restart if it is due at `now`.
    ///
    /// Returns true exactly once per scheduled restart.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
