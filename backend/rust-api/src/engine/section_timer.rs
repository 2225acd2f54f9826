use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Expired,
}

/// Countdown for the active section.
///
/// Remaining time is always derived from the clock, not from how many ticks
/// were delivered, so throttled or missed ticks never stretch a section.
#[derive(Debug, Clone)]
pub struct SectionTimer {
    duration: Duration,
    started_at: Instant,
    expired: bool,
}

impl SectionTimer {
    pub fn start(duration: Duration, now: Instant) -> Self {
        Self {
            duration,
            started_at: now,
            expired: false,
        }
    }

    /// Restarts the countdown with a new duration and clears expiry.
    pub fn reset(&mut self, duration: Duration, now: Instant) {
        *self = Self::start(duration, now);
    }

    /// Yields `Expired` exactly once, on the first tick at or past the deadline.
    pub fn tick(&mut self, now: Instant) -> Option<TimerSignal> {
        if self.expired {
            return None;
        }
        if now.saturating_duration_since(self.started_at) >= self.duration {
            self.expired = true;
            return Some(TimerSignal::Expired);
        }
        None
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        if self.expired {
            return Duration::ZERO;
        }
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }

    /// Whole seconds left, rounded up.
    pub fn remaining_seconds(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn deadline(&self) -> Instant {
        self.started_at + self.duration
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}
