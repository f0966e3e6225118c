use std::time::Duration;
use tokio::time::Instant;

/// Outcome of one stall check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallStatus {
    /// No response outstanding
    Idle,
    /// Waiting, still within the warning threshold
    Waiting(Duration),
    /// Past the warning threshold
    Warning(Duration),
    /// Past twice the warning threshold; the connection must be torn down
    Stalled(Duration),
}

/// Watchdog over turns whose response has not arrived
#[derive(Debug, Clone)]
pub struct StallWatch {
    last_turn_end: Option<Instant>,
    warn_after: Duration,
}

impl StallWatch {
    pub fn new(warn_after: Duration) -> Self {
        Self {
            last_turn_end: None,
            warn_after,
        }
    }

    /// A turn ended at `at`; a response is now outstanding
    pub fn mark_turn_end(&mut self, at: Instant) {
        self.last_turn_end = Some(at);
    }

    /// Response arrived (or connection reset)
    pub fn clear(&mut self) {
        self.last_turn_end = None;
    }

    pub fn awaiting_since(&self) -> Option<Instant> {
        self.last_turn_end
    }

    pub fn is_awaiting(&self) -> bool {
        self.last_turn_end.is_some()
    }

    pub fn fatal_after(&self) -> Duration {
        self.warn_after * 2
    }

    /// Classify the wait at `now`. Requires a known turn to act at all.
    pub fn check(&self, now: Instant, turn_known: bool) -> StallStatus {
        let Some(since) = self.last_turn_end else {
            return StallStatus::Idle;
        };
        if !turn_known {
            return StallStatus::Idle;
        }

        let wait = now.saturating_duration_since(since);
        if wait > self.fatal_after() {
            StallStatus::Stalled(wait)
        } else if wait > self.warn_after {
            StallStatus::Warning(wait)
        } else {
            StallStatus::Waiting(wait)
        }
    }
}
