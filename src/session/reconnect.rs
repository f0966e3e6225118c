use std::time::Duration;

/// What to do after a failed connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    Retry { attempt: u32, backoff: Duration },
    GiveUp { attempts: u32 },
}

/// Bounded exponential backoff for connect-time failures.
///
/// Only connect failures are counted; a successful connect resets the count.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempt_count: u32,
    max_attempts: u32,
    max_backoff: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, max_backoff: Duration) -> Self {
        Self {
            attempt_count: 0,
            max_attempts,
            max_backoff,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn on_connected(&mut self) {
        self.attempt_count = 0;
    }

    pub fn on_connect_failure(&mut self) -> ReconnectDecision {
        self.attempt_count = self.attempt_count.saturating_add(1);

        if self.attempt_count > self.max_attempts {
            return ReconnectDecision::GiveUp {
                attempts: self.attempt_count,
            };
        }

        ReconnectDecision::Retry {
            attempt: self.attempt_count,
            backoff: self.backoff_for(self.attempt_count),
        }
    }

    /// `min(max_backoff, 2^attempt)` seconds
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_secs(secs).min(self.max_backoff)
    }
}
