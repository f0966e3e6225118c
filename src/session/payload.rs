use std::time::Duration;
use tokio::time::Instant;

/// Captured media bytes tagged with the instant they were captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedPayload {
    data: Vec<u8>,
    captured_at: Instant,
}

impl TimestampedPayload {
    /// Stamp `data` with the current instant
    pub fn new(data: Vec<u8>) -> Self {
        Self::captured_at(data, Instant::now())
    }

    pub fn captured_at(data: Vec<u8>, captured_at: Instant) -> Self {
        Self { data, captured_at }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn timestamp(&self) -> Instant {
        self.captured_at
    }

    pub fn age(&self) -> Duration {
        self.age_at(Instant::now())
    }

    /// Age relative to `now`; zero if `now` precedes the capture
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.captured_at)
    }

    pub fn age_ms(&self) -> f64 {
        self.age().as_secs_f64() * 1000.0
    }
}
