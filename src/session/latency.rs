//! Rolling latency windows and the screen cadence controller

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Fixed-size window of millisecond samples
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    /// Mean of the window, 0 when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Mean latencies at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySnapshot {
    pub audio_send_ms: f64,
    pub screen_send_ms: f64,
    pub response_ms: f64,
}

/// Capture-to-send and turn-end-to-response latencies
#[derive(Debug, Clone)]
pub struct LatencyStats {
    audio_send: RollingWindow,
    screen_send: RollingWindow,
    response: RollingWindow,
}

impl LatencyStats {
    pub fn new(window: usize) -> Self {
        Self {
            audio_send: RollingWindow::new(window),
            screen_send: RollingWindow::new(window),
            response: RollingWindow::new(window),
        }
    }

    pub fn record_audio_send(&mut self, ms: f64) {
        self.audio_send.push(ms);
    }

    pub fn record_screen_send(&mut self, ms: f64) {
        self.screen_send.push(ms);
    }

    pub fn record_response(&mut self, ms: f64) {
        self.response.push(ms);
    }

    pub fn avg_audio_ms(&self) -> f64 {
        self.audio_send.mean()
    }

    pub fn avg_screen_ms(&self) -> f64 {
        self.screen_send.mean()
    }

    pub fn avg_response_ms(&self) -> f64 {
        self.response.mean()
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            audio_send_ms: self.avg_audio_ms(),
            screen_send_ms: self.avg_screen_ms(),
            response_ms: self.avg_response_ms(),
        }
    }
}

/// Delay between screen captures at `fps` frames per second
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

/// Cadence change decided by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAdjustment {
    Decreased(u32),
    Increased(u32),
}

/// Two-threshold hysteresis controller for screen capture cadence.
///
/// Every `adjust_every` frames the rolling screen latency is compared to the
/// age budget: at or above 80% steps down, below 30% steps back up.
#[derive(Debug, Clone)]
pub struct RateController {
    fps_min: u32,
    fps_max: u32,
    current_fps: u32,
    budget_ms: f64,
    adjust_every: u32,
    frames_seen: u32,
}

impl RateController {
    pub fn new(fps_min: u32, fps_max: u32, budget: Duration, adjust_every: u32) -> Self {
        let fps_min = fps_min.max(1);
        let fps_max = fps_max.max(fps_min);
        Self {
            fps_min,
            fps_max,
            current_fps: fps_max,
            budget_ms: budget.as_secs_f64() * 1000.0,
            adjust_every: adjust_every.max(1),
            frames_seen: 0,
        }
    }

    pub fn current_fps(&self) -> u32 {
        self.current_fps
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.fps_min, self.fps_max)
    }

    /// Count one captured frame and adjust on every `adjust_every`-th
    pub fn observe_frame(&mut self, mean_screen_latency_ms: f64) -> Option<RateAdjustment> {
        self.frames_seen = self.frames_seen.wrapping_add(1);
        if self.frames_seen % self.adjust_every != 0 {
            return None;
        }

        if mean_screen_latency_ms >= self.budget_ms * 0.8 {
            if self.current_fps > self.fps_min {
                self.current_fps -= 1;
                return Some(RateAdjustment::Decreased(self.current_fps));
            }
        } else if mean_screen_latency_ms < self.budget_ms * 0.3 && self.current_fps < self.fps_max {
            self.current_fps += 1;
            return Some(RateAdjustment::Increased(self.current_fps));
        }

        None
    }
}
