use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How the talk key drives the turn lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Each press flips between speaking and muted
    Toggle,
    /// Speaking while the key is held
    PushToTalk,
}

impl ControlMode {
    pub fn from_push_to_talk(push_to_talk: bool) -> Self {
        if push_to_talk {
            Self::PushToTalk
        } else {
            Self::Toggle
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Toggle => "Toggle Mute",
            Self::PushToTalk => "Push-to-Talk",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Configuration for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Remote model requested at connect time
    pub model: String,

    /// Microphone sample rate (PCM16 mono)
    pub send_sample_rate: u32,

    /// Playback sample rate of model audio (PCM16 mono)
    pub receive_sample_rate: u32,

    /// Samples per microphone chunk
    /// Default: 1024 (64ms at 16kHz)
    pub chunk_samples: usize,

    /// Audio queue capacity in chunks (drop-oldest)
    pub audio_queue_capacity: usize,

    /// Audio older than this is dropped instead of sent
    pub audio_max_backlog_ms: u64,

    /// Screen frames older than this are dropped instead of sent
    pub screen_max_age_ms: u64,

    /// Screen capture cadence upper bound (and starting value)
    pub screen_fps_max: u32,

    /// Screen capture cadence lower bound under load
    pub screen_fps_min: u32,

    /// Number of captured frames between cadence adjustments
    pub fps_adjust_every: u32,

    /// Only send screen frames while a turn is active
    pub screen_only_during_turn: bool,

    /// Silence appended after a turn closes so the remote VAD finalizes it
    pub silence_padding_ms: u64,

    /// Unanswered wait before a warning; twice this is fatal
    pub stall_warn_secs: u64,

    /// How often the stall detector checks
    pub stall_poll_secs: u64,

    /// Samples kept per rolling latency window
    pub latency_window: usize,

    /// Egress scheduling tick
    pub egress_tick_ms: u64,

    /// Egress ticks between statistics reports (~5s at 10ms)
    pub stats_every_ticks: u64,

    /// Consecutive connect failures tolerated before giving up
    pub max_reconnect_attempts: u32,

    /// Upper bound for reconnect backoff
    pub max_backoff_secs: u64,

    /// Delay before reopening a failed device
    pub device_retry_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-native-audio-latest".to_string(),
            send_sample_rate: 16000,
            receive_sample_rate: 24000,
            chunk_samples: 1024,
            audio_queue_capacity: 5, // ~320ms of audio
            audio_max_backlog_ms: 200,
            screen_max_age_ms: 500,
            screen_fps_max: 2, // enough for screen guidance
            screen_fps_min: 1,
            fps_adjust_every: 30,
            screen_only_during_turn: true,
            silence_padding_ms: 500,
            stall_warn_secs: 15,
            stall_poll_secs: 2,
            latency_window: 50,
            egress_tick_ms: 10,
            stats_every_ticks: 500,
            max_reconnect_attempts: 5,
            max_backoff_secs: 30,
            device_retry_secs: 2,
        }
    }
}

impl SessionConfig {
    /// Byte length of one PCM16 mono chunk
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_samples * 2
    }

    /// Duration of one chunk in whole milliseconds (64 for 1024 samples at 16kHz)
    pub fn chunk_duration_ms(&self) -> u64 {
        (self.chunk_samples as u64 * 1000) / u64::from(self.send_sample_rate.max(1))
    }

    /// Silence chunks scheduled when a turn closes, at least one
    pub fn silence_chunks(&self) -> u32 {
        let per_chunk = self.chunk_duration_ms().max(1);
        (self.silence_padding_ms / per_chunk).max(1) as u32
    }

    pub fn audio_max_backlog(&self) -> Duration {
        Duration::from_millis(self.audio_max_backlog_ms)
    }

    pub fn screen_max_age(&self) -> Duration {
        Duration::from_millis(self.screen_max_age_ms)
    }

    pub fn stall_warn_after(&self) -> Duration {
        Duration::from_secs(self.stall_warn_secs)
    }

    pub fn stall_poll_interval(&self) -> Duration {
        Duration::from_secs(self.stall_poll_secs.max(1))
    }

    pub fn egress_tick(&self) -> Duration {
        Duration::from_millis(self.egress_tick_ms.max(1))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn device_retry_delay(&self) -> Duration {
        Duration::from_secs(self.device_retry_secs)
    }
}
