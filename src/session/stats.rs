use chrono::{DateTime, Utc};
use serde::Serialize;

use super::latency::LatencySnapshot;
use super::turn::TurnPhase;

/// Statistics about a live session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Control mode label ("Toggle Mute" / "Push-to-Talk")
    pub mode: String,

    /// Successful transport connections so far
    pub connections: u32,

    /// Connections torn down by a mid-session failure
    pub mid_session_failures: u32,

    /// Current turn phase
    pub turn_phase: TurnPhase,

    /// Most recent turn, if any
    pub turn_id: Option<String>,

    /// Audio chunks forwarded (excluding silence padding)
    pub audio_chunks_sent: u64,

    /// Silence padding chunks forwarded
    pub silence_chunks_sent: u64,

    /// Screen frames forwarded
    pub screen_frames_sent: u64,

    /// Audio chunks evicted on overflow or over the backlog budget
    pub audio_drops: u64,

    /// Screen frames replaced before egress or over the age budget
    pub screen_drops: u64,

    /// Model audio chunks handed to playback
    pub response_audio_chunks: u64,

    /// Completed model turns
    pub model_turns_completed: u64,

    /// Rolling mean latencies
    pub latency: LatencySnapshot,

    /// Current screen capture cadence
    pub screen_fps: u32,
}
