use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use super::config::{ControlMode, SessionConfig};
use super::control::ControlEvent;
use super::latency::{LatencyStats, RateAdjustment, RateController};
use super::payload::TimestampedPayload;
use super::queue::{AudioQueue, BoundedQueue, VideoQueue};
use super::stall::{StallStatus, StallWatch};
use super::stats::SessionStats;
use super::turn::{TurnMachine, TurnPhase, TurnTransition};
use crate::error::{Result, SessionError};

/// Model audio handed to the playback unit, strict FIFO
pub type PlaybackSender = mpsc::UnboundedSender<Vec<u8>>;

#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Counters {
    pub connections: u32,
    pub mid_session_failures: u32,
    pub audio_chunks_sent: u64,
    pub silence_chunks_sent: u64,
    pub screen_frames_sent: u64,
    pub response_audio_chunks: u64,
    pub model_turns_completed: u64,
    pub ticks: u64,
}

/// Capture instants bounding the current (or most recent) turn
#[derive(Debug, Default, Clone, Copy)]
struct CaptureWindow {
    opened_at: Option<Instant>,
    closed_at: Option<Instant>,
}

/// Owns every piece of mutable session state: queues, turn lifecycle,
/// latency windows, cadence controller and stall watch.
///
/// All mutation goes through `&mut self`, so whichever task drives the
/// coordinator is the only writer.
pub struct SessionCoordinator {
    pub(super) config: SessionConfig,
    pub(super) mode: ControlMode,
    pub(super) audio_queue: AudioQueue,
    pub(super) video_queue: VideoQueue,
    pub(super) turn: TurnMachine,
    pub(super) latency: LatencyStats,
    pub(super) rate: RateController,
    pub(super) stall: StallWatch,
    pub(super) counters: Counters,
    pub(super) silence_chunk: Vec<u8>,
    capture_window: CaptureWindow,
    started_at: DateTime<Utc>,
    fps_tx: watch::Sender<u32>,
    stats_tx: watch::Sender<SessionStats>,
}

impl SessionCoordinator {
    pub fn new(config: SessionConfig, mode: ControlMode) -> Self {
        let rate = RateController::new(
            config.screen_fps_min,
            config.screen_fps_max,
            config.screen_max_age(),
            config.fps_adjust_every,
        );
        let (fps_tx, _) = watch::channel(rate.current_fps());

        let mut coordinator = Self {
            audio_queue: BoundedQueue::drop_oldest(config.audio_queue_capacity),
            video_queue: BoundedQueue::latest_only(),
            turn: TurnMachine::new(config.silence_chunks()),
            latency: LatencyStats::new(config.latency_window),
            stall: StallWatch::new(config.stall_warn_after()),
            silence_chunk: vec![0u8; config.chunk_bytes()],
            counters: Counters::default(),
            capture_window: CaptureWindow::default(),
            started_at: Utc::now(),
            rate,
            fps_tx,
            // Placeholder until the first snapshot below
            stats_tx: watch::channel(placeholder_stats(mode)).0,
            config,
            mode,
        };
        coordinator.publish_stats();
        coordinator
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn turn(&self) -> &TurnMachine {
        &self.turn
    }

    pub fn audio_queue(&self) -> &AudioQueue {
        &self.audio_queue
    }

    pub fn video_queue(&self) -> &VideoQueue {
        &self.video_queue
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    pub fn stall_watch(&self) -> &StallWatch {
        &self.stall
    }

    pub fn current_fps(&self) -> u32 {
        self.rate.current_fps()
    }

    /// Cadence updates for the screen capture unit
    pub fn fps_watch(&self) -> watch::Receiver<u32> {
        self.fps_tx.subscribe()
    }

    /// Periodic statistics snapshots
    pub fn stats_watch(&self) -> watch::Receiver<SessionStats> {
        self.stats_tx.subscribe()
    }

    /// Fresh per-connection state: empty queues, Idle turn, nothing awaited.
    /// Latency windows and counters keep accumulating for the final report.
    pub fn reset_for_connection(&mut self) {
        self.audio_queue.clear();
        self.video_queue.clear();
        self.turn.reset();
        self.capture_window = CaptureWindow::default();
        self.stall.clear();
        self.counters.connections += 1;
        self.publish_stats();
    }

    pub(super) fn record_mid_session_failure(&mut self) {
        self.counters.mid_session_failures += 1;
    }

    /// Apply a control event and return the resulting turn phase.
    ///
    /// Events that belong to the other control mode are ignored.
    pub fn apply_control(&mut self, event: ControlEvent) -> TurnPhase {
        let transition = match (self.mode, event) {
            (ControlMode::Toggle, ControlEvent::Toggle) => self.turn.toggle(),
            (ControlMode::PushToTalk, ControlEvent::PttPress) => self.turn.begin(),
            (ControlMode::PushToTalk, ControlEvent::PttRelease) => self.turn.end(),
            (_, ControlEvent::Shutdown) => TurnTransition::Ignored,
            (mode, event) => {
                debug!("Ignoring {:?} in {} mode", event, mode);
                TurnTransition::Ignored
            }
        };

        let now = Instant::now();
        match transition {
            TurnTransition::Started(turn_id) => {
                self.capture_window = CaptureWindow {
                    opened_at: Some(now),
                    closed_at: None,
                };
                // Hard cut: stale backlog from before the turn is discarded
                let audio = self.audio_queue.clear();
                let video = self.video_queue.clear();
                if audio > 0 || video > 0 {
                    info!(
                        "Cleared backlog on turn start: {} audio chunks, {} frames",
                        audio, video
                    );
                }
                info!("Turn {} started ({})", turn_id, self.mode);
            }
            TurnTransition::Closing {
                turn_id,
                chunks_sent,
                silence_chunks,
            } => {
                self.capture_window.closed_at = Some(now);
                self.stall.mark_turn_end(now);
                info!(
                    "Turn {} closing after {} chunks, padding {} silence chunks",
                    turn_id, chunks_sent, silence_chunks
                );
            }
            TurnTransition::EndedEmpty(turn_id) => {
                self.capture_window.closed_at = Some(now);
                warn!("Turn {} ended without any audio sent", turn_id);
            }
            TurnTransition::Ignored => {}
        }

        self.publish_stats();
        self.turn.phase()
    }

    /// Queue a microphone chunk captured during the current turn.
    ///
    /// Acceptance depends on the capture instant, not the arrival instant:
    /// chunks recorded before a release or mute are still sent while the
    /// turn is Closing, chunks recorded outside the turn are ignored.
    pub fn deposit_audio(&mut self, payload: TimestampedPayload) {
        if !self.accepts_capture(payload.timestamp()) {
            trace!("Ignoring microphone chunk captured outside the turn");
            return;
        }

        if let Some(dropped) = self.audio_queue.try_deposit(payload) {
            warn!(
                "Audio queue full - dropped oldest chunk (age: {:.0}ms, total drops: {})",
                dropped.age_ms(),
                self.audio_queue.drop_count()
            );
        }
    }

    fn accepts_capture(&self, captured_at: Instant) -> bool {
        let Some(opened_at) = self.capture_window.opened_at else {
            return false;
        };
        if captured_at < opened_at {
            return false;
        }

        match self.turn.phase() {
            TurnPhase::Active => true,
            TurnPhase::Closing => self
                .capture_window
                .closed_at
                .is_some_and(|closed_at| captured_at < closed_at),
            TurnPhase::Idle => false,
        }
    }

    /// Queue a screen frame (latest only) and let the cadence controller
    /// observe it
    pub fn deposit_video(&mut self, payload: TimestampedPayload) {
        if let Some(dropped) = self.video_queue.try_deposit(payload) {
            debug!(
                "Replaced unsent frame (age: {:.0}ms, total drops: {})",
                dropped.age_ms(),
                self.video_queue.drop_count()
            );
        }

        let mean = self.latency.avg_screen_ms();
        match self.rate.observe_frame(mean) {
            Some(RateAdjustment::Decreased(fps)) => {
                warn!("Screen FPS reduced to {} (latency: {:.0}ms)", fps, mean);
                self.fps_tx.send_replace(fps);
            }
            Some(RateAdjustment::Increased(fps)) => {
                info!("Screen FPS increased to {}", fps);
                self.fps_tx.send_replace(fps);
            }
            None => {}
        }
    }

    /// Stall detector check. A fatal stall is returned as an error.
    pub fn check_stall(&mut self, now: Instant) -> Result<StallStatus> {
        let turn_id = self.turn.last_turn_id().cloned();
        let status = self.stall.check(now, turn_id.is_some());

        match status {
            StallStatus::Warning(wait) => {
                if let Some(turn_id) = &turn_id {
                    warn!(
                        "Waiting for response: {:.1}s since turn {}",
                        wait.as_secs_f64(),
                        turn_id
                    );
                }
            }
            StallStatus::Stalled(wait) => {
                error!("Stall detected after {:.1}s", wait.as_secs_f64());
                self.log_stats();
                return Err(SessionError::Stall {
                    turn_id: turn_id.map(|t| t.to_string()).unwrap_or_default(),
                    waited: wait,
                });
            }
            StallStatus::Idle | StallStatus::Waiting(_) => {}
        }

        Ok(status)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            started_at: self.started_at,
            mode: self.mode.label().to_string(),
            connections: self.counters.connections,
            mid_session_failures: self.counters.mid_session_failures,
            turn_phase: self.turn.phase(),
            turn_id: self.turn.last_turn_id().map(|t| t.as_str().to_string()),
            audio_chunks_sent: self.counters.audio_chunks_sent,
            silence_chunks_sent: self.counters.silence_chunks_sent,
            screen_frames_sent: self.counters.screen_frames_sent,
            audio_drops: self.audio_queue.drop_count(),
            screen_drops: self.video_queue.drop_count(),
            response_audio_chunks: self.counters.response_audio_chunks,
            model_turns_completed: self.counters.model_turns_completed,
            latency: self.latency.snapshot(),
            screen_fps: self.rate.current_fps(),
        }
    }

    pub fn publish_stats(&self) {
        self.stats_tx.send_replace(self.stats());
    }

    pub fn log_stats(&self) {
        let latency = self.latency.snapshot();
        info!(
            "Latency stats - Audio: {:.1}ms, Screen: {:.1}ms, Response: {:.1}ms",
            latency.audio_send_ms, latency.screen_send_ms, latency.response_ms
        );
        info!(
            "Drops - Audio: {}, Screen: {}",
            self.audio_queue.drop_count(),
            self.video_queue.drop_count()
        );
    }
}

fn placeholder_stats(mode: ControlMode) -> SessionStats {
    SessionStats {
        started_at: Utc::now(),
        mode: mode.label().to_string(),
        connections: 0,
        mid_session_failures: 0,
        turn_phase: TurnPhase::Idle,
        turn_id: None,
        audio_chunks_sent: 0,
        silence_chunks_sent: 0,
        screen_frames_sent: 0,
        audio_drops: 0,
        screen_drops: 0,
        response_audio_chunks: 0,
        model_turns_completed: 0,
        latency: Default::default(),
        screen_fps: 0,
    }
}
