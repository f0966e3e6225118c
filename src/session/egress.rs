//! Egress scheduling: one tick drains the queues toward the transport.
//!
//! Audio always goes before video within a tick, and queued speech before
//! silence padding. Items older than their latency budget are discarded
//! instead of sent.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::coordinator::SessionCoordinator;
use crate::error::Result;
use crate::transport::{OutboundMedia, TransportSession};

/// What a single tick forwarded or discarded
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub silence_sent: bool,
    pub audio_sent: usize,
    pub audio_dropped: usize,
    pub frame_sent: bool,
    pub frame_dropped: bool,
}

impl SessionCoordinator {
    /// Run one egress tick against `session`.
    ///
    /// A transport send failure is returned as an error and ends the
    /// connection.
    pub async fn egress_tick(&mut self, session: &dyn TransportSession) -> Result<TickReport> {
        let mut report = TickReport::default();

        if self.turn.take_turn_end_request() {
            info!(
                "Turn {} ended - sending silence for VAD",
                self.turn
                    .last_turn_id()
                    .map(|t| t.to_string())
                    .unwrap_or_default()
            );
        }

        let budget = self.config.audio_max_backlog();
        for chunk in self.audio_queue.drain_available() {
            let age = chunk.age();
            if age > budget {
                self.audio_queue.record_drop();
                report.audio_dropped += 1;
                warn!(
                    "Audio drop (age: {:.0}ms > {}ms budget)",
                    age.as_secs_f64() * 1000.0,
                    self.config.audio_max_backlog_ms
                );
                continue;
            }

            let age_ms = chunk.age_ms();
            session.send(OutboundMedia::audio(chunk.into_data())).await?;
            self.latency.record_audio_send(age_ms);
            self.turn.record_chunk_sent();
            self.counters.audio_chunks_sent += 1;
            report.audio_sent += 1;
        }

        // Speech still queued from the closing turn goes out ahead of the padding
        if self.turn.pending_silence_chunks() > 0 {
            session
                .send(OutboundMedia::audio(self.silence_chunk.clone()))
                .await?;
            self.turn.take_silence_chunk();
            self.counters.silence_chunks_sent += 1;
            report.silence_sent = true;

            if self.turn.pending_silence_chunks() == 0 {
                info!("Silence sent - remote VAD should detect end of turn");
                self.publish_stats();
            }
        }

        if let Some(frame) = self.video_queue.pop() {
            let gate_open = !self.config.screen_only_during_turn || self.turn.is_active();
            let age = frame.age_at(Instant::now());

            if !gate_open {
                // Outside a turn; skipped without logging
            } else if age > self.config.screen_max_age() {
                self.video_queue.record_drop();
                report.frame_dropped = true;
                warn!(
                    "Screen drop (age: {:.0}ms > {}ms budget)",
                    age.as_secs_f64() * 1000.0,
                    self.config.screen_max_age_ms
                );
            } else {
                let age_ms = age.as_secs_f64() * 1000.0;
                session.send(OutboundMedia::image(frame.into_data())).await?;
                self.latency.record_screen_send(age_ms);
                self.counters.screen_frames_sent += 1;
                report.frame_sent = true;
                debug!("Frame sent - age: {:.0}ms", age_ms);
            }
        }

        self.counters.ticks += 1;
        if self.config.stats_every_ticks > 0 && self.counters.ticks % self.config.stats_every_ticks == 0 {
            self.log_stats();
            self.publish_stats();
        }

        Ok(report)
    }
}
