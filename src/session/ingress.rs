use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::coordinator::{PlaybackSender, SessionCoordinator};
use crate::transport::InboundEvent;

impl SessionCoordinator {
    /// Route one inbound event.
    ///
    /// The first model content after a turn end records the response
    /// latency and stops the stall watch.
    pub fn handle_inbound(&mut self, event: InboundEvent, playback: &PlaybackSender) {
        match event {
            InboundEvent::Empty => {
                debug!("Inbound message without content");
            }
            InboundEvent::Audio(pcm) => {
                self.record_first_response();
                debug!("Audio response: {} bytes", pcm.len());
                self.counters.response_audio_chunks += 1;
                if playback.send(pcm).is_err() {
                    warn!("Playback queue closed; dropping model audio");
                }
            }
            InboundEvent::Text(text) => {
                self.record_first_response();
                let preview: String = text.chars().take(100).collect();
                info!("Model text: {}", preview);
            }
            InboundEvent::TurnComplete => {
                info!("Model turn complete");
                self.counters.model_turns_completed += 1;
                self.stall.clear();
                self.publish_stats();
            }
        }
    }

    fn record_first_response(&mut self) {
        if let Some(since) = self.stall.awaiting_since() {
            let latency_ms = Instant::now().saturating_duration_since(since).as_secs_f64() * 1000.0;
            self.latency.record_response(latency_ms);
            self.stall.clear();
            info!("First response after {:.0}ms", latency_ms);
        }
    }
}
