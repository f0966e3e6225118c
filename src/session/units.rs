//! Device-facing pipeline units
//!
//! Each unit owns its device handle, runs blocking I/O on the blocking pool
//! and recovers from device errors locally by dropping the handle, waiting
//! and reopening. A closed channel means the connection is going away and the
//! unit exits cleanly.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::spawn_blocking;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::latency::frame_interval;
use super::payload::TimestampedPayload;
use crate::audio::AudioFormat;
use crate::devices::DeviceProvider;
use crate::error::{Result, SessionError};

fn join_failed(e: tokio::task::JoinError) -> SessionError {
    SessionError::TaskPanicked(e.to_string())
}

/// Microphone → audio channel
pub async fn capture_audio(
    devices: Arc<dyn DeviceProvider>,
    format: AudioFormat,
    audio_tx: mpsc::Sender<TimestampedPayload>,
    retry: Duration,
) -> Result<()> {
    loop {
        let provider = Arc::clone(&devices);
        let opened = spawn_blocking(move || provider.open_microphone(format))
            .await
            .map_err(join_failed)?;

        let mut microphone = match opened {
            Ok(microphone) => microphone,
            Err(e) => {
                warn!("Audio input error: {}. Reopening in {:?}", e, retry);
                tokio::time::sleep(retry).await;
                continue;
            }
        };
        info!("Microphone listening on {}", microphone.name());

        loop {
            let (returned, read) = spawn_blocking(move || {
                let read = microphone.read_chunk();
                (microphone, read)
            })
            .await
            .map_err(join_failed)?;
            microphone = returned;

            match read {
                Ok(chunk) => {
                    if audio_tx.send(TimestampedPayload::new(chunk)).await.is_err() {
                        debug!("Audio channel closed; microphone unit exiting");
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Audio input error: {}. Reopening in {:?}", e, retry);
                    break;
                }
            }
        }

        drop(microphone);
        tokio::time::sleep(retry).await;
    }
}

/// Screen → video channel, paced by the adaptive cadence
pub async fn capture_screen(
    devices: Arc<dyn DeviceProvider>,
    video_tx: mpsc::Sender<TimestampedPayload>,
    mut fps_rx: watch::Receiver<u32>,
    retry: Duration,
) -> Result<()> {
    loop {
        let provider = Arc::clone(&devices);
        let opened = spawn_blocking(move || provider.open_screen())
            .await
            .map_err(join_failed)?;

        let mut screen = match opened {
            Ok(screen) => screen,
            Err(e) => {
                warn!("Screen capture error: {}. Reopening in {:?}", e, retry);
                tokio::time::sleep(retry).await;
                continue;
            }
        };
        info!(
            "Screen capturing started on {} ({} fps)",
            screen.name(),
            *fps_rx.borrow()
        );

        loop {
            let started = Instant::now();

            let (returned, grabbed) = spawn_blocking(move || {
                let grabbed = screen.grab_jpeg();
                (screen, grabbed)
            })
            .await
            .map_err(join_failed)?;
            screen = returned;

            match grabbed {
                Ok(jpeg) => {
                    if video_tx.send(TimestampedPayload::new(jpeg)).await.is_err() {
                        debug!("Video channel closed; screen unit exiting");
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Screen capture error: {}. Reopening in {:?}", e, retry);
                    break;
                }
            }

            let interval = frame_interval(*fps_rx.borrow_and_update());
            tokio::time::sleep(interval.saturating_sub(started.elapsed())).await;
        }

        drop(screen);
        tokio::time::sleep(retry).await;
    }
}

/// Playback queue → speaker, strict FIFO
pub async fn play_audio(
    devices: Arc<dyn DeviceProvider>,
    format: AudioFormat,
    mut playback_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    retry: Duration,
) -> Result<()> {
    loop {
        let provider = Arc::clone(&devices);
        let opened = spawn_blocking(move || provider.open_speaker(format))
            .await
            .map_err(join_failed)?;

        let mut speaker = match opened {
            Ok(speaker) => speaker,
            Err(e) => {
                warn!("Audio output error: {}. Reopening in {:?}", e, retry);
                tokio::time::sleep(retry).await;
                continue;
            }
        };
        info!("Audio output ready on {}", speaker.name());

        loop {
            let Some(pcm) = playback_rx.recv().await else {
                debug!("Playback queue closed; speaker unit exiting");
                return Ok(());
            };

            let (returned, written) = spawn_blocking(move || {
                let written = speaker.write(&pcm);
                (speaker, written)
            })
            .await
            .map_err(join_failed)?;
            speaker = returned;

            if let Err(e) = written {
                warn!("Audio output error: {}. Reopening in {:?}", e, retry);
                break;
            }
        }

        drop(speaker);
        tokio::time::sleep(retry).await;
    }
}
