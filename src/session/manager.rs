use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::config::{ControlMode, SessionConfig};
use super::control::{control_channel, ControlEvent, ControlMessage, ControlSender};
use super::stats::SessionStats;
use super::supervisor::SessionSupervisor;
use super::turn::TurnPhase;
use crate::devices::DeviceProvider;
use crate::error::{ControlConflict, Result};
use crate::hotkey::{self, HotkeySource, HotkeyTarget};
use crate::transport::Transport;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const ACK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ControlReply {
    pub message: String,
    pub is_running: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_running: bool,
    pub mode: Option<String>,
}

struct RunningSession {
    mode: ControlMode,
    control_tx: ControlSender,
    shutdown: CancellationToken,
    stats_rx: watch::Receiver<SessionStats>,
    handle: JoinHandle<Result<SessionStats>>,
}

impl RunningSession {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Owns the single in-flight session for the control surface
pub struct SessionManager {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    devices: Arc<dyn DeviceProvider>,
    hotkey_target: watch::Sender<Option<HotkeyTarget>>,
    current: Mutex<Option<RunningSession>>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        devices: Arc<dyn DeviceProvider>,
    ) -> Self {
        Self {
            config,
            transport,
            devices,
            hotkey_target: watch::channel(None).0,
            current: Mutex::new(None),
        }
    }

    /// Route hotkeys from `source` to whichever session is running.
    ///
    /// A single listener thread serves every session the manager starts.
    pub fn with_hotkeys(self, source: Box<dyn HotkeySource>) -> Self {
        if let Err(e) = hotkey::spawn_router(source, self.hotkey_target.subscribe()) {
            warn!("Hotkeys unavailable: {}", e);
        }
        self
    }

    pub async fn start(&self, push_to_talk: bool) -> std::result::Result<ControlReply, ControlConflict> {
        let mut current = self.current.lock().await;
        self.reap_finished(&mut current);
        if current.is_some() {
            return Err(ControlConflict::AlreadyRunning);
        }

        let mode = ControlMode::from_push_to_talk(push_to_talk);
        let (control_tx, control_rx) = control_channel();
        let shutdown = CancellationToken::new();

        let supervisor = SessionSupervisor::new(
            self.config.clone(),
            mode,
            Arc::clone(&self.transport),
            Arc::clone(&self.devices),
            control_rx,
            shutdown.clone(),
        );
        let stats_rx = supervisor.stats_watch();

        if self.hotkey_target.receiver_count() > 0 {
            hotkey::log_key_map(mode);
        }
        self.hotkey_target.send_replace(Some(HotkeyTarget {
            mode,
            control_tx: control_tx.clone(),
            shutdown: shutdown.clone(),
        }));

        let handle = tokio::spawn(async move {
            let result = supervisor.run().await;
            if let Err(e) = &result {
                error!("Session ended with error: {}", e);
            }
            result
        });

        info!("Session started in {} mode", mode);

        *current = Some(RunningSession {
            mode,
            control_tx,
            shutdown,
            stats_rx,
            handle,
        });

        Ok(ControlReply {
            message: format!(
                "Session started in {} mode. Use the talk key to control the mic, quit key to stop.",
                mode
            ),
            is_running: true,
        })
    }

    pub async fn stop(&self) -> std::result::Result<ControlReply, ControlConflict> {
        let mut current = self.current.lock().await;
        self.reap_finished(&mut current);
        let Some(session) = current.take() else {
            return Err(ControlConflict::NotRunning);
        };
        self.hotkey_target.send_replace(None);

        session.shutdown.cancel();
        let mut handle = session.handle;
        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(Ok(Ok(stats))) => info!(
                "Session stopped ({} audio chunks, {} frames sent)",
                stats.audio_chunks_sent, stats.screen_frames_sent
            ),
            Ok(Ok(Err(e))) => warn!("Session stopped with error: {}", e),
            Ok(Err(e)) => error!("Session task failed: {}", e),
            Err(_) => {
                warn!("Session did not stop within {:?}; aborting", STOP_TIMEOUT);
                handle.abort();
            }
        }

        Ok(ControlReply {
            message: "Session stopped successfully".to_string(),
            is_running: false,
        })
    }

    pub async fn status(&self) -> SessionStatus {
        let mut current = self.current.lock().await;
        self.reap_finished(&mut current);

        match current.as_ref() {
            Some(session) => SessionStatus {
                is_running: true,
                mode: Some(session.mode.label().to_string()),
            },
            None => SessionStatus {
                is_running: false,
                mode: None,
            },
        }
    }

    pub async fn toggle_mute(&self) -> std::result::Result<ControlReply, ControlConflict> {
        let control_tx = {
            let mut current = self.current.lock().await;
            self.reap_finished(&mut current);
            let Some(session) = current.as_ref() else {
                return Err(ControlConflict::NotRunning);
            };
            if session.mode == ControlMode::PushToTalk {
                return Err(ControlConflict::WrongMode);
            }
            session.control_tx.clone()
        };

        let (message, ack) = ControlMessage::with_ack(ControlEvent::Toggle);
        if control_tx.send(message).await.is_err() {
            return Err(ControlConflict::NotRunning);
        }

        let message = match tokio::time::timeout(ACK_TIMEOUT, ack).await {
            Ok(Ok(TurnPhase::Active)) => "Microphone unmuted",
            Ok(Ok(_)) => "Microphone muted",
            // Not connected right now; applied once the session reconnects
            _ => "Mute toggle queued",
        };

        Ok(ControlReply {
            message: message.to_string(),
            is_running: true,
        })
    }

    /// Latest statistics of the running session
    pub async fn stats(&self) -> Option<SessionStats> {
        let mut current = self.current.lock().await;
        self.reap_finished(&mut current);
        current.as_ref().map(|session| session.stats_rx.borrow().clone())
    }

    /// Forget a session whose supervisor already exited on its own
    fn reap_finished(&self, current: &mut Option<RunningSession>) {
        if current.as_ref().is_some_and(RunningSession::is_finished) {
            info!("Previous session has ended");
            *current = None;
            self.hotkey_target.send_replace(None);
        }
    }
}
