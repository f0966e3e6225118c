//! Connection lifecycle: connect, run the pipeline, reconnect or terminate.

use futures::stream::{BoxStream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::{ControlMode, SessionConfig};
use super::control::{ControlEvent, ControlMessage, ControlReceiver};
use super::coordinator::{PlaybackSender, SessionCoordinator};
use super::payload::TimestampedPayload;
use super::reconnect::{ReconnectDecision, ReconnectPolicy};
use super::stats::SessionStats;
use super::task_group::TaskGroup;
use super::units;
use crate::audio::AudioFormat;
use crate::devices::DeviceProvider;
use crate::error::{Result, SessionError, TransportError};
use crate::transport::{InboundEvent, Transport, TransportSession};

const UNIT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
/// Turn events held while disconnected
const MAX_DEFERRED_CONTROL: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    Connected,
    Terminated,
}

/// How a connection ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionExit {
    Shutdown,
}

pub struct SessionSupervisor {
    coordinator: SessionCoordinator,
    transport: Arc<dyn Transport>,
    devices: Arc<dyn DeviceProvider>,
    control_rx: ControlReceiver,
    deferred_control: Vec<ControlMessage>,
    shutdown: CancellationToken,
    reconnect: ReconnectPolicy,
    state_tx: watch::Sender<SupervisorState>,
}

impl SessionSupervisor {
    pub fn new(
        config: SessionConfig,
        mode: ControlMode,
        transport: Arc<dyn Transport>,
        devices: Arc<dyn DeviceProvider>,
        control_rx: ControlReceiver,
        shutdown: CancellationToken,
    ) -> Self {
        let reconnect = ReconnectPolicy::new(config.max_reconnect_attempts, config.max_backoff());
        let (state_tx, _) = watch::channel(SupervisorState::Disconnected);

        Self {
            coordinator: SessionCoordinator::new(config, mode),
            transport,
            devices,
            control_rx,
            deferred_control: Vec::new(),
            shutdown,
            reconnect,
            state_tx,
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state_tx.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<SupervisorState> {
        self.state_tx.subscribe()
    }

    pub fn stats_watch(&self) -> watch::Receiver<SessionStats> {
        self.coordinator.stats_watch()
    }

    fn set_state(&self, state: SupervisorState) {
        debug!("Supervisor state: {:?}", state);
        self.state_tx.send_replace(state);
    }

    /// Run until shutdown or until connect attempts are exhausted.
    ///
    /// Returns the final aggregate statistics.
    pub async fn run(mut self) -> Result<SessionStats> {
        let model = self.coordinator.config().model.clone();

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            self.set_state(SupervisorState::Connecting);
            info!(
                "Connecting to {} (attempt {})",
                model,
                self.reconnect.attempt_count() + 1
            );

            let connected = until_shutdown(
                &self.shutdown,
                &mut self.control_rx,
                &mut self.deferred_control,
                self.transport.connect(&model),
            )
            .await;
            let Some(connected) = connected else {
                break;
            };

            match connected {
                Ok(session) => {
                    if self.reconnect.attempt_count() > 0 {
                        info!(
                            "Reconnected successfully after {} attempts",
                            self.reconnect.attempt_count()
                        );
                    }
                    self.reconnect.on_connected();
                    self.set_state(SupervisorState::Connected);

                    match self.run_connection(session).await {
                        Ok(ConnectionExit::Shutdown) => break,
                        Err(e) => {
                            error!("Session error: {}. Reconnecting", e);
                            self.coordinator.record_mid_session_failure();
                            self.set_state(SupervisorState::Disconnected);
                        }
                    }
                }
                Err(e) => {
                    error!("Connection failed: {}", e);
                    self.set_state(SupervisorState::Disconnected);

                    match self.reconnect.on_connect_failure() {
                        ReconnectDecision::Retry { attempt, backoff } => {
                            info!(
                                "Reconnecting in {:?}... ({}/{})",
                                backoff,
                                attempt,
                                self.reconnect.max_attempts()
                            );
                            let slept = until_shutdown(
                                &self.shutdown,
                                &mut self.control_rx,
                                &mut self.deferred_control,
                                tokio::time::sleep(backoff),
                            )
                            .await;
                            if slept.is_none() {
                                break;
                            }
                        }
                        ReconnectDecision::GiveUp { .. } => {
                            error!(
                                "Max reconnect attempts ({}) reached. Giving up.",
                                self.reconnect.max_attempts()
                            );
                            self.finish();
                            return Err(SessionError::ReconnectExhausted {
                                attempts: self.reconnect.max_attempts(),
                                last: e,
                            });
                        }
                    }
                }
            }
        }

        Ok(self.finish())
    }

    fn finish(&self) -> SessionStats {
        self.set_state(SupervisorState::Terminated);
        self.coordinator.publish_stats();
        info!("Final statistics");
        self.coordinator.log_stats();
        self.coordinator.stats()
    }

    async fn run_connection(
        &mut self,
        session: Box<dyn TransportSession>,
    ) -> Result<ConnectionExit> {
        let session: Arc<dyn TransportSession> = Arc::from(session);
        self.coordinator.reset_for_connection();
        for message in std::mem::take(&mut self.deferred_control) {
            apply_message(&mut self.coordinator, message);
        }

        let config = self.coordinator.config().clone();
        let (audio_tx, audio_rx) = mpsc::channel(config.audio_queue_capacity.max(1));
        let (video_tx, video_rx) = mpsc::channel(1);
        let (playback_tx, playback_rx) = mpsc::unbounded_channel();

        let mut group = TaskGroup::new(&self.shutdown);
        group.spawn(
            "listen_audio",
            units::capture_audio(
                Arc::clone(&self.devices),
                AudioFormat::new(config.send_sample_rate, config.chunk_samples),
                audio_tx,
                config.device_retry_delay(),
            ),
        );
        group.spawn(
            "capture_screen",
            units::capture_screen(
                Arc::clone(&self.devices),
                video_tx,
                self.coordinator.fps_watch(),
                config.device_retry_delay(),
            ),
        );
        group.spawn(
            "play_audio",
            units::play_audio(
                Arc::clone(&self.devices),
                AudioFormat::new(config.receive_sample_rate, config.chunk_samples),
                playback_rx,
                config.device_retry_delay(),
            ),
        );

        let links = ConnectionLinks {
            inbound: session.receive(),
            audio_rx,
            video_rx,
            playback_tx,
        };

        let result = tokio::select! {
            result = drive(
                &mut self.coordinator,
                session.as_ref(),
                &mut self.control_rx,
                links,
                &self.shutdown,
            ) => result,
            e = group.first_failure() => Err(e),
        };

        group.shutdown(UNIT_SHUTDOWN_GRACE).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close transport session: {}", e);
        }

        result
    }
}

fn apply_message(coordinator: &mut SessionCoordinator, message: ControlMessage) {
    let phase = coordinator.apply_control(message.event);
    if let Some(ack) = message.ack {
        let _ = ack.send(phase);
    }
}

/// Await `fut` while disconnected, still honouring shutdown requests from
/// the token or the control channel. Returns `None` on shutdown.
///
/// Turn events are held in `deferred` and applied once connected.
async fn until_shutdown<F: Future>(
    shutdown: &CancellationToken,
    control_rx: &mut ControlReceiver,
    deferred: &mut Vec<ControlMessage>,
    fut: F,
) -> Option<F::Output> {
    tokio::pin!(fut);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => return None,

            Some(message) = control_rx.recv() => {
                if message.event == ControlEvent::Shutdown {
                    info!("Shutdown requested while disconnected");
                    shutdown.cancel();
                    return None;
                }
                if deferred.len() >= MAX_DEFERRED_CONTROL {
                    warn!(
                        "Too many control events while disconnected; dropping {:?}",
                        message.event
                    );
                } else {
                    debug!("Not connected; deferring {:?}", message.event);
                    deferred.push(message);
                }
            }

            output = &mut fut => return Some(output),
        }
    }
}

struct ConnectionLinks {
    inbound: BoxStream<'static, std::result::Result<InboundEvent, TransportError>>,
    audio_rx: mpsc::Receiver<TimestampedPayload>,
    video_rx: mpsc::Receiver<TimestampedPayload>,
    playback_tx: PlaybackSender,
}

/// The coordinator's scheduling loop for one connection: the only place
/// session state is mutated while connected
async fn drive(
    coordinator: &mut SessionCoordinator,
    session: &dyn TransportSession,
    control_rx: &mut ControlReceiver,
    mut links: ConnectionLinks,
    shutdown: &CancellationToken,
) -> Result<ConnectionExit> {
    let mut egress = tokio::time::interval(coordinator.config().egress_tick());
    egress.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stall_poll = coordinator.config().stall_poll_interval();
    let mut stall = tokio::time::interval_at(Instant::now() + stall_poll, stall_poll);
    stall.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Connected! Mode: {}", coordinator.mode());

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => return Ok(ConnectionExit::Shutdown),

            Some(message) = control_rx.recv() => {
                if message.event == ControlEvent::Shutdown {
                    info!("Shutdown requested");
                    shutdown.cancel();
                    return Ok(ConnectionExit::Shutdown);
                }
                apply_message(coordinator, message);
            }

            inbound = links.inbound.next() => match inbound {
                Some(Ok(event)) => coordinator.handle_inbound(event, &links.playback_tx),
                Some(Err(e)) => {
                    error!("Receive error: {}", e);
                    return Err(e.into());
                }
                None => return Err(TransportError::Closed.into()),
            },

            Some(chunk) = links.audio_rx.recv() => coordinator.deposit_audio(chunk),

            Some(frame) = links.video_rx.recv() => coordinator.deposit_video(frame),

            _ = egress.tick() => {
                coordinator.egress_tick(session).await?;
            }

            _ = stall.tick() => {
                coordinator.check_stall(Instant::now())?;
            }
        }
    }
}
