// Connection supervision: backoff, mid-session reconnect, shutdown.

use live_guide::error::{SessionError, TransportError};
use live_guide::session::{
    control_channel, ControlEvent, ControlMessage, ControlMode, SessionConfig, SessionSupervisor,
    SupervisorState, TurnPhase,
};
use live_guide::hotkey::{spawn_listener, HotkeyTarget, LineHotkeys};
use live_guide::transport::{InboundEvent, MediaKind};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mod common;
use common::{fast_config, wait_until, FakeDevices, FakeTransport};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_connect_failures() {
    let transport = FakeTransport::always_failing();
    let (_control_tx, control_rx) = control_channel();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        CancellationToken::new(),
    );
    let state = supervisor.state_watch();

    let started = Instant::now();
    let result = supervisor.run().await;

    match result {
        Err(SessionError::ReconnectExhausted { attempts, last }) => {
            assert_eq!(attempts, 5);
            assert!(matches!(last, TransportError::Connect(_)));
        }
        other => panic!("expected ReconnectExhausted, got {:?}", other),
    }
    // Initial attempt plus five retries
    assert_eq!(transport.connects(), 6);
    // 2 + 4 + 8 + 16 + 30 seconds of backoff
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(*state.borrow(), SupervisorState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_transient_connect_failures() {
    let transport = FakeTransport::failing_first(2);
    let (_control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let mut state = supervisor.state_watch();
    let handle = tokio::spawn(supervisor.run());

    state
        .wait_for(|s| *s == SupervisorState::Connected)
        .await
        .unwrap();
    assert_eq!(transport.connects(), 3);

    shutdown.cancel();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.connections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_request_during_backoff_exits_without_retry() {
    let transport = FakeTransport::always_failing();
    let (control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let started = Instant::now();
    let handle = tokio::spawn(supervisor.run());

    // Second attempt failed at 2s; now waiting 4s before the third
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(transport.connects(), 2);

    control_tx
        .send(ControlMessage::from(ControlEvent::Shutdown))
        .await
        .unwrap();

    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.connections, 0);
    assert_eq!(transport.connects(), 2);
    assert!(started.elapsed() < Duration::from_secs(6));
    assert!(shutdown.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_quit_hotkey_before_connect_exits_without_retry() {
    let transport = FakeTransport::always_failing();
    let (control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let target = HotkeyTarget {
        mode: ControlMode::Toggle,
        control_tx,
        shutdown: shutdown.clone(),
    };
    spawn_listener(Box::new(LineHotkeys::new(Cursor::new("q\n"))), target)
        .unwrap()
        .join()
        .unwrap();
    assert!(shutdown.is_cancelled());

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown,
    );

    let result = supervisor.run().await;
    assert!(result.is_ok());
    assert_eq!(transport.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_while_connecting_applies_after_connect() {
    let transport = FakeTransport::failing_first(1);
    let (control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let mut stats_rx = supervisor.stats_watch();
    let handle = tokio::spawn(supervisor.run());

    let (message, ack) = ControlMessage::with_ack(ControlEvent::Toggle);
    control_tx.send(message).await.unwrap();
    assert_eq!(ack.await.unwrap(), TurnPhase::Active);

    stats_rx
        .wait_for(|stats| stats.connections == 1 && stats.turn_phase == TurnPhase::Active)
        .await
        .unwrap();
    assert_eq!(transport.connects(), 2);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_token_ends_session_cleanly() {
    let transport = FakeTransport::healthy();
    let (_control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let mut state = supervisor.state_watch();
    let handle = tokio::spawn(supervisor.run());

    state
        .wait_for(|s| *s == SupervisorState::Connected)
        .await
        .unwrap();
    shutdown.cancel();

    let stats = tokio::time::timeout(WAIT, handle)
        .await
        .expect("supervisor did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(stats.connections, 1);
    assert_eq!(stats.mid_session_failures, 0);
    assert_eq!(transport.connects(), 1);
    assert_eq!(*state.borrow(), SupervisorState::Terminated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_control_event_ends_session() {
    let transport = FakeTransport::healthy();
    let (control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::PushToTalk,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let handle = tokio::spawn(supervisor.run());

    control_tx
        .send(ControlMessage::from(ControlEvent::Shutdown))
        .await
        .unwrap();

    let result = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(shutdown.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_inbound_stream_end_reconnects_immediately() {
    let transport = FakeTransport::healthy();
    let (_control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let mut state = supervisor.state_watch();
    let handle = tokio::spawn(supervisor.run());

    state
        .wait_for(|s| *s == SupervisorState::Connected)
        .await
        .unwrap();

    transport.drop_inbound();

    assert!(wait_until(WAIT, || transport.connects() == 2).await);
    state
        .wait_for(|s| *s == SupervisorState::Connected)
        .await
        .unwrap();

    shutdown.cancel();
    let stats = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap().unwrap();

    assert_eq!(stats.connections, 2);
    assert_eq!(stats.mid_session_failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_turn_streams_audio_then_silence() {
    let transport = FakeTransport::healthy();
    let (control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let config = SessionConfig {
        stats_every_ticks: 5,
        ..fast_config()
    };
    let supervisor = SessionSupervisor::new(
        config,
        ControlMode::Toggle,
        transport.clone(),
        FakeDevices::new(),
        control_rx,
        shutdown.clone(),
    );
    let mut stats_rx = supervisor.stats_watch();
    let handle = tokio::spawn(supervisor.run());

    let (message, ack) = ControlMessage::with_ack(ControlEvent::Toggle);
    control_tx.send(message).await.unwrap();
    assert_eq!(ack.await.unwrap(), TurnPhase::Active);

    assert!(
        wait_until(WAIT, || {
            transport
                .sent()
                .iter()
                .any(|m| m.kind == MediaKind::Audio && m.data.iter().any(|b| *b != 0))
        })
        .await
    );

    let (message, ack) = ControlMessage::with_ack(ControlEvent::Toggle);
    control_tx.send(message).await.unwrap();
    assert_eq!(ack.await.unwrap(), TurnPhase::Closing);

    tokio::time::timeout(
        WAIT,
        stats_rx.wait_for(|stats| stats.turn_phase == TurnPhase::Idle && stats.silence_chunks_sent == 7),
    )
    .await
    .expect("silence padding not finished")
    .unwrap();

    shutdown.cancel();
    let stats = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap().unwrap();

    assert!(stats.audio_chunks_sent > 0);
    assert_eq!(stats.silence_chunks_sent, 7);

    let sent = transport.sent();
    let silence = sent
        .iter()
        .filter(|m| m.kind == MediaKind::Audio && m.data.iter().all(|b| *b == 0))
        .count();
    assert_eq!(silence, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_model_audio_reaches_speaker() {
    let transport = FakeTransport::healthy();
    let devices = FakeDevices::new();
    let (_control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        devices.clone(),
        control_rx,
        shutdown.clone(),
    );
    let mut state = supervisor.state_watch();
    let handle = tokio::spawn(supervisor.run());

    state
        .wait_for(|s| *s == SupervisorState::Connected)
        .await
        .unwrap();

    assert!(transport.push_inbound(InboundEvent::Audio(vec![1, 0, 2, 0])));
    assert!(transport.push_inbound(InboundEvent::Audio(vec![3, 0, 4, 0])));
    assert!(transport.push_inbound(InboundEvent::TurnComplete));

    assert!(wait_until(WAIT, || devices.played().len() == 2).await);
    assert_eq!(devices.played(), vec![vec![1, 0, 2, 0], vec![3, 0, 4, 0]]);

    shutdown.cancel();
    let stats = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.response_audio_chunks, 2);
    assert_eq!(stats.model_turns_completed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_microphone_failure_does_not_end_connection() {
    let transport = FakeTransport::healthy();
    let devices = FakeDevices::with_flaky_microphone(2);
    let (_control_tx, control_rx) = control_channel();
    let shutdown = CancellationToken::new();

    let supervisor = SessionSupervisor::new(
        fast_config(),
        ControlMode::Toggle,
        transport.clone(),
        devices.clone(),
        control_rx,
        shutdown.clone(),
    );
    let handle = tokio::spawn(supervisor.run());

    assert!(wait_until(WAIT, || devices.microphone_opens() >= 3).await);
    assert_eq!(transport.connects(), 1);

    shutdown.cancel();
    let stats = tokio::time::timeout(WAIT, handle).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.mid_session_failures, 0);
}
