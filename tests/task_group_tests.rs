use live_guide::error::{SessionError, TransportError};
use live_guide::session::TaskGroup;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn faulty_unit() -> live_guide::Result<()> {
    panic!("device driver bug")
}

#[tokio::test]
async fn test_first_failure_reports_failing_unit() {
    let parent = CancellationToken::new();
    let mut group = TaskGroup::new(&parent);

    group.spawn("finishes", async { Ok(()) });
    group.spawn("fails", async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err(SessionError::Transport(TransportError::Closed))
    });
    group.spawn("runs_forever", std::future::pending());
    assert_eq!(group.len(), 3);

    let error = tokio::time::timeout(Duration::from_secs(5), group.first_failure())
        .await
        .unwrap();
    assert!(matches!(error, SessionError::Transport(TransportError::Closed)));

    group.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_first_failure_pends_while_units_are_healthy() {
    let parent = CancellationToken::new();
    let mut group = TaskGroup::new(&parent);
    group.spawn("runs_forever", std::future::pending());
    group.spawn("finishes", async { Ok(()) });

    let waited = tokio::time::timeout(Duration::from_millis(100), group.first_failure()).await;
    assert!(waited.is_err());
}

#[tokio::test]
async fn test_panicking_unit_is_reported() {
    let parent = CancellationToken::new();
    let mut group = TaskGroup::new(&parent);
    group.spawn("panics", faulty_unit());

    let error = group.first_failure().await;
    assert!(matches!(error, SessionError::TaskPanicked(_)));
}

#[tokio::test]
async fn test_parent_cancellation_stops_units() {
    let parent = CancellationToken::new();
    let mut group = TaskGroup::new(&parent);
    let token = group.token();
    group.spawn("runs_forever", std::future::pending());

    parent.cancel();
    assert!(token.is_cancelled());

    // Cancelled units exit cleanly, so no failure is ever reported
    let waited = tokio::time::timeout(Duration::from_millis(100), group.first_failure()).await;
    assert!(waited.is_err());
    assert!(group.is_empty());
}

#[tokio::test]
async fn test_shutdown_joins_all_units() {
    let parent = CancellationToken::new();
    let mut group = TaskGroup::new(&parent);
    for _ in 0..3 {
        group.spawn("runs_forever", std::future::pending());
    }

    tokio::time::timeout(Duration::from_secs(5), group.shutdown(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(!parent.is_cancelled());
}
