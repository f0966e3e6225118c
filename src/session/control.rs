use tokio::sync::{mpsc, oneshot};

use super::turn::TurnPhase;

/// Discrete control input for the turn lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Toggle-mode mute/unmute
    Toggle,
    /// Push-to-talk key went down
    PttPress,
    /// Push-to-talk key went up
    PttRelease,
    /// End the session without retry
    Shutdown,
}

/// Control event sent to the coordinator, with an optional acknowledgement
/// carrying the turn phase after the event was applied
#[derive(Debug)]
pub struct ControlMessage {
    pub event: ControlEvent,
    pub ack: Option<oneshot::Sender<TurnPhase>>,
}

impl ControlMessage {
    pub fn with_ack(event: ControlEvent) -> (Self, oneshot::Receiver<TurnPhase>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                event,
                ack: Some(tx),
            },
            rx,
        )
    }
}

impl From<ControlEvent> for ControlMessage {
    fn from(event: ControlEvent) -> Self {
        Self { event, ack: None }
    }
}

pub type ControlSender = mpsc::Sender<ControlMessage>;
pub type ControlReceiver = mpsc::Receiver<ControlMessage>;

/// Bounded control channel shared by the hotkey thread and the control surface
pub fn control_channel() -> (ControlSender, ControlReceiver) {
    mpsc::channel(64)
}
