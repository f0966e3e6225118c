//! Live session coordination
//!
//! This module provides the session coordinator and everything it owns:
//! - Bounded audio/video queues with drop policies
//! - The speaking-turn lifecycle (toggle and push-to-talk)
//! - Latency tracking and adaptive screen cadence
//! - Egress scheduling and ingress routing
//! - Stall detection, reconnect policy and the connection supervisor
//! - The session manager used by the control surface

mod config;
mod control;
mod coordinator;
mod egress;
mod ingress;
mod latency;
mod manager;
mod payload;
mod queue;
mod reconnect;
mod stall;
mod stats;
mod supervisor;
mod task_group;
mod turn;
pub mod units;

pub use config::{ControlMode, SessionConfig};
pub use control::{control_channel, ControlEvent, ControlMessage, ControlReceiver, ControlSender};
pub use coordinator::{PlaybackSender, SessionCoordinator};
pub use egress::TickReport;
pub use latency::{
    frame_interval, LatencySnapshot, LatencyStats, RateAdjustment, RateController, RollingWindow,
};
pub use manager::{ControlReply, SessionManager, SessionStatus};
pub use payload::TimestampedPayload;
pub use queue::{AudioQueue, BoundedQueue, DropPolicy, VideoQueue};
pub use reconnect::{ReconnectDecision, ReconnectPolicy};
pub use stall::{StallStatus, StallWatch};
pub use stats::SessionStats;
pub use supervisor::{SessionSupervisor, SupervisorState};
pub use task_group::TaskGroup;
pub use turn::{TurnId, TurnMachine, TurnPhase, TurnTransition};
