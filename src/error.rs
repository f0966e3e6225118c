//! Error types for the live session coordinator

use std::time::Duration;
use thiserror::Error;

/// Errors that end a connection or the whole session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Capture device error: {0}")]
    CaptureDevice(#[from] DeviceError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session stalled after {:.1}s waiting on turn {turn_id}", .waited.as_secs_f64())]
    Stall { turn_id: String, waited: Duration },

    #[error("Max reconnect attempts ({attempts}) reached: {last}")]
    ReconnectExhausted { attempts: u32, last: TransportError },

    #[error("Task {0} panicked")]
    TaskPanicked(String),
}

/// Errors raised by the remote session transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Inbound stream closed")]
    Closed,
}

/// Microphone, speaker and screen capture errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Failed to open {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("I/O on {device} failed: {reason}")]
    Io { device: String, reason: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Rejections surfaced to the control surface, never fatal to a running session
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlConflict {
    #[error("A session is already running. Stop it first with POST /stop")]
    AlreadyRunning,

    #[error("No session is currently running")]
    NotRunning,

    #[error("Cannot toggle mute in Push-to-Talk mode. Use the talk hotkey instead.")]
    WrongMode,
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
