pub mod audio;
pub mod config;
pub mod devices;
pub mod error;
pub mod hotkey;
pub mod http;
pub mod screencapture;
pub mod session;
pub mod transport;

pub use audio::{AudioFormat, Microphone, Speaker, WavMicrophone, WavSpeaker};
pub use config::Config;
pub use devices::{DeviceProvider, FileDevices};
pub use error::{ControlConflict, DeviceError, Result, SessionError, TransportError};
pub use http::{create_router, AppState};
pub use screencapture::{ScreenGrabber, StillImageGrabber};
pub use session::{
    ControlEvent, ControlMode, SessionConfig, SessionCoordinator, SessionManager, SessionStats,
    SessionSupervisor,
};
pub use transport::{InboundEvent, NatsTransport, OutboundMedia, Transport, TransportSession};
