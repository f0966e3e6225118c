//! HTTP control surface for the live session
//!
//! - POST /start - Start a session (toggle or push-to-talk)
//! - POST /stop - Stop the running session
//! - GET /status - Whether a session is running and in which mode
//! - POST /toggle-mute - Toggle the microphone (toggle mode only)
//! - GET /stats - Counters and latency of the running session
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, StartRequest};
pub use routes::create_router;
pub use state::AppState;
