use serde::{Deserialize, Serialize};

/// Connect request published to the relay
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub session_id: String,
    pub model: String,
}

/// Relay answer to a connect request
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectReply {
    pub accepted: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Realtime media published to the relay
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaFrameMessage {
    pub session_id: String,
    pub sequence: u64,
    pub kind: String,
    pub mime_type: String,
    pub data: String, // Base64-encoded bytes
    pub timestamp: String, // RFC3339 timestamp
}

/// Model output relayed back to the session
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerContentMessage {
    pub session_id: String,
    #[serde(default)]
    pub parts: Vec<ContentPart>,
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Audio { data: String }, // Base64-encoded PCM16
    Text { text: String },
}

/// Published when the session closes its side
#[derive(Debug, Serialize, Deserialize)]
pub struct CloseMessage {
    pub session_id: String,
    pub timestamp: String,
}
