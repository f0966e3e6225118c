//! NATS relay transport
//!
//! Bridges the session to an external relay process that speaks the remote
//! model's protocol. Subjects, for prefix `live` and session `<id>`:
//! - `live.connect` - request/reply handshake
//! - `live.<id>.out` - realtime media to the model
//! - `live.<id>.in` - model output
//! - `live.<id>.close` - session closed

use async_nats::Client;
use async_trait::async_trait;
use base64::Engine;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::messages::{
    CloseMessage, ConnectReply, ConnectRequest, ContentPart, MediaFrameMessage,
    ServerContentMessage,
};
use super::{InboundEvent, OutboundMedia, Transport, TransportSession};
use crate::error::TransportError;

pub struct NatsTransport {
    url: String,
    subject_prefix: String,
}

impl NatsTransport {
    pub fn new(url: impl Into<String>, subject_prefix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subject_prefix: subject_prefix.into(),
        }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn connect(&self, model: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        info!("Connecting to NATS relay at {}", self.url);

        let client = async_nats::connect(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let request = ConnectRequest {
            session_id: session_id.clone(),
            model: model.to_string(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| TransportError::Connect(e.to_string()))?;

        let reply = client
            .request(format!("{}.connect", self.subject_prefix), payload.into())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let reply: ConnectReply = serde_json::from_slice(&reply.payload)
            .map_err(|e| TransportError::Connect(format!("invalid connect reply: {}", e)))?;

        if !reply.accepted {
            return Err(TransportError::Connect(
                reply.error.unwrap_or_else(|| "relay rejected session".to_string()),
            ));
        }

        // Subscribe before returning so no early model output is missed
        let inbound = client
            .subscribe(format!("{}.{}.in", self.subject_prefix, session_id))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!("Relay accepted session {} (model {})", session_id, model);

        Ok(Box::new(NatsSession {
            client,
            prefix: self.subject_prefix.clone(),
            session_id,
            sequence: AtomicU64::new(0),
            inbound: Mutex::new(Some(inbound)),
        }))
    }
}

struct NatsSession {
    client: Client,
    prefix: String,
    session_id: String,
    sequence: AtomicU64,
    inbound: Mutex<Option<async_nats::Subscriber>>,
}

#[async_trait]
impl TransportSession for NatsSession {
    async fn send(&self, media: OutboundMedia) -> Result<(), TransportError> {
        let message = MediaFrameMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            kind: media.kind.as_str().to_string(),
            mime_type: media.mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(&media.data),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message).map_err(|e| TransportError::Send(e.to_string()))?;

        self.client
            .publish(format!("{}.{}.out", self.prefix, self.session_id), payload.into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        debug!(
            "Published {} ({} bytes, seq={})",
            message.kind,
            media.data.len(),
            message.sequence
        );

        Ok(())
    }

    fn receive(&self) -> BoxStream<'static, Result<InboundEvent, TransportError>> {
        let subscriber = match self.inbound.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };

        let Some(subscriber) = subscriber else {
            return stream::once(async { Err(TransportError::Closed) }).boxed();
        };

        let session_id = self.session_id.clone();
        subscriber
            .flat_map(move |msg| stream::iter(decode_server_content(&session_id, &msg.payload)))
            .boxed()
    }

    async fn close(&self) -> Result<(), TransportError> {
        info!("Closing relay session {}", self.session_id);

        let message = CloseMessage {
            session_id: self.session_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&message).map_err(|e| TransportError::Send(e.to_string()))?;

        self.client
            .publish(format!("{}.{}.close", self.prefix, self.session_id), payload.into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Decode one relay message into inbound events, in part order, with the
/// turn-complete marker last
pub fn decode_server_content(
    session_id: &str,
    payload: &[u8],
) -> Vec<Result<InboundEvent, TransportError>> {
    let message: ServerContentMessage = match serde_json::from_slice(payload) {
        Ok(message) => message,
        Err(e) => {
            return vec![Err(TransportError::Receive(format!(
                "malformed server content: {}",
                e
            )))]
        }
    };

    if message.session_id != session_id {
        return Vec::new();
    }

    if message.parts.is_empty() && !message.turn_complete {
        return vec![Ok(InboundEvent::Empty)];
    }

    let mut events = Vec::with_capacity(message.parts.len() + 1);
    for part in message.parts {
        match part {
            ContentPart::Audio { data } => {
                match base64::engine::general_purpose::STANDARD.decode(data.as_bytes()) {
                    Ok(pcm) => events.push(Ok(InboundEvent::Audio(pcm))),
                    Err(e) => warn!("Skipping undecodable audio part: {}", e),
                }
            }
            ContentPart::Text { text } => events.push(Ok(InboundEvent::Text(text))),
        }
    }

    if message.turn_complete {
        events.push(Ok(InboundEvent::TurnComplete));
    }

    events
}
