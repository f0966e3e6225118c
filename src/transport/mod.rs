//! Remote session transport
//!
//! The coordinator only depends on the `Transport` / `TransportSession`
//! traits. Inbound traffic is decoded once, at this boundary, into
//! `InboundEvent`s.

pub mod messages;
pub mod nats;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::TransportError;

pub use nats::NatsTransport;

pub const AUDIO_MIME_TYPE: &str = "audio/pcm";
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }
}

/// One realtime input sent to the remote model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub kind: MediaKind,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl OutboundMedia {
    pub fn audio(data: Vec<u8>) -> Self {
        Self {
            kind: MediaKind::Audio,
            mime_type: AUDIO_MIME_TYPE,
            data,
        }
    }

    pub fn image(data: Vec<u8>) -> Self {
        Self {
            kind: MediaKind::Image,
            mime_type: IMAGE_MIME_TYPE,
            data,
        }
    }
}

/// Decoded inbound event from the remote model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// PCM16 audio for playback
    Audio(Vec<u8>),
    /// Model text (observability only)
    Text(String),
    /// The model finished its turn
    TurnComplete,
    /// Message without content
    Empty,
}

/// Opens sessions with the remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, model: &str) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// One open connection. Released with `close`.
#[async_trait]
pub trait TransportSession: Send + Sync {
    async fn send(&self, media: OutboundMedia) -> Result<(), TransportError>;

    /// Inbound events for this connection. Only the first call yields events.
    fn receive(&self) -> BoxStream<'static, Result<InboundEvent, TransportError>>;

    async fn close(&self) -> Result<(), TransportError>;
}
