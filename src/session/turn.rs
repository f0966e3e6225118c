//! Speaking-turn lifecycle: `Idle -> Active -> Closing -> Idle`

use serde::Serialize;
use std::fmt;

/// Opaque identifier of one speaking turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TurnId(String);

impl TurnId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form for logs
        f.write_str(&self.0[..8.min(self.0.len())])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnPhase {
    Idle,
    Active,
    Closing,
}

/// Result of driving the machine with a control event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnTransition {
    /// Entered Active; caller must discard queued backlog
    Started(TurnId),
    /// Entered Closing with silence padding and a turn-end request
    Closing {
        turn_id: TurnId,
        chunks_sent: u32,
        silence_chunks: u32,
    },
    /// Closed without any audio sent; went straight to Idle
    EndedEmpty(TurnId),
    /// Event had no effect in the current phase (e.g. key repeat)
    Ignored,
}

#[derive(Debug)]
pub struct TurnMachine {
    phase: TurnPhase,
    turn_id: Option<TurnId>,
    last_turn_id: Option<TurnId>,
    chunks_sent: u32,
    pending_silence_chunks: u32,
    turn_end_requested: bool,
    silence_chunks_on_close: u32,
}

impl TurnMachine {
    pub fn new(silence_chunks_on_close: u32) -> Self {
        Self {
            phase: TurnPhase::Idle,
            turn_id: None,
            last_turn_id: None,
            chunks_sent: 0,
            pending_silence_chunks: 0,
            turn_end_requested: false,
            silence_chunks_on_close: silence_chunks_on_close.max(1),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == TurnPhase::Active
    }

    /// Current turn; only set while Active or Closing
    pub fn turn_id(&self) -> Option<&TurnId> {
        self.turn_id.as_ref()
    }

    /// Most recent turn, kept after the machine returns to Idle
    pub fn last_turn_id(&self) -> Option<&TurnId> {
        self.last_turn_id.as_ref()
    }

    pub fn chunks_sent(&self) -> u32 {
        self.chunks_sent
    }

    pub fn pending_silence_chunks(&self) -> u32 {
        self.pending_silence_chunks
    }

    pub fn turn_end_requested(&self) -> bool {
        self.turn_end_requested
    }

    /// Press / unmute. Idle or Closing moves to Active; Active is a no-op.
    pub fn begin(&mut self) -> TurnTransition {
        if self.phase == TurnPhase::Active {
            return TurnTransition::Ignored;
        }

        let turn_id = TurnId::generate();
        self.phase = TurnPhase::Active;
        self.turn_id = Some(turn_id.clone());
        self.last_turn_id = Some(turn_id.clone());
        self.chunks_sent = 0;
        self.pending_silence_chunks = 0;

        TurnTransition::Started(turn_id)
    }

    /// Release / mute. Only meaningful while Active.
    pub fn end(&mut self) -> TurnTransition {
        if self.phase != TurnPhase::Active {
            return TurnTransition::Ignored;
        }

        let Some(turn_id) = self.turn_id.clone() else {
            self.phase = TurnPhase::Idle;
            return TurnTransition::Ignored;
        };

        if self.chunks_sent == 0 {
            self.phase = TurnPhase::Idle;
            self.turn_id = None;
            return TurnTransition::EndedEmpty(turn_id);
        }

        self.phase = TurnPhase::Closing;
        self.pending_silence_chunks = self.silence_chunks_on_close;
        self.turn_end_requested = true;

        TurnTransition::Closing {
            turn_id,
            chunks_sent: self.chunks_sent,
            silence_chunks: self.pending_silence_chunks,
        }
    }

    /// Toggle-mode event: Active closes, anything else starts a turn
    pub fn toggle(&mut self) -> TurnTransition {
        if self.phase == TurnPhase::Active {
            self.end()
        } else {
            self.begin()
        }
    }

    pub fn record_chunk_sent(&mut self) {
        self.chunks_sent = self.chunks_sent.saturating_add(1);
    }

    /// Consume the pending turn-end request, if any
    pub fn take_turn_end_request(&mut self) -> bool {
        std::mem::take(&mut self.turn_end_requested)
    }

    /// Consume one pending silence chunk. The turn returns to Idle when the
    /// last one is taken.
    pub fn take_silence_chunk(&mut self) -> bool {
        if self.pending_silence_chunks == 0 {
            return false;
        }

        self.pending_silence_chunks -= 1;
        if self.pending_silence_chunks == 0 && self.phase == TurnPhase::Closing {
            self.phase = TurnPhase::Idle;
            self.turn_id = None;
        }
        true
    }

    /// Back to a fresh Idle machine for a new connection
    pub fn reset(&mut self) {
        self.phase = TurnPhase::Idle;
        self.turn_id = None;
        self.last_turn_id = None;
        self.chunks_sent = 0;
        self.pending_silence_chunks = 0;
        self.turn_end_requested = false;
    }
}
