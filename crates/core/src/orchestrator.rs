//! Orchestration Loop
//!
//! One [`Orchestrator`] exists per connection and exclusively owns that
//! connection's [`ConversationSession`]. A turn runs start to finish inside a
//! single `handle` call: record the inbound turn, call the Gateway with the
//! full history, normalize, record the reply, return the packet. Because
//! `handle` takes `&mut self`, turns for one session can never overlap.

use crate::command::ResponsePacket;
use crate::conversation::{ConversationSession, ConversationTurn};
use crate::gateway::LanguageModelGateway;
use crate::normalizer::{DroppedCommand, ResponseNormalizer};
use crate::ui_event::{UiEvent, translate};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An inbound event from the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Free text typed by the user.
    UserMessage(String),
    /// An unvalidated `ui_event` payload.
    UiEvent(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingGatewayResponse,
}

/// The result of one completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// What goes back to the renderer.
    pub packet: ResponsePacket,
    /// Commands removed during normalization.
    pub dropped: Vec<DroppedCommand>,
}

pub struct Orchestrator {
    session: ConversationSession,
    gateway: Arc<dyn LanguageModelGateway>,
    normalizer: ResponseNormalizer,
    state: TurnState,
}

impl Orchestrator {
    /// Creates the loop together with a fresh, empty session.
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, normalizer: ResponseNormalizer) -> Self {
        Self {
            session: ConversationSession::new(),
            gateway,
            normalizer,
            state: TurnState::Idle,
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Runs one full turn for `event`.
    ///
    /// Returns `None` when the event is rejected before a turn starts (a
    /// malformed UI event); the session is left untouched and the Gateway is
    /// not called. Gateway failures still produce a packet.
    pub async fn handle(&mut self, event: InboundEvent) -> Option<TurnOutcome> {
        let turn = match event {
            InboundEvent::UserMessage(content) => ConversationTurn::user(content),
            InboundEvent::UiEvent(payload) => match UiEvent::from_payload(payload) {
                Ok(ui_event) => ConversationTurn::system(translate(&ui_event)),
                Err(err) => {
                    warn!(error = %err, "Dropping malformed UI event");
                    return None;
                }
            },
        };

        debug!(role = %turn.role, "Starting turn");
        self.session.append(turn);
        self.state = TurnState::AwaitingGatewayResponse;

        let raw = self.gateway.get_response(self.session.turns()).await;
        let normalized = self.normalizer.normalize_result(raw);

        if let Some(message) = &normalized.packet.chat_message {
            self.session.append(ConversationTurn::assistant(message.clone()));
        }
        self.session.set_last_packet(normalized.packet.clone());
        self.state = TurnState::Idle;

        info!(
            commands = normalized.packet.ui_commands.len(),
            dropped = normalized.dropped.len(),
            history = self.session.len(),
            "Turn complete"
        );

        Some(TurnOutcome {
            packet: normalized.packet,
            dropped: normalized.dropped,
        })
    }
}
