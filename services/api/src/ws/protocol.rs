//! Defines the WebSocket message protocol between the renderer and the API server.
//!
//! Outbound frames are plain `ResponsePacket`s; only inbound frames carry a
//! `type` discriminator.

use kai_core::orchestrator::InboundEvent;
use serde::Deserialize;
use serde_json::Value;

/// Messages sent from the client (renderer) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Free text typed by the user.
    UserMessage {
        #[serde(default)]
        content: String,
    },
    /// An interaction with a rendered component. The payload is validated by
    /// the orchestrator, not here.
    UiEvent {
        #[serde(default)]
        payload: Value,
    },
}

impl From<ClientMessage> for InboundEvent {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::UserMessage { content } => InboundEvent::UserMessage(content),
            ClientMessage::UiEvent { payload } => InboundEvent::UiEvent(payload),
        }
    }
}
