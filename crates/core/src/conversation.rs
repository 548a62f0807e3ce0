//! Per-connection conversation state.

use crate::command::ResponsePacket;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Synthetic turns, such as translated UI events.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One message in the history. Never modified once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Ordered, append-only history plus the last packet sent for one connection.
///
/// Only the orchestrator that owns the session writes to it; everyone else
/// gets a read-only slice.
#[derive(Debug, Default)]
pub struct ConversationSession {
    turns: Vec<ConversationTurn>,
    last_packet: Option<ResponsePacket>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_packet(&self) -> Option<&ResponsePacket> {
        self.last_packet.as_ref()
    }

    pub(crate) fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub(crate) fn set_last_packet(&mut self, packet: ResponsePacket) {
        self.last_packet = Some(packet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_session_appends_in_order() {
        let mut session = ConversationSession::new();
        assert!(session.is_empty());
        session.append(ConversationTurn::user("plan a trip"));
        session.append(ConversationTurn::assistant("Let's plan!"));

        assert_eq!(session.len(), 2);
        assert_eq!(session.turns()[0], ConversationTurn::user("plan a trip"));
        assert_eq!(session.turns()[1].role, Role::Assistant);
        assert!(session.last_packet().is_none());
    }
}
