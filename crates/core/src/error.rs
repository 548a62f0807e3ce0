//! Error taxonomy shared by the core library and the service.
//!
//! Command-level errors (`DecodeError`) are always contained by the normalizer,
//! Gateway errors become user-visible packets, and only `TransportError` ends a
//! session.

use thiserror::Error;

/// Why a single raw command could not be turned into a `UiCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The tag does not name any registered variant.
    #[error("unknown command `{tag}`{}", suggestion_suffix(.suggestion))]
    UnknownCommand {
        tag: String,
        /// Closest registered tag, if any looked similar.
        suggestion: Option<String>,
    },
    /// The tag is known but the fields do not satisfy its schema.
    #[error("invalid `{tag}` command: {reason}")]
    InvalidCommand { tag: String, reason: String },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(tag) => format!(" (did you mean `{}`?)", tag),
        None => String::new(),
    }
}

impl DecodeError {
    pub fn invalid(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// The tag the failing command carried.
    pub fn tag(&self) -> &str {
        match self {
            Self::UnknownCommand { tag, .. } | Self::InvalidCommand { tag, .. } => tag,
        }
    }
}

/// A malformed inbound UI event. The turn is aborted before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid UI event: {0}")]
pub struct ValidationError(pub String);

/// A failure talking to the Language-Model Gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Network failure, timeout or connection reset.
    #[error("transport error: {0}")]
    Transport(String),
    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Rate limit or quota exhausted.
    #[error("quota exceeded: {0}")]
    Quota(String),
    /// The upstream service answered with an error status.
    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
    /// The upstream service rejected the request without a usable status.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The upstream answer could not be read at all.
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Classifies an HTTP error status the way most model APIs use them.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth(message),
            429 => Self::Quota(message),
            _ => Self::Upstream { status, message },
        }
    }

    /// The chat text shown to the user in place of a model reply.
    pub fn user_message(&self) -> String {
        format!(
            "Sorry, I couldn't reach the language model ({}). Please try sending that again.",
            self
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::Malformed(err.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}

/// The session connection is gone; orchestration for it stops.
#[derive(Debug, Error)]
#[error("session transport closed: {0}")]
pub struct TransportError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_display_with_suggestion() {
        let err = DecodeError::UnknownCommand {
            tag: "ADD_SLIDR".to_string(),
            suggestion: Some("ADD_SLIDER".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown command `ADD_SLIDR` (did you mean `ADD_SLIDER`?)"
        );

        let err = DecodeError::UnknownCommand {
            tag: "DANCE".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown command `DANCE`");
        assert_eq!(err.tag(), "DANCE");
    }

    #[test]
    fn test_gateway_error_from_status() {
        assert!(matches!(GatewayError::from_status(401, "x"), GatewayError::Auth(_)));
        assert!(matches!(GatewayError::from_status(429, "x"), GatewayError::Quota(_)));
        assert!(matches!(
            GatewayError::from_status(503, "x"),
            GatewayError::Upstream { status: 503, .. }
        ));
    }

    #[test]
    fn test_gateway_error_user_message_mentions_cause() {
        let err = GatewayError::Transport("connection reset".to_string());
        let text = err.user_message();
        assert!(text.contains("connection reset"));
    }
}
