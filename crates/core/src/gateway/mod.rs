//! Language-Model Gateway
//!
//! The Gateway maps the ordered conversation history to a raw model response.
//! It never validates commands itself; that is the normalizer's job.

pub mod gemini;
pub mod openai;
pub mod scripted;

use crate::conversation::ConversationTurn;
use crate::error::GatewayError;
use crate::normalizer::RawResponse;
use async_trait::async_trait;

pub use gemini::GeminiGateway;
pub use openai::OpenAiGateway;
pub use scripted::ScriptedGateway;

/// Prefix for synthetic turns on providers without a system role mid-conversation.
pub const UI_EVENT_PREFIX: &str = "[UI event]";

/// A client for the external model service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Sends the full ordered history and returns the model's raw answer.
    async fn get_response(
        &self,
        history: &[ConversationTurn],
    ) -> Result<RawResponse, GatewayError>;
}
