//! Kai Core
//!
//! Turns a language model's loosely structured output into a stream of typed
//! UI commands, and runs the per-connection turn-taking loop around it.

pub mod command;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod normalizer;
pub mod orchestrator;
pub mod registry;
pub mod ui_event;

pub use command::{ResponsePacket, UiCommand};
pub use conversation::{ConversationSession, ConversationTurn, Role};
pub use error::{DecodeError, GatewayError, TransportError, ValidationError};
pub use gateway::LanguageModelGateway;
pub use normalizer::{NormalizedResponse, RawResponse, ResponseNormalizer};
pub use orchestrator::{InboundEvent, Orchestrator, TurnOutcome, TurnState};
pub use registry::{CommandRegistry, RegistryConfig};
