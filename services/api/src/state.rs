//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resources every
//! connection shares: the gateway client and the command registry.

use kai_core::{gateway::LanguageModelGateway, registry::CommandRegistry};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// Sessions never share conversation state through it.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn LanguageModelGateway>,
    pub registry: Arc<CommandRegistry>,
}
