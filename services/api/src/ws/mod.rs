//! WebSocket Session Management
//!
//! This module contains the logic for serving orchestrator sessions over
//! WebSockets. It is structured into submodules:
//!
//! - `protocol`: Defines the JSON message format for client-server communication.
//! - `session`: Manages the WebSocket connection lifecycle and drives one
//!   orchestrator per connection.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
