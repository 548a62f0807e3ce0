//! Kai API Library Crate
//!
//! This library contains the network surface of the UI orchestrator: the
//! application state, HTTP handlers, WebSocket session logic, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
