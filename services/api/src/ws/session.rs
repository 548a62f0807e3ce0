//! Manages the WebSocket connection lifecycle for an orchestrator session.

use super::protocol::ClientMessage;
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use kai_core::{
    command::ResponsePacket,
    error::TransportError,
    normalizer::ResponseNormalizer,
    orchestrator::{InboundEvent, Orchestrator},
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Each connection gets its own orchestrator and therefore its own
/// conversation history. Inbound frames are processed one turn at a time;
/// frames that arrive while a turn is in flight are queued, and a close
/// during a turn abandons the gateway call without sending anything.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", tracing::field::display(session_id));
    info!("New WebSocket connection.");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut orchestrator = Orchestrator::new(
        state.gateway.clone(),
        ResponseNormalizer::new(state.registry.clone()),
    );
    let mut pending: VecDeque<String> = VecDeque::new();

    loop {
        let text = match pending.pop_front() {
            Some(text) => text,
            None => match next_text(&mut socket_rx).await {
                Some(text) => text,
                None => break,
            },
        };

        let Some(event) = parse_inbound(&text) else {
            continue;
        };

        let outcome = tokio::select! {
            outcome = orchestrator.handle(event) => outcome,
            _ = wait_for_close(&mut socket_rx, &mut pending) => {
                info!("Client disconnected mid-turn. Abandoning gateway call.");
                break;
            }
        };

        let Some(outcome) = outcome else {
            continue;
        };
        if !outcome.dropped.is_empty() {
            debug!(dropped = outcome.dropped.len(), "Sending partial packet");
        }

        if let Err(e) = send_msg(&mut socket_tx, &outcome.packet).await {
            error!(error = %e, "Failed to send packet. Closing session.");
            break;
        }
    }

    info!(
        turns = orchestrator.session().len(),
        "WebSocket connection closed and session discarded."
    );
}

/// Parses one text frame into an orchestrator event. Unknown message types and
/// unparseable frames are logged and skipped.
fn parse_inbound(text: &str) -> Option<InboundEvent> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => Some(msg.into()),
        Err(e) => {
            warn!(error = %e, "Ignoring unrecognised client message.");
            None
        }
    }
}

/// Waits for the next text frame. Returns `None` once the client is gone.
async fn next_text(socket_rx: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => return Some(text.to_string()),
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame."),
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                return None;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                return None;
            }
        }
    }
    None
}

/// Resolves only when the connection closes. Text frames read in the meantime
/// are kept in `pending` for the turns that follow.
async fn wait_for_close(socket_rx: &mut SplitStream<WebSocket>, pending: &mut VecDeque<String>) {
    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => pending.push_back(text.to_string()),
            Ok(Message::Close(_)) => return,
            Ok(_) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                return;
            }
        }
    }
}

/// A helper function to serialize and send a `ResponsePacket` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    packet: &ResponsePacket,
) -> Result<(), TransportError> {
    let serialized =
        serde_json::to_string(packet).map_err(|e| TransportError(e.to_string()))?;
    socket_tx
        .send(Message::Text(serialized.into()))
        .await
        .map_err(|e| TransportError(e.to_string()))
}
