use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use kai_api::{router::create_router, state::AppState};
use kai_core::{
    conversation::ConversationTurn,
    error::GatewayError,
    gateway::LanguageModelGateway,
    normalizer::RawResponse,
    registry::CommandRegistry,
};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Answers "plan a trip" with the planner packet and anything else with the
/// number of turns it was shown.
struct StubGateway;

#[async_trait]
impl LanguageModelGateway for StubGateway {
    async fn get_response(
        &self,
        history: &[ConversationTurn],
    ) -> Result<RawResponse, GatewayError> {
        let last = history.last().map(|turn| turn.content.as_str());
        if last == Some("plan a trip") {
            return Ok(RawResponse::Packet(json!({
                "chat_message": "Let's plan!",
                "ui_commands": [
                    {"command": "CLEAR_CONTAINER", "container_id": "main_workspace"},
                    {"command": "ADD_SLIDER", "slider_id": "budget", "label": "Budget",
                     "min_val": 500, "max_val": 5000, "default_val": 2000}
                ]
            })));
        }
        if last == Some("fail") {
            return Err(GatewayError::Quota("insufficient_quota".to_string()));
        }
        Ok(RawResponse::Text(format!("history has {} turns", history.len())))
    }
}

/// Sleeps before every answer and records what it was shown.
#[derive(Default)]
struct SlowGateway {
    started: AtomicUsize,
    finished: AtomicUsize,
    history_lengths: Mutex<Vec<usize>>,
}

const SLOW_GATEWAY_DELAY: Duration = Duration::from_millis(300);

#[async_trait]
impl LanguageModelGateway for SlowGateway {
    async fn get_response(
        &self,
        history: &[ConversationTurn],
    ) -> Result<RawResponse, GatewayError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.history_lengths.lock().unwrap().push(history.len());
        tokio::time::sleep(SLOW_GATEWAY_DELAY).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(RawResponse::Text(format!("reply to {} turns", history.len())))
    }
}

async fn spawn_server() -> SocketAddr {
    spawn_server_with(Arc::new(StubGateway)).await
}

async fn spawn_server_with(gateway: Arc<dyn LanguageModelGateway>) -> SocketAddr {
    let state = Arc::new(AppState {
        gateway,
        registry: Arc::new(CommandRegistry::default()),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (stream, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    stream
}

async fn send(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn recv_packet(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a packet")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_user_message_roundtrip() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "user_message", "content": "plan a trip"})).await;
    let packet = recv_packet(&mut client).await;

    assert_eq!(packet["chat_message"], "Let's plan!");
    let commands = packet["ui_commands"].as_array().unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0]["command"], "CLEAR_CONTAINER");
    assert_eq!(commands[1]["command"], "ADD_SLIDER");
    assert_eq!(commands[1]["container_id"], "main_workspace");
    assert_eq!(commands[1]["min_val"], 500.0);
}

#[tokio::test]
async fn test_rejected_frames_produce_no_reply() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "user_message", "content": "plan a trip"})).await;
    recv_packet(&mut client).await;

    // None of these reach the gateway or the history.
    send(&mut client, json!({"type": "ui_event", "payload": {"state": {}}})).await;
    send(&mut client, json!({"type": "init", "topic": "x"})).await;
    client
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    client
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();

    send(&mut client, json!({"type": "user_message", "content": "again"})).await;
    let packet = recv_packet(&mut client).await;
    assert_eq!(packet["chat_message"], "history has 3 turns");
    assert_eq!(packet["ui_commands"], json!([]));
}

#[tokio::test]
async fn test_ui_event_is_recorded_as_turn() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    send(
        &mut client,
        json!({"type": "ui_event", "payload": {
            "event_type": "button_click", "element_id": "go", "state": {}
        }}),
    )
    .await;
    let packet = recv_packet(&mut client).await;
    assert_eq!(packet["chat_message"], "history has 1 turns");
}

#[tokio::test]
async fn test_gateway_failure_keeps_session_alive() {
    let addr = spawn_server().await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "user_message", "content": "fail"})).await;
    let packet = recv_packet(&mut client).await;
    assert!(packet["chat_message"].as_str().unwrap().contains("insufficient_quota"));
    assert_eq!(packet["ui_commands"], json!([]));

    send(&mut client, json!({"type": "user_message", "content": "again"})).await;
    let packet = recv_packet(&mut client).await;
    // user, assistant error message, user
    assert_eq!(packet["chat_message"], "history has 3 turns");
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let addr = spawn_server().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    send(&mut first, json!({"type": "user_message", "content": "one"})).await;
    recv_packet(&mut first).await;
    send(&mut first, json!({"type": "user_message", "content": "two"})).await;
    assert_eq!(recv_packet(&mut first).await["chat_message"], "history has 3 turns");

    send(&mut second, json!({"type": "user_message", "content": "one"})).await;
    assert_eq!(recv_packet(&mut second).await["chat_message"], "history has 1 turns");
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"status":"ok"}"#));
}

#[tokio::test]
async fn test_close_mid_turn_abandons_gateway_call() {
    let gateway = Arc::new(SlowGateway::default());
    let addr = spawn_server_with(gateway.clone()).await;
    let mut client = connect(addr).await;

    send(&mut client, json!({"type": "user_message", "content": "hello"})).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while gateway.started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("gateway was never called");

    client.close(None).await.unwrap();
    tokio::time::sleep(SLOW_GATEWAY_DELAY * 2).await;

    assert_eq!(gateway.started.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_frames_sent_mid_turn_are_handled_in_order() {
    let gateway = Arc::new(SlowGateway::default());
    let addr = spawn_server_with(gateway.clone()).await;
    let mut client = connect(addr).await;

    for content in ["one", "two", "three"] {
        send(&mut client, json!({"type": "user_message", "content": content})).await;
    }

    let mut replies = Vec::new();
    for _ in 0..3 {
        replies.push(recv_packet(&mut client).await["chat_message"].clone());
    }
    assert_eq!(
        replies,
        vec![
            json!("reply to 1 turns"),
            json!("reply to 3 turns"),
            json!("reply to 5 turns")
        ]
    );
    assert_eq!(*gateway.history_lengths.lock().unwrap(), vec![1, 3, 5]);
    assert_eq!(gateway.finished.load(Ordering::SeqCst), 3);
}
