//! WebSocket channel against a real listener

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use print_agent::{AgentState, Config, MemoryBackend, Server};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::Message;

async fn spawn_agent(config: Config, printers: &[&str]) -> (String, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new(printers.iter().copied()));
    let state = AgentState::new(config.clone(), backend.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Server::new(config, state).serve(listener, std::future::pending()));
    (format!("ws://{addr}/ws"), backend)
}

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn exchange(ws: &mut Client, frame: Value) -> Value {
    ws.send(Message::text(frame.to_string())).await.unwrap();
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn commands_are_answered_in_order() {
    let (url, backend) = spawn_agent(Config::default(), &["Bar"]).await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    let reply = exchange(&mut ws, json!({"command": "list_printers"})).await;
    assert_eq!(reply["printers"], json!([{"name": "Bar"}]));

    let reply = exchange(
        &mut ws,
        json!({"command": "print_receipt", "printer_name": "Bar", "data": {"type": "raw", "data": "aGk="}}),
    )
    .await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(backend.jobs()[0].bytes, b"hi");

    let reply = exchange(&mut ws, json!({"command": "dance"})).await;
    assert_eq!(reply["status"], "error");
}

#[tokio::test]
async fn token_is_checked_before_upgrade() {
    let (url, _) = spawn_agent(Config::default().with_token("s3cret"), &["Bar"]).await;

    assert!(connect_async(url.as_str()).await.is_err());

    let (mut ws, _) = connect_async(format!("{url}?token=s3cret")).await.unwrap();
    let reply = exchange(&mut ws, json!({"command": "health"})).await;
    assert_eq!(reply["message"], "Agent online");
}
