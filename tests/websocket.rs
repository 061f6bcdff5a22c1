//! DDP session over a real WebSocket against a local fake server.

use std::time::Duration;

use anyhow::{Result, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_async};

use ddp_client::{CallbackListener, ConnectionState, DdpClient, Envelope};

const STEP_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Fake server
// ============================================================================

fn frame(value: Value) -> Message {
    Message::Text(value.to_string().into())
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Result<Value> {
    while let Some(message) = ws.next().await {
        if let Message::Text(text) = message? {
            return Ok(serde_json::from_str(text.as_str())?);
        }
    }
    bail!("client stream ended")
}

/// Performs the handshake, pings once, answers one method call, then waits
/// for the client to close. Returns every frame the client sent.
async fn fake_server(listener: TcpListener) -> Result<Vec<Value>> {
    let (stream, _) = listener.accept().await?;
    let mut ws = accept_async(stream).await?;
    let mut received = Vec::new();

    received.push(next_json(&mut ws).await?);

    ws.send(frame(json!({"server_id": "0"}))).await?;
    ws.send(frame(json!({"msg": "connected", "session": "abc"}))).await?;
    ws.send(frame(json!({"msg": "ping", "id": "p1"}))).await?;

    // pong and the method call may arrive in either order
    for _ in 0..2 {
        let value = next_json(&mut ws).await?;
        if value["msg"] == "method" {
            let id = value["id"].clone();
            ws.send(frame(json!({"msg": "result", "id": id, "result": 3})))
                .await?;
        }
        received.push(value);
    }

    while let Some(Ok(message)) = ws.next().await {
        if message.is_close() {
            break;
        }
    }

    Ok(received)
}

/// Accepts the handshake, then closes from the server side. Returns `true`
/// once the client's close reply arrives.
async fn closing_server(listener: TcpListener) -> Result<bool> {
    let (stream, _) = listener.accept().await?;
    let mut ws = accept_async(stream).await?;

    next_json(&mut ws).await?;
    ws.send(frame(json!({"msg": "connected", "session": "abc"}))).await?;
    ws.close(Some(CloseFrame {
        code: CloseCode::Away,
        reason: "restarting".into(),
    }))
    .await?;

    while let Some(message) = ws.next().await {
        if message?.is_close() {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn wait_for(rx: &mut mpsc::UnboundedReceiver<Envelope>, msg: &str) -> Result<Envelope> {
    loop {
        let Some(envelope) = timeout(STEP_TIMEOUT, rx.recv()).await? else {
            bail!("event bus closed while waiting for {msg}");
        };
        assert!(envelope.msg().is_some(), "envelope without msg republished");
        if envelope.msg() == Some(msg) {
            return Ok(envelope);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_call_ping_and_disconnect() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let server = tokio::spawn(fake_server(listener));

    let client = DdpClient::builder()
        .address(format!("ws://127.0.0.1:{port}/websocket"))
        .build()?;
    let (_, mut events) = client.events().channel();

    client.connect()?;
    let connected = wait_for(&mut events, "connected").await?;
    assert_eq!(connected.get_str("session"), Some("abc"));
    assert_eq!(client.state(), ConnectionState::Connected);

    let (result_tx, mut result_rx) = mpsc::unbounded_channel();
    let listener = CallbackListener::new()
        .with_result(move |envelope| {
            let _ = result_tx.send(envelope.get("result").cloned());
        })
        .into_shared();
    let id = client.call("add", vec![json!(1), json!(2)], Some(listener));

    let result = timeout(STEP_TIMEOUT, result_rx.recv()).await?;
    assert_eq!(result, Some(Some(json!(3))));
    assert!(!client.is_pending(id));

    client.disconnect();
    let closed = wait_for(&mut events, "closed").await?;
    assert_eq!(closed.get("remote"), Some(&json!(false)));
    assert_eq!(client.state(), ConnectionState::Closed);

    let received = timeout(STEP_TIMEOUT, server).await???;
    assert_eq!(
        received[0],
        json!({"msg": "connect", "version": "1", "support": ["1"]})
    );
    assert!(received.contains(&json!({"msg": "pong", "id": "p1"})));
    assert!(received.contains(&json!({
        "msg": "method",
        "method": "add",
        "params": [1, 2],
        "id": id.to_string()
    })));
    Ok(())
}

#[tokio::test]
async fn test_refused_connection_closes_session() -> Result<()> {
    // Bind then drop to get a port with nothing listening
    let port = TcpListener::bind("127.0.0.1:0").await?.local_addr()?.port();

    let client = DdpClient::builder()
        .address(format!("ws://127.0.0.1:{port}/websocket"))
        .build()?;
    let (_, mut events) = client.events().channel();

    client.connect()?;
    let error = wait_for(&mut events, "error").await?;
    assert_eq!(error.get_str("source"), Some("WebSocketClient"));
    assert!(
        error
            .get_str("errormsg")
            .is_some_and(|text| text.starts_with("WebSocket error:"))
    );
    wait_for(&mut events, "closed").await?;
    assert_eq!(client.state(), ConnectionState::Closed);

    // A closed transport is replaced on the next connect
    client.connect()?;
    wait_for(&mut events, "closed").await?;
    Ok(())
}

#[tokio::test]
async fn test_remote_close_is_acknowledged() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let server = tokio::spawn(closing_server(listener));

    let client = DdpClient::builder()
        .address(format!("ws://127.0.0.1:{port}/websocket"))
        .build()?;
    let (_, mut events) = client.events().channel();

    client.connect()?;
    let closed = wait_for(&mut events, "closed").await?;
    assert_eq!(closed.get("code"), Some(&json!(1001)));
    assert_eq!(closed.get_str("reason"), Some("restarting"));
    assert_eq!(closed.get("remote"), Some(&json!(true)));
    assert_eq!(client.state(), ConnectionState::Closed);

    assert!(timeout(STEP_TIMEOUT, server).await???);
    Ok(())
}
