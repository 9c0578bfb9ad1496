//! WebSocket tests against a loopback tokio-tungstenite server

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use web_client::ws::{ConnectFuture, ReconnectingWebSocket, WebSocket, WebSocketConfig, WsEvent};

fn setup_tracing() {
    let default_filter = "debug";
    let tungstenite_filter = "tungstenite=warn";
    let env_filter =
        tracing_subscriber::EnvFilter::new(format!("{default_filter},{tungstenite_filter}"));
    // Ok if successful, Err if already initialized
    // Allows us to setup tracing at the start of several parallel tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Bind should succeed");
    let addr = listener.local_addr().expect("Addr should resolve");
    (listener, addr)
}

async fn recv_event(
    receiver: &mut tokio::sync::broadcast::Receiver<WsEvent>,
) -> WsEvent {
    tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("Event should arrive in time")
        .expect("Channel should stay open")
}

#[tokio::test]
async fn test_text_message_delivery() {
    setup_tracing();
    let (listener, addr) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut server = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        server
            .send(Message::Text("hello".into()))
            .await
            .expect("Send should succeed");
        // keep the connection open until the client has read the message
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let socket = WebSocket::connect(format!("ws://{addr}"), &WebSocketConfig::default())
        .await
        .expect("Connect should succeed");
    assert!(socket.is_open());

    let mut events = socket.subscribe();
    assert_eq!(recv_event(&mut events).await, WsEvent::Text("hello".to_string()));
}

#[tokio::test]
async fn test_send_text_reaches_server() {
    setup_tracing();
    let (listener, addr) = bind().await;
    let (received_sender, received_receiver) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut server = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        if let Some(Ok(Message::Text(text))) = server.next().await {
            let _ = received_sender.send(text.to_string());
        }
    });

    let socket = WebSocket::connect(format!("ws://{addr}"), &WebSocketConfig::default())
        .await
        .expect("Connect should succeed");
    socket
        .send_text("ping from client")
        .await
        .expect("Send should succeed");

    let received = tokio::time::timeout(Duration::from_secs(5), received_receiver)
        .await
        .expect("Message should arrive in time")
        .expect("Server task should report the message");
    assert_eq!(received, "ping from client");
}

#[tokio::test]
async fn test_server_close_emits_close_event() {
    setup_tracing();
    let (listener, addr) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut server = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        server
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "done".into(),
            }))
            .await
            .expect("Close should succeed");
    });

    let socket = WebSocket::connect(format!("ws://{addr}"), &WebSocketConfig::default())
        .await
        .expect("Connect should succeed");
    let mut events = socket.subscribe();

    assert_eq!(
        recv_event(&mut events).await,
        WsEvent::Close {
            code: 1000,
            reason: Some("done".to_string()),
        }
    );
    assert!(!socket.is_open());
}

#[tokio::test]
async fn test_send_after_close_fails() {
    setup_tracing();
    let (listener, addr) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut server = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        server.close(None).await.expect("Close should succeed");
    });

    let socket = WebSocket::connect(format!("ws://{addr}"), &WebSocketConfig::default())
        .await
        .expect("Connect should succeed");

    let mut events = socket.subscribe();
    let _ = recv_event(&mut events).await;

    assert!(socket.send_text("too late").await.is_err());
}

#[tokio::test]
async fn test_reconnecting_websocket_survives_server_close() {
    setup_tracing();
    let (listener, addr) = bind().await;

    // first connection is closed right away, the second one delivers a message
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut first = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        first.close(None).await.expect("Close should succeed");

        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut second = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        second
            .send(Message::Text("after reconnect".into()))
            .await
            .expect("Send should succeed");
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let url = format!("ws://{addr}");
    let socket = ReconnectingWebSocket::connect(None, move || -> ConnectFuture {
        let url = url.clone();
        Box::pin(async move { WebSocket::connect(url, &WebSocketConfig::default()).await })
    })
    .await
    .expect("Connect should succeed");

    let mut events = socket.subscribe();
    assert_eq!(
        recv_event(&mut events).await,
        WsEvent::Text("after reconnect".to_string())
    );
}

#[tokio::test]
async fn test_reconnect_predicate_can_stop_reconnecting() {
    setup_tracing();
    let (listener, addr) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Accept should succeed");
        let mut server = tokio_tungstenite::accept_async(stream)
            .await
            .expect("Handshake should succeed");
        server
            .close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "shutting down".into(),
            }))
            .await
            .expect("Close should succeed");
    });

    let url = format!("ws://{addr}");
    let socket = ReconnectingWebSocket::connect(
        Some(Box::new(|code, _reason| code != 1001)),
        move || -> ConnectFuture {
            let url = url.clone();
            Box::pin(async move { WebSocket::connect(url, &WebSocketConfig::default()).await })
        },
    )
    .await
    .expect("Connect should succeed");

    let mut events = socket.subscribe();
    assert_eq!(
        recv_event(&mut events).await,
        WsEvent::Close {
            code: 1001,
            reason: Some("shutting down".to_string()),
        }
    );
}
