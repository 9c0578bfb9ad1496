//! Server-Sent Events tests using mockito

use std::time::Duration;

use web_client::sse::ServerSentEvent;
use web_client::WebClient;

fn setup_tracing() {
    let default_filter = "debug";
    let hyper_filter = "hyper=warn";
    let env_filter =
        tracing_subscriber::EnvFilter::new(format!("{default_filter},{hyper_filter}"));
    // Ok if successful, Err if already initialized
    // Allows us to setup tracing at the start of several parallel tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

async fn recv_event(
    receiver: &mut tokio::sync::mpsc::Receiver<ServerSentEvent>,
) -> ServerSentEvent {
    tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("Event should arrive in time")
        .expect("Channel should stay open")
}

#[tokio::test]
async fn test_events_received_in_order() {
    setup_tracing();
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/stream")
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("event: update\ndata: one\n\ndata: two\n\n")
        .create_async()
        .await;

    let client = WebClient::builder()
        .base_url(server.url())
        .build()
        .expect("Builder should produce a client");
    let sse = client.sse().expect("SSE client should build");

    let (connection, mut events) = sse.events("/stream");
    assert!(connection.is_open());

    let first = recv_event(&mut events).await;
    assert_eq!(first.event.as_deref(), Some("update"));
    assert_eq!(first.data.as_deref(), Some("one"));

    let second = recv_event(&mut events).await;
    assert!(second.event.is_none());
    assert_eq!(second.data.as_deref(), Some("two"));

    connection.close();
}

#[tokio::test]
async fn test_reconnect_sends_last_event_id() {
    setup_tracing();
    let mut server = mockito::Server::new_async().await;

    // initial request carries no Last-Event-ID and delivers an event with id 42
    let _initial = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("id: 42\ndata: first\n\n")
        .create_async()
        .await;

    // newer mocks match first, so reconnects with the header land here
    let _resumed = server
        .mock("GET", "/stream")
        .match_header("last-event-id", "42")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: resumed\n\n")
        .create_async()
        .await;

    let client = WebClient::builder()
        .base_url(server.url())
        .build()
        .expect("Builder should produce a client");
    let sse = client.sse().expect("SSE client should build");

    let (connection, mut events) = sse.events("/stream");

    let first = recv_event(&mut events).await;
    assert_eq!(first.id.as_deref(), Some("42"));
    assert_eq!(first.data.as_deref(), Some("first"));

    let resumed = recv_event(&mut events).await;
    assert_eq!(resumed.data.as_deref(), Some("resumed"));

    connection.close();
}

#[tokio::test]
async fn test_close_stops_subscription() {
    setup_tracing();
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("data: tick\n\n")
        .create_async()
        .await;

    let client = WebClient::builder()
        .base_url(server.url())
        .build()
        .expect("Builder should produce a client");
    let sse = client.sse().expect("SSE client should build");

    let (connection, mut events) = sse.events("/stream");
    let _ = recv_event(&mut events).await;

    connection.close();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!connection.is_open());
}
