//! Automatically reconnecting WebSocket wrapper

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, error};

use super::{EventHub, MessageFilter, WebSocket, WsError, WsEvent};

/// Decides from the close code and reason whether to reconnect.
pub type ShouldReconnect = Box<dyn Fn(u16, Option<&str>) -> bool + Send + Sync>;

/// Boxed future returned by a connection factory.
pub type ConnectFuture = Pin<Box<dyn Future<Output = Result<WebSocket, WsError>> + Send>>;

/// A WebSocket that transparently reconnects when the connection closes.
///
/// Events from every underlying connection are forwarded to a single hub, so
/// handlers registered once keep firing across reconnects. When a connection
/// closes, the `should_reconnect` predicate is consulted with the close code
/// and reason; without a predicate every closure triggers a reconnect.
/// Reconnect attempts repeat until one succeeds or [`close`](Self::close) is
/// called; [`WsEvent::Close`] is only forwarded for a terminal closure.
pub struct ReconnectingWebSocket {
    current: Arc<RwLock<WebSocket>>,
    events: EventHub,
    closing: Arc<AtomicBool>,
}

impl std::fmt::Debug for ReconnectingWebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectingWebSocket")
            .field("closing", &self.closing.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ReconnectingWebSocket {
    /// Open the initial connection via `connect` and keep reconnecting with
    /// it as long as `should_reconnect` permits.
    pub async fn connect<C>(
        should_reconnect: Option<ShouldReconnect>,
        connect: C,
    ) -> Result<Self, WsError>
    where
        C: Fn() -> ConnectFuture + Send + Sync + 'static,
    {
        let socket = connect().await?;

        let events = EventHub::new();
        let current = Arc::new(RwLock::new(socket));
        let closing = Arc::new(AtomicBool::new(false));

        tokio::spawn(supervise(
            Arc::clone(&current),
            events.sender(),
            Arc::clone(&closing),
            should_reconnect,
            connect,
        ));

        Ok(Self {
            current,
            events,
            closing,
        })
    }

    /// Whether the current underlying connection is open.
    pub async fn is_open(&self) -> bool {
        self.current.read().await.is_open()
    }

    /// Send a text message over the current connection.
    pub async fn send_text(&self, message: impl Into<String>) -> Result<(), WsError> {
        self.current.read().await.send_text(message).await
    }

    /// Serialize `value` to JSON and send it over the current connection.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> Result<(), WsError> {
        self.current.read().await.send_json(value).await
    }

    /// Send a binary message over the current connection.
    pub async fn send_binary(&self, message: Vec<u8>) -> Result<(), WsError> {
        self.current.read().await.send_binary(message).await
    }

    /// Close the connection for good; no reconnect is attempted afterwards.
    pub async fn close(&self, code: u16, reason: Option<&str>) -> Result<(), WsError> {
        self.closing.store(true, Ordering::SeqCst);
        self.current.read().await.close(code, reason).await
    }

    /// Subscribe to the forwarded event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.events.subscribe()
    }

    /// The hub to register handlers on.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Register a handler for complete text messages.
    pub fn on_text_message<F: Fn(String) + Send + 'static>(&self, handler: F) {
        self.events.on_text_message(handler);
    }

    /// Register a handler for binary messages.
    pub fn on_binary_message<F: Fn(Vec<u8>) + Send + 'static>(&self, handler: F) {
        self.events.on_binary_message(handler);
    }

    /// Register a handler for receive errors.
    pub fn on_error<F: Fn(String) + Send + 'static>(&self, handler: F) {
        self.events.on_error(handler);
    }

    /// Register a handler invoked once when the connection closes for good.
    pub fn on_close<F: Fn(u16, Option<String>) + Send + 'static>(&self, handler: F) {
        self.events.on_close(handler);
    }

    /// Register a typed text-message handler; see
    /// [`EventHub::on_deserialized_message`].
    pub fn on_deserialized_message<T, F>(&self, filter: Option<MessageFilter>, handler: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(Result<T, serde_json::Error>, &str) + Send + 'static,
    {
        self.events.on_deserialized_message(filter, handler);
    }

    /// Register a typed text-message handler that only sees successful
    /// decodes; see [`EventHub::on_successfully_deserialized_message`].
    pub fn on_successfully_deserialized_message<T, F>(
        &self,
        filter: Option<MessageFilter>,
        handler: F,
    ) where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) + Send + 'static,
    {
        self.events.on_successfully_deserialized_message(filter, handler);
    }
}

/// Forwards events from each underlying connection to the outer hub and
/// replaces the connection when it closes and reconnecting is wanted.
async fn supervise<C>(
    current: Arc<RwLock<WebSocket>>,
    events: broadcast::Sender<WsEvent>,
    closing: Arc<AtomicBool>,
    should_reconnect: Option<ShouldReconnect>,
    connect: C,
) where
    C: Fn() -> ConnectFuture + Send + Sync + 'static,
{
    loop {
        let (mut inner, mut closed) = {
            let socket = current.read().await;
            (socket.subscribe(), socket.closed_signal())
        };
        let closure = forward_until_closed(&mut inner, &mut closed, &events).await;

        let reconnect = !closing.load(Ordering::SeqCst)
            && match (&should_reconnect, &closure) {
                (Some(predicate), Some((code, reason))) => predicate(*code, reason.as_deref()),
                _ => true,
            };

        if !reconnect {
            let (code, reason) = closure.unwrap_or((1006, None));
            let _ = events.send(WsEvent::Close { code, reason });
            return;
        }

        debug!("WebSocket connection closed, reconnecting");
        loop {
            match connect().await {
                Ok(socket) => {
                    *current.write().await = socket;
                    break;
                }
                Err(e) => error!("Reconnecting WebSocket failed: {e}"),
            }
        }
    }
}

/// Forwards all events except Close, returning the close code and reason
/// when the connection ends.
///
/// The watch channel is consulted in parallel because a connection may close
/// before the broadcast subscription existed, in which case the Close event
/// never reaches `inner`.
async fn forward_until_closed(
    inner: &mut broadcast::Receiver<WsEvent>,
    closed: &mut watch::Receiver<Option<(u16, Option<String>)>>,
    events: &broadcast::Sender<WsEvent>,
) -> Option<(u16, Option<String>)> {
    loop {
        tokio::select! {
            event = inner.recv() => match event {
                Ok(WsEvent::Close { code, reason }) => return Some((code, reason)),
                Ok(event) => {
                    let _ = events.send(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    error!("Reconnecting WebSocket lagged, {skipped} events dropped");
                }
                // the watch channel is read after the select, once its
                // wait_for future no longer borrows it
                Err(broadcast::error::RecvError::Closed) => break,
            },
            result = closed.wait_for(Option::is_some) => {
                // forward what is still buffered before acting on the closure
                while let Ok(event) = inner.try_recv() {
                    if let WsEvent::Close { code, reason } = event {
                        return Some((code, reason));
                    }
                    let _ = events.send(event);
                }
                return match result {
                    Ok(info) => (*info).clone(),
                    Err(_) => None,
                };
            }
        }
    }

    closed.borrow().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_until_closed_forwards_events_and_returns_closure() {
        let (inner_sender, mut inner) = broadcast::channel(8);
        let (_closed_sender, mut closed) = watch::channel(None);
        let (outer_sender, mut outer) = broadcast::channel(8);

        inner_sender
            .send(WsEvent::Text("passed through".to_string()))
            .expect("Receiver should be subscribed");
        inner_sender
            .send(WsEvent::Close {
                code: 1000,
                reason: Some("bye".to_string()),
            })
            .expect("Receiver should be subscribed");

        let closure = forward_until_closed(&mut inner, &mut closed, &outer_sender).await;

        assert_eq!(closure, Some((1000, Some("bye".to_string()))));
        assert_eq!(
            outer.recv().await.expect("Event should be forwarded"),
            WsEvent::Text("passed through".to_string())
        );
    }

    #[tokio::test]
    async fn test_forward_until_closed_reads_watch_when_sender_dropped() {
        let (inner_sender, mut inner) = broadcast::channel::<WsEvent>(8);
        let (closed_sender, mut closed) = watch::channel(None);
        let (outer_sender, _outer) = broadcast::channel(8);

        closed_sender
            .send(Some((1006, None)))
            .expect("Receiver should be subscribed");
        drop(closed_sender);
        drop(inner_sender);

        let closure = forward_until_closed(&mut inner, &mut closed, &outer_sender).await;

        assert_eq!(closure, Some((1006, None)));
    }

    #[tokio::test]
    async fn test_forward_until_closed_without_closure_info() {
        let (inner_sender, mut inner) = broadcast::channel::<WsEvent>(8);
        let (closed_sender, mut closed) = watch::channel(None);
        let (outer_sender, _outer) = broadcast::channel(8);

        drop(closed_sender);
        drop(inner_sender);

        let closure = forward_until_closed(&mut inner, &mut closed, &outer_sender).await;

        assert_eq!(closure, None);
    }
}
