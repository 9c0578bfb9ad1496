//! WebSocket connection backed by tokio-tungstenite

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::{EventHub, MessageAssembler, MessageFilter, WebSocketConfig, WsError, WsEvent};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Close code reported when the connection was lost without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// One WebSocket connection.
///
/// A dedicated receive task owns the read half for the connection's lifetime:
/// it reassembles chunked text frames, is the sole writer of the open flag and
/// the sole producer of events, and emits exactly one
/// [`WsEvent::Close`] before ending. Handlers are registered through the
/// embedded [`EventHub`].
pub struct WebSocket {
    events: EventHub,
    sink: Mutex<WsSink>,
    open: Arc<AtomicBool>,
    // set once when the connection ends, readable regardless of when a
    // subscriber showed up, unlike the broadcast channel
    closed: watch::Receiver<Option<(u16, Option<String>)>>,
}

impl std::fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl WebSocket {
    /// Connect to `url` with the headers, cookies and authentication from
    /// `config` applied to the upgrade request.
    pub async fn connect(url: String, config: &WebSocketConfig) -> Result<Self, WsError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| WsError::Connection(e.to_string()))?;

        let mut headers = config.headers.clone();
        if !config.cookies.is_empty() {
            let cookie_header = config
                .cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name, cookie.value))
                .collect::<Vec<_>>()
                .join("; ");
            headers.push(("Cookie".to_string(), cookie_header));
        }
        if let Some(user_agent) = &config.user_agent {
            headers.push(("User-Agent".to_string(), user_agent.clone()));
        }
        if let Some(authentication) = &config.authentication {
            headers.push(("Authorization".to_string(), authentication.header_value()));
        }

        for (name, value) in &headers {
            let name = name
                .parse::<tokio_tungstenite::tungstenite::http::header::HeaderName>()
                .map_err(|e| WsError::Connection(format!("invalid header name {name}: {e}")))?;
            let value = value
                .parse::<tokio_tungstenite::tungstenite::http::header::HeaderValue>()
                .map_err(|e| WsError::Connection(format!("invalid header value: {e}")))?;
            request.headers_mut().insert(name, value);
        }

        let (stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| WsError::Connection(e.to_string()))?;

        let (sink, stream) = stream.split();

        let events = EventHub::new();
        let open = Arc::new(AtomicBool::new(true));
        let (closed_sender, closed) = watch::channel(None);

        tokio::spawn(receive_loop(
            stream,
            events.sender(),
            Arc::clone(&open),
            closed_sender,
        ));

        Ok(Self {
            events,
            sink: Mutex::new(sink),
            open,
            closed,
        })
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Send a text message.
    pub async fn send_text(&self, message: impl Into<String>) -> Result<(), WsError> {
        if !self.is_open() {
            return Err(WsError::Closed);
        }

        self.sink
            .lock()
            .await
            .send(Message::Text(message.into().into()))
            .await
            .map_err(|e| WsError::Send(e.to_string()))
    }

    /// Serialize `value` to JSON and send it as a text message.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T) -> Result<(), WsError> {
        let message = serde_json::to_string(value).map_err(|e| WsError::Send(e.to_string()))?;
        self.send_text(message).await
    }

    /// Send a binary message. The engine handles frame splitting; partial
    /// application-level frames are not supported.
    pub async fn send_binary(&self, message: Vec<u8>) -> Result<(), WsError> {
        if !self.is_open() {
            return Err(WsError::Closed);
        }

        self.sink
            .lock()
            .await
            .send(Message::Binary(message.into()))
            .await
            .map_err(|e| WsError::Send(e.to_string()))
    }

    /// Send a close frame with `code` and an optional reason.
    ///
    /// Close handlers fire once the peer acknowledges and the receive loop
    /// observes the closing handshake. Code `1000` is a normal closure,
    /// `1001` means going away.
    pub async fn close(&self, code: u16, reason: Option<&str>) -> Result<(), WsError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.unwrap_or_default().to_string().into(),
        };

        self.sink
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| WsError::Send(e.to_string()))
    }

    /// Subscribe to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.events.subscribe()
    }

    pub(crate) fn closed_signal(&self) -> watch::Receiver<Option<(u16, Option<String>)>> {
        self.closed.clone()
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

    /// Register a handler invoked exactly once when the connection closes.
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

/// The sole owner of the read half. Emits events in receipt order and exactly
/// one Close event, then ends, closing the event channel.
async fn receive_loop(
    mut stream: WsStream,
    events: broadcast::Sender<WsEvent>,
    open: Arc<AtomicBool>,
    closed: watch::Sender<Option<(u16, Option<String>)>>,
) {
    let mut assembler = MessageAssembler::new();
    let mut close_event: Option<WsEvent> = None;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(message) = assembler.push_text(text.to_string(), true) {
                    let _ = events.send(WsEvent::Text(message));
                }
            }
            Ok(Message::Binary(data)) => {
                let message = assembler.push_binary(data.to_vec(), true);
                let _ = events.send(WsEvent::Binary(message));
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = match frame {
                    Some(frame) => (
                        u16::from(frame.code),
                        (!frame.reason.is_empty()).then(|| frame.reason.to_string()),
                    ),
                    None => (ABNORMAL_CLOSURE, None),
                };
                close_event = Some(WsEvent::Close { code, reason });
                break;
            }
            Ok(_) => {} // ping, pong and raw frames
            Err(e) => {
                let _ = events.send(WsEvent::Error(e.to_string()));
                break;
            }
        }
    }

    open.store(false, Ordering::SeqCst);

    let close_event = close_event.unwrap_or(WsEvent::Close {
        code: ABNORMAL_CLOSURE,
        reason: None,
    });
    debug!("WebSocket connection closed: {close_event:?}");
    if let WsEvent::Close { code, reason } = &close_event {
        let _ = closed.send(Some((*code, reason.clone())));
    }
    let _ = events.send(close_event);

    // dropping the sender ends all handler tasks
}
