//! Connection events and handler registration

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::error;

/// An event produced by a connection's receive task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// A complete logical text message (reassembled if it arrived chunked)
    Text(String),
    /// A binary message
    Binary(Vec<u8>),
    /// A receive error; the connection may close afterwards
    Error(String),
    /// The connection closed. Emitted exactly once per connection.
    Close {
        /// The close status code, `1006` when the connection was lost without
        /// a close frame
        code: u16,
        /// The close reason, if the peer supplied one
        reason: Option<String>,
    },
}

/// A predicate deciding whether a text message should be deserialized for a
/// typed handler.
pub type MessageFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Fan-out point for [`WsEvent`]s.
///
/// Each registered handler runs in its own task subscribed to the broadcast
/// channel, so handlers cannot interfere with each other or with the receive
/// loop. Handler tasks end when the connection's channel closes, dropping all
/// handler references.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<WsEvent>,
}

impl EventHub {
    const CHANNEL_CAPACITY: usize = 256;

    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(Self::CHANNEL_CAPACITY);
        Self { sender }
    }

    pub(crate) fn sender(&self) -> broadcast::Sender<WsEvent> {
        self.sender.clone()
    }

    /// Subscribe to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.sender.subscribe()
    }

    /// Register a handler for complete text messages.
    pub fn on_text_message<F>(&self, handler: F)
    where
        F: Fn(String) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let WsEvent::Text(message) = event {
                handler(message);
            }
        });
    }

    /// Register a handler for binary messages.
    pub fn on_binary_message<F>(&self, handler: F)
    where
        F: Fn(Vec<u8>) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let WsEvent::Binary(message) = event {
                handler(message);
            }
        });
    }

    /// Register a handler for receive errors.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(String) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let WsEvent::Error(message) = event {
                handler(message);
            }
        });
    }

    /// Register a handler invoked exactly once when the connection closes.
    pub fn on_close<F>(&self, handler: F)
    where
        F: Fn(u16, Option<String>) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let WsEvent::Close { code, reason } = event {
                handler(code, reason);
            }
        });
    }

    /// Register a typed handler for text messages.
    ///
    /// The handler is called whether deserialization succeeds or fails, with
    /// the decode outcome and the original message. When `filter` is set,
    /// messages it rejects are skipped entirely.
    pub fn on_deserialized_message<T, F>(&self, filter: Option<MessageFilter>, handler: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(Result<T, serde_json::Error>, &str) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let WsEvent::Text(message) = event {
                if filter.as_ref().is_some_and(|filter| !filter(&message)) {
                    return;
                }
                handler(serde_json::from_str(&message), &message);
            }
        });
    }

    /// Register a typed handler that only sees successfully deserialized
    /// messages; decode failures are logged and dropped.
    pub fn on_successfully_deserialized_message<T, F>(
        &self,
        filter: Option<MessageFilter>,
        handler: F,
    ) where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) + Send + 'static,
    {
        self.on_deserialized_message(filter, move |decoded: Result<T, _>, message| {
            match decoded {
                Ok(value) => handler(value),
                Err(cause) => error!("Could not deserialize message '{message}': {cause}"),
            }
        });
    }

    fn spawn_handler<F>(&self, handler: F)
    where
        F: Fn(WsEvent) + Send + 'static,
    {
        let mut receiver = self.sender.subscribe();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => handler(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        error!("Event handler lagged, {skipped} events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use serde::Deserialize;
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_multiple_handlers_all_receive_each_event() {
        let hub = EventHub::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        {
            let first = Arc::clone(&first);
            hub.on_text_message(move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let second = Arc::clone(&second);
            hub.on_text_message(move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::task::yield_now().await;

        hub.sender()
            .send(WsEvent::Text("hello".to_string()))
            .expect("Handlers should be subscribed");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_affect_others() {
        let hub = EventHub::new();
        let (done, mut received) = mpsc::unbounded_channel();

        hub.on_text_message(|_| panic!("deliberately broken handler"));
        hub.on_text_message(move |message| {
            let _ = done.send(message);
        });
        tokio::task::yield_now().await;

        hub.sender()
            .send(WsEvent::Text("still delivered".to_string()))
            .expect("Handlers should be subscribed");

        let message = tokio::time::timeout(Duration::from_secs(1), received.recv())
            .await
            .expect("Second handler should still run")
            .expect("Channel should stay open");
        assert_eq!(message, "still delivered");
    }

    #[tokio::test]
    async fn test_deserialized_handler_surfaces_decode_errors() {
        #[derive(Debug, Deserialize)]
        struct Payload {
            value: i32,
        }

        let hub = EventHub::new();
        let (results, mut received) = mpsc::unbounded_channel();

        hub.on_deserialized_message::<Payload, _>(None, move |decoded, original| {
            let _ = results.send((decoded.map(|p| p.value), original.to_string()));
        });
        tokio::task::yield_now().await;

        let sender = hub.sender();
        sender
            .send(WsEvent::Text(r#"{"value": 7}"#.to_string()))
            .expect("Handler should be subscribed");
        sender
            .send(WsEvent::Text("not json".to_string()))
            .expect("Handler should be subscribed");

        let (first, _) = tokio::time::timeout(Duration::from_secs(1), received.recv())
            .await
            .expect("First message should arrive")
            .expect("Channel should stay open");
        assert_eq!(first.expect("Valid JSON should decode"), 7);

        let (second, original) = tokio::time::timeout(Duration::from_secs(1), received.recv())
            .await
            .expect("Second message should arrive")
            .expect("Channel should stay open");
        assert!(second.is_err());
        assert_eq!(original, "not json");
    }

    #[tokio::test]
    async fn test_filter_skips_unwanted_messages() {
        #[derive(Debug, Deserialize)]
        struct Payload {
            value: i32,
        }

        let hub = EventHub::new();
        let (results, mut received) = mpsc::unbounded_channel();

        hub.on_deserialized_message::<Payload, _>(
            Some(Box::new(|message: &str| message.contains("value"))),
            move |decoded, _| {
                let _ = results.send(decoded.map(|p| p.value));
            },
        );
        tokio::task::yield_now().await;

        let sender = hub.sender();
        sender
            .send(WsEvent::Text("filtered out".to_string()))
            .expect("Handler should be subscribed");
        sender
            .send(WsEvent::Text(r#"{"value": 1}"#.to_string()))
            .expect("Handler should be subscribed");

        let only = tokio::time::timeout(Duration::from_secs(1), received.recv())
            .await
            .expect("Matching message should arrive")
            .expect("Channel should stay open");
        assert_eq!(only.expect("Valid JSON should decode"), 1);
    }
}
