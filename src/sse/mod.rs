//! Server-Sent Events client
//!
//! Each subscription runs in its own task that re-requests the stream
//! whenever it ends or fails, sending the `Last-Event-ID` header so the
//! server can resume where the previous stream left off. The task lives
//! until [`SseConnection::close`] is called.

mod event;
mod parser;

pub use event::ServerSentEvent;
pub use parser::SseParser;

use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::content_types::EVENT_STREAM;
use crate::error::TransportError;
use crate::url_builder::build_url;

/// Client for `text/event-stream` endpoints.
///
/// Uses its own engine instance without an overall request timeout, which
/// would cut long-lived streams short; only the connect timeout applies.
#[derive(Debug, Clone)]
pub struct SseClient {
    client: reqwest::Client,
    config: ClientConfig,
}

/// Handle to a running SSE subscription.
#[derive(Debug)]
pub struct SseConnection {
    handle: JoinHandle<()>,
}

impl SseConnection {
    /// Whether the subscription task is still running.
    pub fn is_open(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the subscription, dropping the current stream.
    pub fn close(&self) {
        self.handle.abort();
    }
}

impl SseClient {
    /// Create a client sharing `config`'s connection settings.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(config.ignore_certificate_errors);

        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Subscribe to `url`, invoking `handler` for each received event.
    ///
    /// `url` may be relative to the client's base URL. The subscription
    /// reconnects on stream end or error until the returned connection is
    /// closed.
    pub fn listen<F>(&self, url: impl Into<String>, handler: F) -> SseConnection
    where
        F: Fn(ServerSentEvent) + Send + 'static,
    {
        self.listen_with_headers(url, Vec::new(), handler)
    }

    /// Like [`listen`](Self::listen), with additional request headers sent on
    /// every (re)connect.
    pub fn listen_with_headers<F>(
        &self,
        url: impl Into<String>,
        headers: Vec<(String, String)>,
        handler: F,
    ) -> SseConnection
    where
        F: Fn(ServerSentEvent) + Send + 'static,
    {
        let url = build_url(self.config.base_url.as_deref(), &url.into(), &[]);
        let client = self.client.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            subscription_loop(client, config, url, headers, handler).await;
        });

        SseConnection { handle }
    }

    /// Subscribe to `url`, receiving events over a channel instead of a
    /// callback. Events are dropped with an error log when the receiver
    /// falls more than the channel capacity behind.
    pub fn events(
        &self,
        url: impl Into<String>,
    ) -> (SseConnection, mpsc::Receiver<ServerSentEvent>) {
        let (sender, receiver) = mpsc::channel(256);

        let connection = self.listen(url, move |event| {
            if sender.try_send(event).is_err() {
                error!("SSE receiver not keeping up, dropping event");
            }
        });

        (connection, receiver)
    }
}

async fn subscription_loop<F>(
    client: reqwest::Client,
    config: ClientConfig,
    url: String,
    headers: Vec<(String, String)>,
    handler: F,
) where
    F: Fn(ServerSentEvent) + Send + 'static,
{
    let mut last_event_id: Option<String> = None;

    loop {
        let mut request = client.get(&url).header(ACCEPT, EVENT_STREAM);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(user_agent) = &config.default_user_agent {
            request = request.header(USER_AGENT, user_agent);
        }
        if let Some(authentication) = &config.authentication {
            request = request.header(AUTHORIZATION, authentication.header_value());
        }
        if let Some(id) = &last_event_id {
            request = request.header("Last-Event-ID", id);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                if config.log_stream_status {
                    debug!("Connected to SSE stream {url}");
                }

                let mut parser = SseParser::new();
                let mut stream = response.bytes_stream();

                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(bytes) => {
                            for event in parser.push(&bytes) {
                                if let Some(id) = &event.id {
                                    if !id.is_empty() {
                                        last_event_id = Some(id.clone());
                                    }
                                }
                                handler(event);
                            }
                        }
                        Err(e) => {
                            error!("Error reading SSE stream {url}: {e}");
                            break;
                        }
                    }
                }

                if config.log_stream_status {
                    debug!("SSE stream {url} ended, reconnecting");
                }
            }
            Ok(response) => {
                error!(
                    "SSE endpoint {url} responded with {}, reconnecting",
                    response.status()
                );
            }
            Err(e) => {
                error!("Could not connect to SSE stream {url}: {e}");
            }
        }
    }
}
