//! WebSocket client with frame reassembly and automatic reconnection
//!
//! A single receive task owns each connection and pushes [`WsEvent`]s onto a
//! broadcast channel; registering a handler subscribes to that channel, so
//! handlers need no shared-list synchronization and one misbehaving handler
//! cannot affect the others or the connection.

mod assembler;
mod error;
mod events;
mod native;
mod reconnect;

pub(crate) use assembler::MessageAssembler;
pub use error::WsError;
pub use events::{EventHub, MessageFilter, WsEvent};
pub use native::WebSocket;
pub use reconnect::{ConnectFuture, ReconnectingWebSocket, ShouldReconnect};

use crate::auth::Authentication;
use crate::config::ClientConfig;
use crate::cookie::Cookie;

/// Configuration for one WebSocket connection.
///
/// Settings left unset fall back to the owning client's
/// [`ClientConfig`] defaults when opened through
/// [`WebClient::web_socket`](crate::WebClient::web_socket).
#[derive(Debug, Clone, Default)]
pub struct WebSocketConfig {
    /// Absolute `ws`/`wss` URL, or one relative to the client's base URL
    pub url: String,
    /// Authentication for the upgrade request
    pub authentication: Option<Authentication>,
    /// Query parameters appended to the URL in order
    pub query_parameters: Vec<(String, String)>,
    /// Additional headers for the upgrade request
    pub headers: Vec<(String, String)>,
    /// `User-Agent` for the upgrade request
    pub user_agent: Option<String>,
    /// Cookies sent with the upgrade request
    pub cookies: Vec<Cookie>,
}

impl WebSocketConfig {
    /// Configuration for `url` with all other settings defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Fill unset fields from the client-level defaults.
    pub(crate) fn merge_defaults(mut self, config: &ClientConfig) -> Self {
        if self.user_agent.is_none() {
            self.user_agent = config.default_user_agent.clone();
        }
        if self.authentication.is_none() {
            self.authentication = config.authentication.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_defaults_fills_unset_fields() {
        let config = ClientConfig {
            authentication: Some(Authentication::bearer("default")),
            ..ClientConfig::default()
        };

        let merged = WebSocketConfig::new("wss://example.com/ws").merge_defaults(&config);

        assert_eq!(merged.authentication, Some(Authentication::bearer("default")));
        assert_eq!(merged.user_agent, config.default_user_agent);
    }

    #[test]
    fn test_merge_defaults_keeps_explicit_settings() {
        let config = ClientConfig {
            authentication: Some(Authentication::bearer("default")),
            ..ClientConfig::default()
        };

        let explicit = WebSocketConfig {
            url: "wss://example.com/ws".to_string(),
            authentication: Some(Authentication::bearer("explicit")),
            ..WebSocketConfig::default()
        };
        let merged = explicit.merge_defaults(&config);

        assert_eq!(
            merged.authentication,
            Some(Authentication::bearer("explicit"))
        );
    }
}
