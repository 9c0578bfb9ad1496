//! Client-level configuration shared by all calls on one client instance

use std::time::Duration;

use crate::auth::Authentication;
use crate::content_types;
use crate::request::DEFAULT_USER_AGENT;

/// Configuration for a [`WebClient`](crate::WebClient), created once at client
/// construction and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL prepended to relative request URLs
    pub base_url: Option<String>,
    /// Default authentication, applied when a request sets none
    pub authentication: Option<Authentication>,
    /// Skip TLS certificate verification.
    ///
    /// Engines that cannot support this treat it as a no-op rather than
    /// failing the request.
    pub ignore_certificate_errors: bool,
    /// Default `User-Agent` header
    pub default_user_agent: Option<String>,
    /// Default `Content-Type` for request bodies
    pub default_content_type: String,
    /// Default `Accept` header
    pub default_accept: String,
    /// Default connect timeout.
    ///
    /// Kept short by default for a fast result when connecting is not
    /// possible.
    pub connect_timeout: Option<Duration>,
    /// Default socket (read) timeout
    pub socket_timeout: Option<Duration>,
    /// Default overall request timeout
    pub request_timeout: Option<Duration>,
    /// Log each outgoing request at info level (debug otherwise)
    pub log_outgoing_requests: bool,
    /// Log successful responses at info level (debug otherwise)
    pub log_successful_responses: bool,
    /// Log erroneous responses at info level (debug otherwise)
    pub log_erroneous_responses: bool,
    /// Log long-lived connection status changes at info level (debug otherwise)
    pub log_stream_status: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            authentication: None,
            ignore_certificate_errors: false,
            default_user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            default_content_type: content_types::JSON.to_string(),
            default_accept: content_types::JSON.to_string(),
            connect_timeout: Some(Duration::from_secs(5)),
            socket_timeout: None,
            request_timeout: Some(Duration::from_secs(15)),
            log_outgoing_requests: false,
            log_successful_responses: false,
            log_erroneous_responses: false,
            log_stream_status: false,
        }
    }
}

impl std::fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "base_url = {:?}, authentication set = {}, ignore_certificate_errors = {}",
            self.base_url,
            self.authentication.is_some(),
            self.ignore_certificate_errors
        )
    }
}
