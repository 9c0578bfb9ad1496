//! Error taxonomy and transport failure classification

use thiserror::Error;

/// The closed set of failure kinds a [`WebClientResult`](crate::WebClientResult)
/// can carry. Exactly one is set per failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorType {
    /// The connection could not be established (refused, DNS failure, ...)
    NetworkError,
    /// Connect, socket or overall request timeout exceeded
    Timeout,
    /// A response with a 4xx status was received
    ClientError,
    /// A response with a 5xx status was received
    ServerError,
    /// The server answered successfully but the body could not be decoded
    DeserializationError,
    /// A post-hoc body mapping of an already successful result failed
    MappingError,
    /// Anything the classifier could not recognize
    Unknown,
}

impl std::fmt::Display for ClientErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NetworkError => "NetworkError",
            Self::Timeout => "Timeout",
            Self::ClientError => "ClientError",
            Self::ServerError => "ServerError",
            Self::DeserializationError => "DeserializationError",
            Self::MappingError => "MappingError",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Details of a failed call: a human-readable message, the HTTP status code if
/// a response was received (`-1` otherwise), the raw response body if one was
/// read, and the causing error if any.
#[derive(Debug, Error)]
#[error("{status_code} {message}")]
pub struct WebClientError {
    /// Human-readable error message
    pub message: String,
    /// HTTP status code of the response, or `-1` if none was received
    pub status_code: i32,
    /// The raw response body text, if one was read
    pub response_body: Option<String>,
    /// The underlying error, if any
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl WebClientError {
    /// An error for which no response was received (`status_code` is `-1`)
    pub fn without_response(
        message: impl Into<String>,
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            status_code: -1,
            response_body: None,
            cause,
        }
    }

    /// An error carrying a received response's status and body
    pub fn with_response(
        message: impl Into<String>,
        status_code: u16,
        response_body: Option<String>,
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            status_code: i32::from(status_code),
            response_body,
            cause,
        }
    }

    /// Whether the embedded status code is a 4xx
    pub fn is_client_error(&self) -> bool {
        (400..=499).contains(&self.status_code)
    }

    /// Whether the embedded status code is a 5xx
    pub fn is_server_error(&self) -> bool {
        (500..=599).contains(&self.status_code)
    }
}

/// A failure reported by the transport before or instead of a response.
///
/// Engine adapters normalize their library's error values into this shape so
/// that [`classify`] stays engine-agnostic. When the engine has structured
/// request context, the adapter fills `url` and the classifier never has to
/// fall back to scanning the message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect, socket or overall request timeout exceeded
    #[error("Request timeout: {message}")]
    Timeout {
        /// The engine's error message
        message: String,
        /// The requested URL, when the engine provides it
        url: Option<String>,
    },
    /// The connection could not be established
    #[error("Connection error: {message}")]
    Connection {
        /// The engine's error message
        message: String,
    },
    /// The engine itself rejected the request with a received response
    #[error("HTTP error ({status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The engine's error message
        message: String,
        /// The requested URL, when the engine provides it
        url: Option<String>,
    },
    /// The request could not be built (invalid URL, bad header value, ...)
    #[error("Request build error: {0}")]
    Build(String),
    /// Any other failure
    #[error("{message}")]
    Other {
        /// The engine's error message
        message: String,
        /// The requested URL, when the engine provides it
        url: Option<String>,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string());

        if err.is_timeout() {
            TransportError::Timeout {
                message: err.to_string(),
                url,
            }
        } else if err.is_connect() {
            TransportError::Connection {
                message: full_message(&err),
            }
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                message: err.to_string(),
                url,
            }
        } else {
            TransportError::Other {
                message: full_message(&err),
                url,
            }
        }
    }
}

/// Render an error with its whole source chain, so that substring matching in
/// [`classify`] sees the underlying io error's phrasing too.
fn full_message(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Message fragments that identify a connection-level failure across engines
/// and platforms (case-insensitive match).
const NETWORK_ERROR_FRAGMENTS: &[&str] = &[
    "connection failed",
    "connection refused",
    "fail to fetch",     // browsers
    "could not connect", // Apple systems
    "dns error",
    "tcp connect error",
];

/// Classify a transport failure into exactly one [`ClientErrorType`], together
/// with the requested URL if it could be recovered.
///
/// Never panics and never fails: anything unrecognized becomes
/// [`ClientErrorType::Unknown`].
pub fn classify(error: &TransportError) -> (Option<String>, ClientErrorType) {
    match error {
        TransportError::Timeout { message, url } => (
            url.clone().or_else(|| extract_requested_url(message)),
            ClientErrorType::Timeout,
        ),
        TransportError::Connection { .. } => (None, ClientErrorType::NetworkError),
        TransportError::Status { status, url, .. } => {
            let error_type = if (400..=499).contains(status) {
                ClientErrorType::ClientError
            } else if (500..=599).contains(status) {
                ClientErrorType::ServerError
            } else {
                ClientErrorType::Unknown
            };
            (url.clone(), error_type)
        }
        TransportError::Build(_) => (None, ClientErrorType::ClientError),
        TransportError::Other { message, url } => {
            if is_network_error_message(message) {
                (None, ClientErrorType::NetworkError)
            } else {
                (
                    url.clone().or_else(|| extract_requested_url(message)),
                    ClientErrorType::Unknown,
                )
            }
        }
    }
}

fn is_network_error_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    NETWORK_ERROR_FRAGMENTS
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Best-effort scan of an opaque engine error message for an embedded
/// `[url=...]` marker, bounded by the next `", "` delimiter.
///
/// Inherently fragile; kept behind the classifier so engines with structured
/// error data bypass it entirely.
fn extract_requested_url(message: &str) -> Option<String> {
    let start = message.find("[url=")? + "[url=".len();
    let end = message[start..].find(", ")? + start;

    if end > start {
        Some(message[start..end].to_string())
    } else {
        None
    }
}
