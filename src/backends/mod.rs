//! Transport engine adapters
//!
//! The response mapper and error classifier are engine-agnostic: they operate
//! on the normalized [`RawExchange`] / [`TransportError`] shapes produced by a
//! thin per-engine [`Transport`] implementation.

pub mod reqwest_backend;

use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::TransportError;
pub use reqwest_backend::ReqwestTransport;

/// A fully prepared call handed to a transport: the final URL and every header
/// already assembled, so engines only perform the I/O.
#[derive(Debug, Clone)]
pub struct TransportCall {
    /// HTTP method, upper-case
    pub method: String,
    /// The final absolute URL
    pub url: String,
    /// All headers in send order, including auth, cookies and content
    /// negotiation
    pub headers: Vec<(String, String)>,
    /// The serialized request body, if any
    pub body: Option<Vec<u8>>,
    /// Overall request timeout for this call, if overridden
    pub request_timeout: Option<std::time::Duration>,
    /// Whether the caller allows the request body to be compressed. Engines
    /// without request-body compression treat this as a no-op.
    pub compress_body: bool,
}

/// The normalized outcome of a completed HTTP exchange, success or HTTP-level
/// error alike.
#[derive(Debug, Clone)]
pub struct RawExchange {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase, when the engine knows one
    pub reason: Option<String>,
    /// HTTP protocol version, e.g. `1.1`
    pub http_version: String,
    /// Response headers as a name → ordered-values multimap, since headers
    /// like `Set-Cookie` repeat
    pub headers: Vec<(String, Vec<String>)>,
    /// The raw response body
    pub body: Vec<u8>,
    /// When the request was sent
    pub request_time: SystemTime,
    /// When the response arrived
    pub response_time: SystemTime,
}

/// The capability required from an HTTP engine:
/// `send(call) -> exchange-or-error`.
///
/// Implementations translate [`TransportCall`] into their library's request
/// shape, perform the I/O and normalize the outcome. They must not interpret
/// status codes; HTTP-level errors are returned as a successful
/// [`RawExchange`] carrying the 4xx/5xx status.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Execute one HTTP call.
    async fn send(&self, call: TransportCall) -> Result<RawExchange, TransportError>;
}
