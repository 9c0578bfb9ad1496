//! Per-call request description

use std::time::Duration;

use serde::Serialize;

use crate::auth::Authentication;
use crate::cookie::Cookie;

/// The default desktop user agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// A mobile user agent, for endpoints that serve different content to phones.
pub const DEFAULT_MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Mobile Safari/537.36";

/// A request body in one of the supported shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw text, sent unchanged
    Text(String),
    /// Raw bytes, sent unchanged
    Bytes(Vec<u8>),
    /// A JSON value, serialized on send
    Json(serde_json::Value),
}

impl RequestBody {
    /// Serialize any `Serialize` value into a JSON request body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// The body as bytes, serializing JSON values.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Json(value) => serde_json::to_vec(value),
        }
    }
}

/// Immutable description of one HTTP call.
///
/// Constructed per call via the chained builder methods; the desired response
/// body type is chosen by the [`WebClient`](crate::WebClient) method the
/// parameters are passed to (`get::<T>`, `get_text`, `get_bytes`, `head`).
///
/// All optional settings fall back to the client-level
/// [`ClientConfig`](crate::ClientConfig) defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    /// Absolute URL, or one relative to the client's base URL
    pub url: String,
    /// Optional request body
    pub body: Option<RequestBody>,
    /// `Content-Type` of the body, overriding the client default
    pub content_type: Option<String>,
    /// `Accept` header, overriding the client default
    pub accept: Option<String>,
    /// Additional headers, sent in the given order and casing
    pub headers: Vec<(String, String)>,
    /// Query parameters, appended to the URL in the given order
    pub query_parameters: Vec<(String, String)>,
    /// Cookies sent with the request
    pub cookies: Vec<Cookie>,
    /// `User-Agent`, overriding the client default
    pub user_agent: Option<String>,
    /// Authentication for this single call, overriding the client default
    pub authentication: Option<Authentication>,
    /// Connect timeout, overriding the client default
    pub connect_timeout: Option<Duration>,
    /// Socket (read) timeout, overriding the client default
    pub socket_timeout: Option<Duration>,
    /// Overall request timeout, overriding the client default
    pub request_timeout: Option<Duration>,
    /// Compress the request body if the engine supports it
    pub compress_body_if_supported: bool,
}

impl RequestParameters {
    /// Parameters for a call to `url` with all other settings defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the request body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `value` to JSON and use it as the request body.
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(RequestBody::json(value)?);
        Ok(self)
    }

    /// Set the `Content-Type` of the body.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the `Accept` header.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter. Parameters keep their insertion order.
    pub fn query_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters.push((name.into(), value.into()));
        self
    }

    /// Add a cookie.
    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Set the `User-Agent` for this call.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Authenticate this single call, overriding the client default.
    pub fn authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// Basic auth shorthand for this call.
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.authentication(Authentication::basic(username, password))
    }

    /// Bearer token shorthand for this call.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.authentication(Authentication::bearer(token))
    }

    /// Override the connect timeout for this call.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Override the socket (read) timeout for this call.
    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    /// Override the overall request timeout for this call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Compress the request body if the engine supports it.
    pub fn compress_body_if_supported(mut self, compress: bool) -> Self {
        self.compress_body_if_supported = compress;
        self
    }
}

impl From<&str> for RequestParameters {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for RequestParameters {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}
