//! Uniform HTTP client convenience layer
//!
//! This crate wraps an HTTP engine behind the [`Transport`] trait and maps
//! every request outcome, success or failure, into a single
//! [`WebClientResult`] envelope with a classified [`ClientErrorType`], so
//! callers never handle engine-specific errors. It also covers URL building
//! against a base URL, authentication, cookies, WebSocket connections with
//! automatic reconnection and Server-Sent Events.
//!
//! # Example
//!
//! ```no_run
//! use web_client::{WebClient, WebClientResult};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ApiResponse {
//!     message: String,
//! }
//!
//! async fn example() -> WebClientResult<ApiResponse> {
//!     let client = WebClient::builder()
//!         .base_url("https://api.example.com")
//!         .build()
//!         .unwrap();
//!     client.fetch("/data").await
//! }
//! ```

mod auth;
mod backends;
mod client;
mod config;
pub mod content_types;
mod cookie;
mod error;
mod header;
mod request;
mod response;
mod result;
pub mod sse;
mod url_builder;
pub mod ws;

pub use auth::Authentication;
pub use backends::{RawExchange, ReqwestTransport, Transport, TransportCall};
pub use client::{fetch, WebClient, WebClientBuilder};
pub use config::ClientConfig;
pub use cookie::Cookie;
pub use error::{classify, ClientErrorType, TransportError, WebClientError};
pub use header::{parse_link_header, parse_retry_after_seconds, LinkHeader};
pub use request::{RequestBody, RequestParameters, DEFAULT_MOBILE_USER_AGENT, DEFAULT_USER_AGENT};
pub use response::ResponseDetails;
pub use result::WebClientResult;
pub use url_builder::build_url;
