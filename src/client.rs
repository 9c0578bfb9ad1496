//! The uniform request/response client

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::backends::{RawExchange, ReqwestTransport, Transport, TransportCall};
use crate::config::ClientConfig;
use crate::error::{classify, ClientErrorType, TransportError, WebClientError};
use crate::request::RequestParameters;
use crate::response::ResponseDetails;
use crate::result::WebClientResult;
use crate::sse::SseClient;
use crate::url_builder::build_url;
use crate::ws::{WebSocket, WebSocketConfig, WsError};

type DecodeError = Box<dyn std::error::Error + Send + Sync>;

/// A uniform HTTP client over a pluggable [`Transport`] engine.
///
/// Every call returns a [`WebClientResult`]; ordinary failure modes (timeouts,
/// connection failures, HTTP 4xx/5xx, deserialization failures) never surface
/// as `Err` values or panics, they are classified into the result envelope.
///
/// The client itself is cheap to clone and safe to share: all configuration is
/// read-only after construction and concurrent calls only share the engine's
/// connection pool.
#[derive(Debug, Clone)]
pub struct WebClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Default for WebClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebClient {
    /// Create a client with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the default TLS backend cannot be initialized, like
    /// `reqwest::Client::new` does.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("default client configuration is valid")
    }

    /// Create a client builder.
    pub fn builder() -> WebClientBuilder {
        WebClientBuilder::default()
    }

    /// Create a client from an existing configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // === Request/response calls ===

    /// HEAD request; the response body is ignored.
    pub async fn head(&self, parameters: impl Into<RequestParameters>) -> WebClientResult<()> {
        self.request_unit("HEAD", parameters.into()).await
    }

    /// GET request, decoding the body as JSON into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<T> {
        self.request("GET", parameters.into()).await
    }

    /// GET request returning the body as text, unchanged.
    pub async fn get_text(
        &self,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<String> {
        self.request_text("GET", parameters.into()).await
    }

    /// GET request returning the raw body bytes.
    pub async fn get_bytes(
        &self,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<Vec<u8>> {
        self.request_bytes("GET", parameters.into()).await
    }

    /// POST request, decoding the body as JSON into `T`.
    pub async fn post<T: DeserializeOwned>(
        &self,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<T> {
        self.request("POST", parameters.into()).await
    }

    /// PUT request, decoding the body as JSON into `T`.
    pub async fn put<T: DeserializeOwned>(
        &self,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<T> {
        self.request("PUT", parameters.into()).await
    }

    /// DELETE request, decoding the body as JSON into `T`.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<T> {
        self.request("DELETE", parameters.into()).await
    }

    /// Request with a custom HTTP method, to support verbs like PROPFIND and
    /// REPORT (WebDAV).
    pub async fn custom<T: DeserializeOwned>(
        &self,
        method: &str,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<T> {
        self.request(method, parameters.into()).await
    }

    /// Request with a custom HTTP method, returning the body as text.
    pub async fn custom_text(
        &self,
        method: &str,
        parameters: impl Into<RequestParameters>,
    ) -> WebClientResult<String> {
        self.request_text(method, parameters.into()).await
    }

    /// Any-method request decoding the body as JSON into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        parameters: RequestParameters,
    ) -> WebClientResult<T> {
        self.make_request(method, parameters, |exchange| {
            serde_json::from_slice(&exchange.body).map_err(DecodeError::from)
        })
        .await
    }

    /// Any-method request returning the body as text.
    pub async fn request_text(
        &self,
        method: &str,
        parameters: RequestParameters,
    ) -> WebClientResult<String> {
        self.make_request(method, parameters, |exchange| {
            Ok(String::from_utf8_lossy(&exchange.body).to_string())
        })
        .await
    }

    /// Any-method request returning the raw body bytes, with no text decoding.
    pub async fn request_bytes(
        &self,
        method: &str,
        parameters: RequestParameters,
    ) -> WebClientResult<Vec<u8>> {
        self.make_request(method, parameters, |exchange| Ok(exchange.body.clone()))
            .await
    }

    /// Any-method request ignoring the body bytes.
    pub async fn request_unit(
        &self,
        method: &str,
        parameters: RequestParameters,
    ) -> WebClientResult<()> {
        self.make_request(method, parameters, |_| Ok(())).await
    }

    // === Convenience shorthands ===

    /// Simple GET decoding the body as JSON into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> WebClientResult<T> {
        self.get(RequestParameters::new(url)).await
    }

    /// Simple POST with a JSON body, decoding the response as JSON into `T`.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> WebClientResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let parameters = match RequestParameters::new(url).json_body(body) {
            Ok(parameters) => parameters,
            Err(cause) => {
                return WebClientResult::transport_error(
                    url.to_string(),
                    ClientErrorType::Unknown,
                    WebClientError::without_response(
                        format!("Could not serialize request body: {cause}"),
                        Some(Box::new(cause)),
                    ),
                )
            }
        };

        self.post(parameters).await
    }

    // === Long-lived connections ===

    /// Open a WebSocket connection, merging client defaults (base URL,
    /// authentication, user agent) into `config`.
    pub async fn web_socket(&self, config: WebSocketConfig) -> Result<WebSocket, WsError> {
        let merged = config.merge_defaults(&self.config);
        let url = build_url(
            self.config.base_url.as_deref(),
            &merged.url,
            &merged.query_parameters,
        );

        WebSocket::connect(url, &merged).await
    }

    /// A Server-Sent-Events client sharing this client's configuration.
    ///
    /// The SSE client uses a dedicated engine instance without an overall
    /// request timeout, which would cut long-lived streams short.
    pub fn sse(&self) -> Result<SseClient, TransportError> {
        SseClient::new((*self.config).clone())
    }

    // === Request preparation and response mapping ===

    async fn make_request<T>(
        &self,
        method: &str,
        parameters: RequestParameters,
        decode: impl FnOnce(&RawExchange) -> Result<T, DecodeError>,
    ) -> WebClientResult<T> {
        let requested_url = build_url(
            self.config.base_url.as_deref(),
            &parameters.url,
            &parameters.query_parameters,
        );

        let call = match self.prepare_call(method, &requested_url, &parameters) {
            Ok(call) => call,
            Err(cause) => return self.transport_failure(method, &parameters, cause),
        };

        if self.config.log_outgoing_requests {
            info!("Sending request to {method} {requested_url} ...");
        } else {
            debug!("Sending request to {method} {requested_url} ...");
        }

        match self.transport.send(call).await {
            Ok(exchange) => self.map_response(method, requested_url, &exchange, decode),
            Err(cause) => self.transport_failure(method, &parameters, cause),
        }
    }

    /// Assemble the final headers and body, engine-agnostically.
    fn prepare_call(
        &self,
        method: &str,
        url: &str,
        parameters: &RequestParameters,
    ) -> Result<TransportCall, TransportError> {
        let mut headers = parameters.headers.clone();

        if !parameters.cookies.is_empty() {
            let cookie_header = parameters
                .cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name, cookie.value))
                .collect::<Vec<_>>()
                .join("; ");
            headers.push(("Cookie".to_string(), cookie_header));
        }

        let user_agent = parameters
            .user_agent
            .as_ref()
            .or(self.config.default_user_agent.as_ref());
        if let Some(user_agent) = user_agent {
            headers.push(("User-Agent".to_string(), user_agent.clone()));
        }

        let accept = parameters
            .accept
            .clone()
            .unwrap_or_else(|| self.config.default_accept.clone());
        headers.push(("Accept".to_string(), accept));

        let body = match &parameters.body {
            Some(body) => {
                let content_type = parameters
                    .content_type
                    .clone()
                    .unwrap_or_else(|| self.config.default_content_type.clone());
                headers.push(("Content-Type".to_string(), content_type));

                Some(
                    body.to_bytes()
                        .map_err(|e| TransportError::Build(e.to_string()))?,
                )
            }
            None => None,
        };

        let authentication = parameters
            .authentication
            .as_ref()
            .or(self.config.authentication.as_ref());
        if let Some(authentication) = authentication {
            headers.push(("Authorization".to_string(), authentication.header_value()));
        }

        Ok(TransportCall {
            method: method.to_string(),
            url: url.to_string(),
            headers,
            body,
            request_timeout: parameters.request_timeout,
            compress_body: parameters.compress_body_if_supported,
        })
    }

    /// Build the result envelope for a completed exchange.
    ///
    /// [`ResponseDetails`] are always derived first so that callers can
    /// inspect headers on error paths too.
    fn map_response<T>(
        &self,
        method: &str,
        requested_url: String,
        exchange: &RawExchange,
        decode: impl FnOnce(&RawExchange) -> Result<T, DecodeError>,
    ) -> WebClientResult<T> {
        let details = ResponseDetails::from_exchange(exchange);

        if details.is_success_response() {
            match decode(exchange) {
                Ok(body) => {
                    if self.config.log_successful_responses {
                        info!(
                            "Successful response retrieved from {method} {requested_url}: {} {}",
                            details.status_code, details.reason_phrase
                        );
                    } else {
                        debug!(
                            "Successful response retrieved from {method} {requested_url}: {} {}",
                            details.status_code, details.reason_phrase
                        );
                    }

                    WebClientResult::success(requested_url, details, body)
                }
                Err(cause) => {
                    error!("Error while mapping response of {method} {requested_url}: {cause}");

                    let body_text = String::from_utf8_lossy(&exchange.body).to_string();
                    let error = WebClientError::with_response(
                        cause.to_string(),
                        exchange.status,
                        Some(body_text),
                        Some(cause),
                    );

                    WebClientResult::response_error(
                        requested_url,
                        details,
                        ClientErrorType::DeserializationError,
                        error,
                    )
                }
            }
        } else {
            let body_text = String::from_utf8_lossy(&exchange.body).to_string();
            let error_type = if details.is_server_error_response() {
                ClientErrorType::ServerError
            } else {
                ClientErrorType::ClientError
            };

            if self.config.log_erroneous_responses {
                let preview: String = body_text.chars().take(250).collect();
                let ellipsis = if body_text.chars().count() > 250 { "..." } else { "" };
                info!(
                    "Erroneous response retrieved from {method} {requested_url}: {} {}. Body:\n{preview}{ellipsis}",
                    details.status_code, details.reason_phrase
                );
            }

            let error = WebClientError::with_response(
                format!(
                    "The HTTP response indicated an error: {} {}",
                    details.status_code, details.reason_phrase
                ),
                exchange.status,
                Some(body_text),
                None,
            );

            WebClientResult::response_error(requested_url, details, error_type, error)
        }
    }

    /// Classify a failure for which no response was retrieved.
    fn transport_failure<T>(
        &self,
        method: &str,
        parameters: &RequestParameters,
        cause: TransportError,
    ) -> WebClientResult<T> {
        error!("Error during request to {method} {}: {cause}", parameters.url);

        let (recovered_url, error_type) = classify(&cause);
        let message = cause.to_string();

        // might not be the absolute URL but only the relative one the caller
        // passed in
        WebClientResult::transport_error(
            recovered_url.unwrap_or_else(|| parameters.url.clone()),
            error_type,
            WebClientError::without_response(message, Some(Box::new(cause))),
        )
    }
}

/// Builder for a [`WebClient`].
#[derive(Debug, Default)]
pub struct WebClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl WebClientBuilder {
    /// Base URL prepended to relative request URLs.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Default authentication for all calls.
    pub fn authentication(mut self, authentication: crate::auth::Authentication) -> Self {
        self.config.authentication = Some(authentication);
        self
    }

    /// Skip TLS certificate verification where the engine supports it.
    pub fn ignore_certificate_errors(mut self, ignore: bool) -> Self {
        self.config.ignore_certificate_errors = ignore;
        self
    }

    /// Default `User-Agent`. `None` sends no user agent.
    pub fn default_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.config.default_user_agent = user_agent;
        self
    }

    /// Default `Content-Type` for request bodies.
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.default_content_type = content_type.into();
        self
    }

    /// Default `Accept` header.
    pub fn default_accept(mut self, accept: impl Into<String>) -> Self {
        self.config.default_accept = accept.into();
        self
    }

    /// Default connect timeout.
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Default socket (read) timeout.
    pub fn socket_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.socket_timeout = Some(timeout);
        self
    }

    /// Default overall request timeout.
    pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Log outgoing requests and responses at info level.
    pub fn log_requests(mut self, log: bool) -> Self {
        self.config.log_outgoing_requests = log;
        self.config.log_successful_responses = log;
        self.config.log_erroneous_responses = log;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom [`Transport`] engine instead of the default reqwest one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<WebClient, TransportError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        Ok(WebClient {
            config: Arc::new(self.config),
            transport,
        })
    }
}

/// Convenience function for a one-off GET request with a default client.
pub async fn fetch<T: DeserializeOwned>(url: &str) -> WebClientResult<T> {
    WebClient::new().fetch(url).await
}
