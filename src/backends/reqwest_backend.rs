//! reqwest-based [`Transport`] implementation

use std::time::SystemTime;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use super::{RawExchange, Transport, TransportCall};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// The default transport, backed by a shared `reqwest::Client` and its
/// connection pool.
///
/// reqwest has no request-body compression, so [`TransportCall::compress_body`]
/// is a no-op here.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration.
    ///
    /// Applies the certificate-trust override and the default connect, read
    /// and overall timeouts. Per-request timeout overrides are applied in
    /// [`send`](Transport::send); reqwest cannot override connect and read
    /// timeouts per request, those keep the client-level defaults.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.ignore_certificate_errors);

        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(socket_timeout) = config.socket_timeout {
            builder = builder.read_timeout(socket_timeout);
        }
        if let Some(request_timeout) = config.request_timeout {
            builder = builder.timeout(request_timeout);
        }

        let inner = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, call: TransportCall) -> Result<RawExchange, TransportError> {
        let method = Method::from_bytes(call.method.as_bytes())
            .map_err(|e| TransportError::Build(format!("invalid HTTP method: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &call.headers {
            let name = name
                .parse::<HeaderName>()
                .map_err(|e| TransportError::Build(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Build(format!("invalid header value: {e}")))?;
            headers.append(name, value);
        }

        let mut request = self.inner.request(method, &call.url).headers(headers);

        if let Some(body) = call.body {
            request = request.body(body);
        }
        if let Some(timeout) = call.request_timeout {
            request = request.timeout(timeout);
        }

        let request_time = SystemTime::now();
        let response = request.send().await.map_err(TransportError::from)?;
        let response_time = SystemTime::now();

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);
        let http_version = format_version(response.version());
        let header_multimap = collect_headers(response.headers());

        let body = response
            .bytes()
            .await
            .map_err(TransportError::from)?
            .to_vec();

        Ok(RawExchange {
            status: status.as_u16(),
            reason,
            http_version,
            headers: header_multimap,
            body,
            request_time,
            response_time,
        })
    }
}

/// Group repeated headers into a name → ordered-values multimap, preserving
/// first-seen name order.
fn collect_headers(headers: &HeaderMap) -> Vec<(String, Vec<String>)> {
    let mut multimap: Vec<(String, Vec<String>)> = Vec::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        match multimap.iter_mut().find(|(existing, _)| existing == name.as_str()) {
            Some((_, values)) => values.push(value),
            None => multimap.push((name.as_str().to_string(), vec![value])),
        }
    }

    multimap
}

fn format_version(version: reqwest::Version) -> String {
    match version {
        reqwest::Version::HTTP_09 => "0.9".to_string(),
        reqwest::Version::HTTP_10 => "1.0".to_string(),
        reqwest::Version::HTTP_11 => "1.1".to_string(),
        reqwest::Version::HTTP_2 => "2.0".to_string(),
        reqwest::Version::HTTP_3 => "3.0".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_builds_from_default_config() {
        let transport = ReqwestTransport::new(&ClientConfig::default());
        assert!(transport.is_ok());
    }

    #[test]
    fn test_transport_accepts_certificate_override() {
        let config = ClientConfig {
            ignore_certificate_errors: true,
            ..ClientConfig::default()
        };
        assert!(ReqwestTransport::new(&config).is_ok());
    }

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(reqwest::Version::HTTP_11), "1.1");
        assert_eq!(format_version(reqwest::Version::HTTP_2), "2.0");
    }
}
