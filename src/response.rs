//! Derived view of a completed HTTP exchange

use std::time::SystemTime;

use crate::backends::RawExchange;
use crate::cookie::Cookie;
use crate::header::{parse_link_header, parse_retry_after_seconds, LinkHeader};

/// Metadata of a completed HTTP exchange.
///
/// Built once per exchange, for success and HTTP-level error responses alike,
/// so callers can inspect headers on error paths too. All derived fields are
/// computed at construction; the value is immutable afterwards.
///
/// Header lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct ResponseDetails {
    /// HTTP status code
    pub status_code: u16,
    /// Reason phrase, e.g. `Not Found`
    pub reason_phrase: String,
    /// HTTP protocol version, e.g. `1.1`
    pub http_version: String,
    /// Headers as a name → ordered-values multimap, in receipt order
    pub headers: Vec<(String, Vec<String>)>,
    /// Cookies parsed from `Set-Cookie` headers
    pub cookies: Vec<Cookie>,
    /// `Content-Type` without its parameters, e.g. `application/json`
    pub content_type: Option<String>,
    /// `Content-Length` in bytes, if the server sent one
    pub content_length: Option<u64>,
    /// Charset from the `Content-Type` parameters, e.g. `utf-8`
    pub charset: Option<String>,
    /// When the request was sent
    pub request_time: SystemTime,
    /// When the response arrived
    pub response_time: SystemTime,
}

impl ResponseDetails {
    /// Derive the details from a normalized exchange.
    pub(crate) fn from_exchange(exchange: &RawExchange) -> Self {
        let headers = exchange.headers.clone();

        let (content_type, charset) = match first_header(&headers, "content-type") {
            Some(value) => parse_content_type(value),
            None => (None, None),
        };

        let content_length =
            first_header(&headers, "content-length").and_then(|v| v.trim().parse().ok());

        let cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("set-cookie"))
            .flat_map(|(_, values)| values.iter())
            .filter_map(|value| Cookie::parse_set_cookie(value))
            .collect();

        Self {
            status_code: exchange.status,
            reason_phrase: exchange.reason.clone().unwrap_or_default(),
            http_version: exchange.http_version.clone(),
            headers,
            cookies,
            content_type,
            content_length,
            charset,
            request_time: exchange.request_time,
            response_time: exchange.response_time,
        }
    }

    /// All values of a header, case-insensitive, in receipt order.
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// The first value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// Whether the status code is in `200..=299`.
    pub fn is_success_response(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    /// Whether the status code is in `400..=499`.
    pub fn is_client_error_response(&self) -> bool {
        (400..=499).contains(&self.status_code)
    }

    /// Whether the status code is in `500..=599`.
    pub fn is_server_error_response(&self) -> bool {
        (500..=599).contains(&self.status_code)
    }

    /// The parsed entries of the `Link` header, in order. Empty when the
    /// header is absent.
    pub fn link_headers(&self) -> Vec<LinkHeader> {
        self.header("link").map(parse_link_header).unwrap_or_default()
    }

    /// The `Retry-After` header as seconds, accepting both the delta-seconds
    /// and the HTTP-date form.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        self.header("retry-after").and_then(parse_retry_after_seconds)
    }

    /// The request time as an HTTP-date string.
    pub fn request_time_http_date(&self) -> String {
        httpdate::fmt_http_date(self.request_time)
    }

    /// The response time as an HTTP-date string.
    pub fn response_time_http_date(&self) -> String {
        httpdate::fmt_http_date(self.response_time)
    }
}

fn first_header<'a>(headers: &'a [(String, Vec<String>)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

/// Split a `Content-Type` value into the bare MIME type and the charset
/// parameter, if present.
fn parse_content_type(value: &str) -> (Option<String>, Option<String>) {
    let mut parts = value.split(';');

    let mime = parts
        .next()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let charset = parts
        .filter_map(|parameter| parameter.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string());

    (mime, charset)
}

impl std::fmt::Display for ResponseDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code, self.reason_phrase)?;
        if let Some(content_type) = &self.content_type {
            write!(f, " {content_type}")?;
        }
        Ok(())
    }
}
