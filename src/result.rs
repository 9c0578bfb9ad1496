//! The discriminated result envelope returned from every call

use tracing::error;

use crate::error::{ClientErrorType, WebClientError};
use crate::response::ResponseDetails;

/// The outcome of one call: either a successfully decoded response or a
/// classified failure, never a propagated error.
///
/// Invariants:
/// - `successful == true` implies a response was received, its status was 2xx,
///   body decoding succeeded, and `error_type`/`error` are unset.
/// - `successful == false` implies at least one of `error_type`/`error` is
///   set, or no response was ever received (`response_details` is `None`).
#[derive(Debug)]
pub struct WebClientResult<T> {
    /// The URL the client requested, a combination of the base URL and the
    /// per-request URL.
    ///
    /// In case of a network error this may be only the (possibly relative)
    /// URL passed to the call, not the URL that was actually attempted.
    pub requested_url: String,
    /// Whether a response was received with a 2xx status and its body decoded
    pub successful: bool,
    /// Details of the response, when one was received
    pub response_details: Option<ResponseDetails>,
    /// The failure classification, when the call failed
    pub error_type: Option<ClientErrorType>,
    /// Details about the failure, when the call failed
    pub error: Option<WebClientError>,
    /// The decoded response body, if any
    pub body: Option<T>,
}

impl<T> WebClientResult<T> {
    /// A successful result carrying the decoded body.
    pub fn success(requested_url: String, details: ResponseDetails, body: T) -> Self {
        Self {
            requested_url,
            successful: true,
            response_details: Some(details),
            error_type: None,
            error: None,
            body: Some(body),
        }
    }

    /// A failed result for a received non-2xx response or a decoding failure.
    pub fn response_error(
        requested_url: String,
        details: ResponseDetails,
        error_type: ClientErrorType,
        error: WebClientError,
    ) -> Self {
        Self {
            requested_url,
            successful: false,
            response_details: Some(details),
            error_type: Some(error_type),
            error: Some(error),
            body: None,
        }
    }

    /// A failed result for a call where no response was received.
    pub fn transport_error(
        requested_url: String,
        error_type: ClientErrorType,
        error: WebClientError,
    ) -> Self {
        Self {
            requested_url,
            successful: false,
            response_details: None,
            error_type: Some(error_type),
            error: Some(error),
            body: None,
        }
    }

    /// The HTTP status code of the response, or `-1` if none was received.
    pub fn status_code(&self) -> i32 {
        self.response_details
            .as_ref()
            .map(|details| i32::from(details.status_code))
            .unwrap_or(-1)
    }

    /// Whether the call succeeded and a body was decoded.
    pub fn successful_and_body_set(&self) -> bool {
        self.successful && self.body.is_some()
    }

    /// Map the body of a successful result through a fallible `mapper`.
    ///
    /// A failed result passes through unchanged (with the new body type). A
    /// mapper failure does not propagate: the result is downgraded to
    /// [`ClientErrorType::MappingError`] while the original
    /// [`ResponseDetails`] are retained unchanged.
    pub fn map_body_if_successful<R, E>(
        self,
        mapper: impl FnOnce(T) -> Result<R, E>,
    ) -> WebClientResult<R>
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.body {
            Some(body) if self.successful => match mapper(body) {
                Ok(mapped) => WebClientResult {
                    requested_url: self.requested_url,
                    successful: self.successful,
                    response_details: self.response_details,
                    error_type: self.error_type,
                    error: self.error,
                    body: Some(mapped),
                },
                Err(cause) => {
                    let cause = cause.into();
                    error!("Could not map response body: {cause}");

                    let status_code = self
                        .response_details
                        .as_ref()
                        .map(|details| details.status_code)
                        .unwrap_or_default();

                    WebClientResult {
                        requested_url: self.requested_url,
                        successful: false,
                        error_type: Some(ClientErrorType::MappingError),
                        error: Some(WebClientError::with_response(
                            "Response body could not be mapped",
                            status_code,
                            None,
                            Some(cause),
                        )),
                        response_details: self.response_details,
                        body: None,
                    }
                }
            },
            _ => self.with_body(None),
        }
    }

    /// Map the body of a successful result through an infallible `mapper`.
    pub fn map_body<R>(mut self, mapper: impl FnOnce(T) -> R) -> WebClientResult<R> {
        let body = self.body.take();
        match body {
            Some(body) if self.successful => {
                let mapped = mapper(body);
                self.with_body(Some(mapped))
            }
            _ => self.with_body(None),
        }
    }

    fn with_body<R>(self, body: Option<R>) -> WebClientResult<R> {
        WebClientResult {
            requested_url: self.requested_url,
            successful: self.successful,
            response_details: self.response_details,
            error_type: self.error_type,
            error: self.error,
            body,
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for WebClientResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self
            .body
            .as_ref()
            .map(|body| body.to_string())
            .unwrap_or_default();

        if self.successful {
            write!(f, "Successful: {} {body}", self.status_code())
        } else if let Some(error) = &self.error {
            // WebClientError already prints the HTTP status code
            write!(f, "Error: {error}")
        } else if let Some(details) = &self.response_details {
            let error_type = self
                .error_type
                .map(|t| t.to_string())
                .unwrap_or_default();
            write!(
                f,
                "Error {error_type} {} {}: {body}",
                self.status_code(),
                details.reason_phrase
            )
        } else {
            let error_type = self
                .error_type
                .map(|t| t.to_string())
                .unwrap_or_default();
            write!(f, "Error {error_type}: {body}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::backends::RawExchange;

    fn details() -> ResponseDetails {
        ResponseDetails::from_exchange(&RawExchange {
            status: 200,
            reason: Some("OK".to_string()),
            http_version: "1.1".to_string(),
            headers: vec![("x-request-id".to_string(), vec!["7".to_string()])],
            body: Vec::new(),
            request_time: SystemTime::now(),
            response_time: SystemTime::now(),
        })
    }

    fn successful_result() -> WebClientResult<String> {
        WebClientResult::success(
            "https://example.com/api".to_string(),
            details(),
            "body".to_string(),
        )
    }

    #[test]
    fn test_success_envelope_invariant() {
        let result = successful_result();

        assert!(result.successful);
        assert!(result.error_type.is_none());
        assert!(result.error.is_none());
        assert!(result.successful_and_body_set());
        assert_eq!(result.status_code(), 200);
    }

    #[test]
    fn test_transport_error_has_no_details_and_sentinel_status() {
        let result: WebClientResult<String> = WebClientResult::transport_error(
            "/relative".to_string(),
            ClientErrorType::NetworkError,
            WebClientError::without_response("connection refused", None),
        );

        assert!(!result.successful);
        assert!(result.response_details.is_none());
        assert_eq!(result.status_code(), -1);
        assert_eq!(result.error_type, Some(ClientErrorType::NetworkError));
    }

    #[test]
    fn test_map_body_identity_preserves_result() {
        let result = successful_result().map_body_if_successful(|body| Ok::<_, String>(body));

        assert!(result.successful);
        assert_eq!(result.body.as_deref(), Some("body"));
        assert_eq!(result.status_code(), 200);
        assert!(result.error_type.is_none());
    }

    #[test]
    fn test_map_body_failure_downgrades_to_mapping_error() {
        let result = successful_result()
            .map_body_if_successful(|_| Err::<String, _>("mapper broke".to_string()));

        assert!(!result.successful);
        assert_eq!(result.error_type, Some(ClientErrorType::MappingError));
        // original response details are retained unchanged
        let retained = result.response_details.expect("Details should be retained");
        assert_eq!(retained.status_code, 200);
        assert_eq!(retained.header("x-request-id"), Some("7"));
        assert!(result.body.is_none());
    }

    #[test]
    fn test_map_body_infallible_transforms_successful_body() {
        let result = successful_result().map_body(|body| body.len());

        assert!(result.successful);
        assert_eq!(result.body, Some(4));
        assert_eq!(result.status_code(), 200);
        assert!(result.error_type.is_none());
    }

    #[test]
    fn test_map_body_infallible_on_failed_result_keeps_failure() {
        let failed: WebClientResult<String> = WebClientResult::transport_error(
            "/x".to_string(),
            ClientErrorType::NetworkError,
            WebClientError::without_response("connection refused", None),
        );

        let mapped = failed.map_body(|body| body.len());

        assert!(!mapped.successful);
        assert_eq!(mapped.error_type, Some(ClientErrorType::NetworkError));
        assert!(mapped.body.is_none());
    }

    #[test]
    fn test_map_body_on_failed_result_passes_failure_through() {
        let failed: WebClientResult<String> = WebClientResult::transport_error(
            "/x".to_string(),
            ClientErrorType::Timeout,
            WebClientError::without_response("timed out", None),
        );

        let mapped: WebClientResult<usize> = failed.map_body_if_successful(|body| Ok::<_, String>(body.len()));

        assert!(!mapped.successful);
        assert_eq!(mapped.error_type, Some(ClientErrorType::Timeout));
        assert!(mapped.body.is_none());
    }

    #[test]
    fn test_display_successful() {
        let display = format!("{}", successful_result());
        assert_eq!(display, "Successful: 200 body");
    }
}
