//! Well-known MIME type constants

/// `application/json`
pub const JSON: &str = "application/json";

/// `application/xml`
pub const XML: &str = "application/xml";

/// `text/plain`
pub const PLAIN_TEXT: &str = "text/plain";

/// `text/html`
pub const HTML: &str = "text/html";

/// `application/octet-stream`
pub const OCTET_STREAM: &str = "application/octet-stream";

/// `application/x-www-form-urlencoded`
pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// `multipart/form-data`
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// `text/event-stream`, the content type of Server-Sent-Event streams
pub const EVENT_STREAM: &str = "text/event-stream";
