//! Cookie value type used for outgoing requests and parsed `Set-Cookie` headers

use std::time::SystemTime;

/// An HTTP cookie.
///
/// Used in both directions: attached to outgoing requests via
/// [`RequestParameters`](crate::RequestParameters) and parsed from `Set-Cookie`
/// response headers into [`ResponseDetails`](crate::ResponseDetails).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// The domain the cookie applies to, if restricted
    pub domain: Option<String>,
    /// The path the cookie applies to, if restricted
    pub path: Option<String>,
    /// Expiry as Unix milliseconds, if the cookie is not a session cookie
    pub expires_at: Option<i64>,
    /// Only sent over TLS connections
    pub secure: bool,
    /// Not accessible to scripts
    pub http_only: bool,
    /// Outlives the session (an `Expires` or `Max-Age` attribute was present)
    pub persistent: bool,
    /// Only sent to the exact host that set it (no `Domain` attribute)
    pub host_only: bool,
}

impl Cookie {
    /// Create a session cookie with just a name and value
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Parse a single `Set-Cookie` header value.
    ///
    /// Returns `None` if the header has no `name=value` pair. Unknown
    /// attributes are ignored.
    pub fn parse_set_cookie(header: &str) -> Option<Self> {
        let mut parts = header.split(';');

        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::new(name, value.trim());
        cookie.host_only = true;

        for attribute in parts {
            let attribute = attribute.trim();
            let (key, attr_value) = match attribute.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attribute, None),
            };

            match key.to_ascii_lowercase().as_str() {
                "domain" => {
                    if let Some(domain) = attr_value.filter(|v| !v.is_empty()) {
                        cookie.domain = Some(domain.trim_start_matches('.').to_string());
                        cookie.host_only = false;
                    }
                }
                "path" => cookie.path = attr_value.map(str::to_string),
                "expires" => {
                    if let Some(expires) = attr_value.and_then(|v| httpdate::parse_http_date(v).ok())
                    {
                        cookie.expires_at = unix_millis(expires);
                        cookie.persistent = true;
                    }
                }
                "max-age" => {
                    if let Some(seconds) = attr_value.and_then(|v| v.parse::<i64>().ok()) {
                        let now = unix_millis(SystemTime::now()).unwrap_or(0);
                        cookie.expires_at = Some(now + seconds * 1000);
                        cookie.persistent = true;
                    }
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        Some(cookie)
    }
}

fn unix_millis(time: SystemTime) -> Option<i64> {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as i64)
}

impl std::fmt::Display for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_value() {
        let cookie = Cookie::parse_set_cookie("session=abc123").expect("Cookie should parse");

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert!(cookie.host_only);
        assert!(!cookie.persistent);
    }

    #[test]
    fn test_parse_attributes() {
        let cookie = Cookie::parse_set_cookie(
            "id=a3fWa; Expires=Wed, 21 Oct 2015 07:28:00 GMT; Secure; HttpOnly; Path=/; Domain=example.com",
        )
        .expect("Cookie should parse");

        assert_eq!(cookie.name, "id");
        assert_eq!(cookie.value, "a3fWa");
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert!(cookie.persistent);
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert!(!cookie.host_only);
        assert!(cookie.expires_at.is_some());
    }

    #[test]
    fn test_parse_max_age_marks_persistent() {
        let cookie = Cookie::parse_set_cookie("token=x; Max-Age=3600").expect("Cookie should parse");

        assert!(cookie.persistent);
        assert!(cookie.expires_at.is_some());
    }

    #[test]
    fn test_parse_without_value_pair() {
        assert!(Cookie::parse_set_cookie("no pair here").is_none());
        assert!(Cookie::parse_set_cookie("=value-only").is_none());
    }
}
