//! Request authentication schemes

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Authentication applied to a request via the `Authorization` header.
///
/// A per-request authentication set on
/// [`RequestParameters`](crate::RequestParameters) overrides the client-level
/// default for that single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// HTTP Basic authentication
    Basic {
        /// User name
        username: String,
        /// Password
        password: String,
    },
    /// Bearer token authentication
    Bearer {
        /// The bearer token, sent as-is
        token: String,
    },
}

impl Authentication {
    /// Create Basic authentication credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create Bearer token authentication
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// The value for the `Authorization` header
    pub fn header_value(&self) -> String {
        match self {
            Self::Basic { username, password } => {
                let credentials = STANDARD.encode(format!("{username}:{password}"));
                format!("Basic {credentials}")
            }
            Self::Bearer { token } => format!("Bearer {token}"),
        }
    }
}

impl std::fmt::Display for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => write!(f, "Basic auth for user {username}"),
            Self::Bearer { .. } => write!(f, "Bearer authentication"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header_value() {
        let auth = Authentication::basic("aladdin", "opensesame");
        // RFC 7617 example credentials
        assert_eq!(auth.header_value(), "Basic YWxhZGRpbjpvcGVuc2VzYW1l");
    }

    #[test]
    fn test_bearer_auth_header_value() {
        let auth = Authentication::bearer("my-token");
        assert_eq!(auth.header_value(), "Bearer my-token");
    }

    #[test]
    fn test_display_does_not_leak_password() {
        let auth = Authentication::basic("user", "secret");
        let displayed = format!("{}", auth);
        assert!(!displayed.contains("secret"));
    }
}
