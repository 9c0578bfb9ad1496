//! Final request URL assembly from base URL, relative path and query parameters

/// Schemes that mark a URL as absolute, checked case-insensitively.
const ABSOLUTE_SCHEMES: &[&str] = &["http://", "https://", "ws://", "wss://"];

/// Whether the URL starts with one of the supported schemes.
pub(crate) fn has_scheme(url: &str) -> bool {
    ABSOLUTE_SCHEMES
        .iter()
        .any(|scheme| starts_with_ignore_case(url, scheme))
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Build the final request URL.
///
/// An absolute `url` is used as-is, ignoring `base_url`. A relative one is
/// joined to the base with exactly one `/`. Query parameters are appended in
/// iteration order, percent-encoded with space as `%20`. Afterwards any
/// literal space that survived (e.g. in a path segment) is replaced with
/// `%20`; this is deliberately not full percent-encoding so that
/// already-encoded or nested URLs are not encoded twice.
///
/// An absolute `url` that already carries a query string combined with
/// `query_parameters` yields a doubled `?`; that combination is not validated
/// here, callers must not pass both.
pub fn build_url(
    base_url: Option<&str>,
    url: &str,
    query_parameters: &[(String, String)],
) -> String {
    let without_query = match base_url {
        Some(base) if !has_scheme(url) => {
            format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
        }
        _ => url.to_string(),
    };

    let assembled = if query_parameters.is_empty() {
        without_query
    } else {
        let query = query_parameters
            .iter()
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{without_query}?{query}")
    };

    // not a real encoding, but at least encodes white spaces
    assembled.replace(' ', "%20")
}
