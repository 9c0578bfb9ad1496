//! Parsers for structured response headers (`Link`, `Retry-After`)

use std::time::SystemTime;

/// One entry of a parsed `Link` response header (RFC 8288).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHeader {
    /// The link target, without the surrounding angle brackets
    pub url: String,
    /// Link parameters such as `rel`, with surrounding quotes removed
    pub parameters: Vec<(String, String)>,
}

impl LinkHeader {
    /// The value of a link parameter, e.g. `rel`
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse a `Link` header value into its entries, in order.
///
/// Best effort: entries are split on `,`, the target on the first `;`.
/// Quoted parameter values lose their quotes. An empty header yields no
/// entries.
pub fn parse_link_header(header: &str) -> Vec<LinkHeader> {
    header
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let (target, params) = match entry.split_once(';') {
                Some((target, params)) => (target, Some(params)),
                None => (entry, None),
            };

            let url = target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string();

            let parameters = params
                .map(|params| {
                    params
                        .split(';')
                        .filter(|param| !param.trim().is_empty())
                        .map(|param| {
                            let (name, value) = param.split_once('=').unwrap_or((param, ""));
                            let mut value = value.trim();
                            if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
                                value = &value[1..value.len() - 1];
                            }
                            (name.trim().to_string(), value.to_string())
                        })
                        .collect()
                })
                .unwrap_or_default();

            LinkHeader { url, parameters }
        })
        .collect()
}

/// Parse a `Retry-After` header value into seconds.
///
/// Accepts both forms of RFC 7231: delta-seconds and an HTTP-date (converted
/// to seconds from now, clamped at zero). Returns `None` for anything else.
pub fn parse_retry_after_seconds(value: &str) -> Option<u64> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }

    let date = httpdate::parse_http_date(value).ok()?;
    match date.duration_since(SystemTime::now()) {
        Ok(delta) => Some(delta.as_secs()),
        Err(_) => Some(0), // date in the past
    }
}
