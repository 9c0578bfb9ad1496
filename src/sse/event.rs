//! Server-Sent Event type

/// One event received over an SSE stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSentEvent {
    /// Payload, multiple `data:` lines joined with `\n`
    pub data: Option<String>,
    /// Event type from the `event:` field
    pub event: Option<String>,
    /// Event id from the `id:` field
    pub id: Option<String>,
    /// Reconnection time in milliseconds from the `retry:` field
    pub retry: Option<u64>,
    /// Comment lines (starting with `:`) received before the dispatch
    pub comments: Vec<String>,
}

impl ServerSentEvent {
    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.event.is_none()
            && self.id.is_none()
            && self.retry.is_none()
            && self.comments.is_empty()
    }
}

impl std::fmt::Display for ServerSentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.event.as_deref().unwrap_or("message"),
            self.data.as_deref().unwrap_or("")
        )
    }
}
