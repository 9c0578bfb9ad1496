//! Incremental `text/event-stream` parser

use super::ServerSentEvent;

/// Parses an event stream fed chunk by chunk.
///
/// Chunk boundaries may fall anywhere, including inside a line or a UTF-8
/// sequence, so the parser buffers bytes until a complete line is available.
/// Lines may end with LF, CRLF or a lone CR; a blank line dispatches the
/// accumulated event.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    pending: ServerSentEvent,
    // a CR at a chunk boundary must swallow an LF from the next chunk
    last_byte_was_cr: bool,
}

impl SseParser {
    /// An empty parser with no buffered input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the events completed by it in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ServerSentEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            match byte {
                b'\n' if self.last_byte_was_cr => {
                    self.last_byte_was_cr = false;
                }
                b'\n' | b'\r' => {
                    self.last_byte_was_cr = byte == b'\r';
                    let line = String::from_utf8_lossy(&self.buffer).into_owned();
                    self.buffer.clear();
                    if let Some(event) = self.process_line(&line) {
                        events.push(event);
                    }
                }
                _ => {
                    self.last_byte_was_cr = false;
                    self.buffer.push(byte);
                }
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<ServerSentEvent> {
        if line.is_empty() {
            if self.pending.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.pending));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            // a line without a colon is a field with an empty value
            None => (line, ""),
        };

        match field {
            "data" => match &mut self.pending.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.pending.data = Some(value.to_string()),
            },
            "event" => self.pending.event = Some(value.to_string()),
            "id" => self.pending.id = Some(value.to_string()),
            "retry" => {
                if let Ok(retry) = value.parse() {
                    self.pending.retry = Some(retry);
                }
            }
            // field name is empty for comment lines starting with ':'
            "" => self.pending.comments.push(value.to_string()),
            _ => {} // unknown fields are ignored
        }

        None
    }
}
