//! Connection-scoped reassembly of fragmented messages

use tracing::error;

/// Reassembles chunked text frames into one logical message.
///
/// Partial text fragments (`last == false`) are buffered in arrival order;
/// the fragment carrying `last == true` flushes the buffer and yields the
/// concatenated message. Binary fragmentation is not buffered: a non-final
/// binary frame is logged as an error and passed through as-is, one chunk at
/// a time.
#[derive(Debug, Default)]
pub(crate) struct MessageAssembler {
    buffer: Vec<String>,
}

impl MessageAssembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed a text fragment; returns the complete logical message once the
    /// final fragment arrives.
    pub(crate) fn push_text(&mut self, fragment: String, last: bool) -> Option<String> {
        if !last {
            // partial message, large messages sometimes get broken into chunks
            self.buffer.push(fragment);
            return None;
        }

        if self.buffer.is_empty() {
            // full message at once
            Some(fragment)
        } else {
            self.buffer.push(fragment);
            let joined = self.buffer.concat();
            self.buffer.clear();
            Some(joined)
        }
    }

    /// Feed a binary frame. Partial binary frames are not reassembled; each
    /// chunk is passed through on its own.
    pub(crate) fn push_binary(&mut self, data: Vec<u8>, last: bool) -> Vec<u8> {
        if !last {
            error!(
                "Received a non-final binary frame, but buffering partial binary messages is not \
                 implemented. Chunks are passed through one at a time, handle reassembly yourself."
            );
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_text_reassembled_into_one_message() {
        let mut assembler = MessageAssembler::new();

        assert_eq!(assembler.push_text("ab".to_string(), false), None);
        assert_eq!(assembler.push_text("cd".to_string(), false), None);
        assert_eq!(
            assembler.push_text("ef".to_string(), true),
            Some("abcdef".to_string())
        );
    }

    #[test]
    fn test_buffer_cleared_after_flush() {
        let mut assembler = MessageAssembler::new();

        assembler.push_text("partial".to_string(), false);
        assembler.push_text("end".to_string(), true);

        // next complete message is unaffected by the previous buffer
        assert_eq!(
            assembler.push_text("next".to_string(), true),
            Some("next".to_string())
        );
    }

    #[test]
    fn test_unfragmented_text_passes_through() {
        let mut assembler = MessageAssembler::new();

        assert_eq!(
            assembler.push_text("whole".to_string(), true),
            Some("whole".to_string())
        );
    }

    #[test]
    fn test_binary_passes_through_without_buffering() {
        let mut assembler = MessageAssembler::new();

        assert_eq!(assembler.push_binary(vec![1, 2], false), vec![1, 2]);
        assert_eq!(assembler.push_binary(vec![3], true), vec![3]);
    }
}
