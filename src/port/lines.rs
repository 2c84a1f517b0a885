//! Newline framing for raw serial bytes.

use std::collections::VecDeque;

/// Longest line kept while waiting for a delimiter. Controllers send one or
/// two bytes per press, anything longer is line noise.
pub const MAX_LINE_LEN: usize = 256;

/// Splits a byte stream on `\n` into trimmed text lines.
///
/// Bytes are buffered until a delimiter arrives, so a line split across
/// several reads comes out whole. `\r\n` endings and stray whitespace are
/// trimmed. Invalid UTF-8 is replaced rather than rejected; validation is
/// the filter's job. Empty lines are kept.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    ready: VecDeque<String>,
    max_line_len: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(64),
            ready: VecDeque::new(),
            max_line_len,
        }
    }

    /// Append raw bytes, queueing every line they complete.
    pub fn feed(&mut self, mut bytes: &[u8]) {
        while let Some(pos) = memchr::memchr(b'\n', bytes) {
            self.buffer.extend_from_slice(&bytes[..pos]);
            let line = String::from_utf8_lossy(&self.buffer).trim().to_string();
            self.ready.push_back(line);
            self.buffer.clear();
            bytes = &bytes[pos + 1..];
        }

        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > self.max_line_len {
            tracing::warn!(
                "Discarding {} bytes without a line delimiter",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Take the oldest complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Bytes buffered for a line that has not been terminated yet.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered data.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.ready.clear();
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
