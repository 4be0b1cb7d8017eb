//! Incremental server-sent-event decoding.
//!
//! The router's streaming responses are `data: <json>` lines. Transport
//! reads arrive as arbitrary byte fragments, so a fragment boundary can
//! never be assumed to align with a line boundary, a UTF-8 character
//! boundary, or a complete JSON object. The decoder buffers bytes between
//! reads and only surfaces chunks once a full line is present.

use tracing::{debug, warn};

use super::chunk::StreamChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Reassembles SSE lines from a chunked byte stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport read into the decoder and returns every chunk
    /// completed by it, in arrival order.
    ///
    /// Lines without the `data: ` prefix are ignored, as is the literal
    /// `[DONE]` sentinel; a line that fails to parse is dropped with a
    /// warning rather than ending the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        // Multi-byte UTF-8 sequences never contain 0x0A, so splitting on raw
        // newline bytes is safe even when a read ends mid-character.
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(chunk) = Self::decode_line(line.trim_end_matches('\n').trim_end_matches('\r')) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Flushes any trailing line left in the buffer once the transport has
    /// signalled end-of-stream.
    pub fn finish(&mut self) -> Vec<StreamChunk> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        Self::decode_line(line.trim_end_matches('\n').trim_end_matches('\r'))
            .into_iter()
            .collect()
    }

    fn decode_line(line: &str) -> Option<StreamChunk> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        if payload == DONE_SENTINEL {
            debug!("ignoring [DONE] sentinel");
            return None;
        }

        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => Some(chunk),
            Err(err) => {
                warn!("skipping malformed stream line: {}", err);
                None
            }
        }
    }
}
