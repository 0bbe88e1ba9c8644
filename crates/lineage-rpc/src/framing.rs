//! LSP header framing.
//!
//! Every message on the wire is prefixed with a header block:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//! Reads from a pipe rarely line up with message boundaries, so the decoder
//! buffers whatever it is given and only yields a payload once the declared
//! number of bytes is available.

use crate::error::FramingError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "content-length:";

/// Largest header block accepted before the decoder gives up on it.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Largest body a frame may declare.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Prefixes `payload` with its `Content-Length` header.
#[must_use]
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    let mut frame = Vec::with_capacity(header.len() + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Incremental decoder turning arbitrary byte chunks into frame payloads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    body_length: Option<usize>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes read from the stream.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes buffered but not yet returned as a payload.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete payload, if one is buffered.
    ///
    /// `None` means more bytes are needed. An error reports a header block
    /// that was discarded; calling again continues with the bytes after it.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, FramingError>> {
        if self.body_length.is_none() {
            match self.take_header_block()? {
                Ok(length) => self.body_length = Some(length),
                Err(error) => return Some(Err(error)),
            }
        }

        let length = self.body_length?;
        if self.buffer.len() < length {
            return None;
        }
        self.body_length = None;
        let payload: Vec<u8> = self.buffer.drain(..length).collect();
        Some(Ok(payload))
    }

    fn take_header_block(&mut self) -> Option<Result<usize, FramingError>> {
        let Some(end) = self
            .buffer
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
        else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                self.buffer.clear();
                return Some(Err(FramingError::HeaderTooLarge {
                    limit: MAX_HEADER_BYTES,
                }));
            }
            return None;
        };

        let block: Vec<u8> = self
            .buffer
            .drain(..end + HEADER_TERMINATOR.len())
            .take(end)
            .collect();
        Some(parse_content_length(&block))
    }
}

fn parse_content_length(block: &[u8]) -> Result<usize, FramingError> {
    let text = std::str::from_utf8(block).map_err(|_| FramingError::NonUtf8Header)?;
    let mut content_length = None;

    for line in text.split("\r\n") {
        // Other headers (e.g. Content-Type) are accepted and ignored. Bytes
        // ahead of the header name are left over from a discarded frame.
        let Some(at) = line.to_ascii_lowercase().find(CONTENT_LENGTH) else {
            continue;
        };
        let value = line.get(at + CONTENT_LENGTH.len()..).unwrap_or_default().trim();
        let parsed = value
            .parse::<usize>()
            .map_err(|_| FramingError::InvalidContentLength(value.to_owned()))?;
        if parsed > MAX_BODY_BYTES {
            return Err(FramingError::BodyTooLarge {
                length: parsed,
                limit: MAX_BODY_BYTES,
            });
        }
        content_length = Some(parsed);
    }

    content_length.ok_or(FramingError::MissingContentLength)
}
