//! LSP message framing layer
//!
//! Encodes JSON-RPC payloads into LSP frames and decodes raw byte buffers
//! back into JSON documents. Nothing here touches a transport; callers hand
//! in whatever bytes they have accumulated.
//!
//! LSP message framing format:
//! Content-Length: <length>\r\n\r\n<content>

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

/// Maximum message size to prevent memory exhaustion
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16MB

const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH_HEADER: &str = "Content-Length";

/// Error types for LSP framing
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// Not an error in the usual sense: the buffer ends mid-header or
    /// mid-body and the caller has to wait for more bytes.
    #[error("Incomplete frame: expected {expected:?} bytes, got {actual}")]
    Incomplete {
        expected: Option<usize>,
        actual: usize,
    },

    #[error("Invalid LSP header: {0}")]
    InvalidHeader(String),

    #[error("Missing Content-Length header")]
    MissingContentLength,

    #[error("Invalid content length: {0}")]
    InvalidContentLength(String),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl FramingError {
    /// True when more input could turn this into a successful decode
    pub fn is_incomplete(&self) -> bool {
        matches!(self, FramingError::Incomplete { .. })
    }
}

/// Result of a successful [`decode`] call
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Every JSON document found, in wire order
    pub messages: Vec<Value>,

    /// Number of input bytes covered by `messages`
    pub consumed: usize,
}

/// Frame a message with a Content-Length header
pub fn encode<T: Serialize + ?Sized>(message: &T) -> Result<Vec<u8>, FramingError> {
    let mut frame = Vec::new();
    encode_into(&mut frame, message)?;
    Ok(frame)
}

/// Append a framed message to `buffer`.
///
/// `buffer` is left untouched when the message fails to serialize.
pub fn encode_into<T: Serialize + ?Sized>(
    buffer: &mut Vec<u8>,
    message: &T,
) -> Result<(), FramingError> {
    let body = serde_json::to_vec(message)?;
    let header = format!("{CONTENT_LENGTH_HEADER}: {}\r\n\r\n", body.len());

    buffer.reserve(header.len() + body.len());
    buffer.extend_from_slice(header.as_bytes());
    buffer.extend_from_slice(&body);

    trace!("LspFraming: Encoded frame ({} bytes content)", body.len());
    Ok(())
}

/// Decode every frame in `buffer` using the default size limit
pub fn decode(buffer: &[u8]) -> Result<Decoded, FramingError> {
    decode_with_limit(buffer, DEFAULT_MAX_MESSAGE_SIZE)
}

/// Decode every frame in `buffer`.
///
/// All-or-nothing: if the buffer ends inside a header or body the whole call
/// fails with [`FramingError::Incomplete`], even when earlier frames were
/// complete. On success `consumed` always equals `buffer.len()`.
pub fn decode_with_limit(
    buffer: &[u8],
    max_message_size: usize,
) -> Result<Decoded, FramingError> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset < buffer.len() {
        let remaining = &buffer[offset..];
        let (body_start, body_end) = locate_frame(remaining, max_message_size)?;

        let message = serde_json::from_slice(&remaining[body_start..body_end])?;
        messages.push(message);
        offset += body_end;

        trace!(
            "LspFraming: Parsed complete message ({} bytes)",
            body_end - body_start
        );
    }

    Ok(Decoded {
        messages,
        consumed: offset,
    })
}

/// Find the body of the first frame in `buffer`.
///
/// Returns the body's `(start, end)` offsets relative to `buffer`.
fn locate_frame(buffer: &[u8], max_message_size: usize) -> Result<(usize, usize), FramingError> {
    let Some(header_end) = find_separator(buffer) else {
        trace!(
            "LspFraming: Incomplete header ({} bytes buffered)",
            buffer.len()
        );
        return Err(FramingError::Incomplete {
            expected: None,
            actual: buffer.len(),
        });
    };

    let header = std::str::from_utf8(&buffer[..header_end])
        .map_err(|e| FramingError::InvalidHeader(format!("header is not valid UTF-8: {e}")))?;
    let content_length = parse_content_length(header)?;

    if content_length > max_message_size {
        return Err(FramingError::MessageTooLarge {
            size: content_length,
            max: max_message_size,
        });
    }

    let body_start = header_end + HEADER_SEPARATOR.len();
    let Some(body_end) = body_start.checked_add(content_length) else {
        return Err(FramingError::MessageTooLarge {
            size: content_length,
            max: max_message_size,
        });
    };
    if buffer.len() < body_end {
        trace!(
            "LspFraming: Incomplete message - need {} more bytes",
            body_end - buffer.len()
        );
        return Err(FramingError::Incomplete {
            expected: Some(body_end),
            actual: buffer.len(),
        });
    }

    Ok((body_start, body_end))
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_SEPARATOR.len())
        .position(|window| window == HEADER_SEPARATOR)
}

/// Parse Content-Length from LSP headers
///
/// Header names are matched case-insensitively; headers other than
/// Content-Length (e.g. Content-Type) are accepted and ignored.
fn parse_content_length(header: &str) -> Result<usize, FramingError> {
    let mut content_length = None;

    for line in header.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            return Err(FramingError::InvalidHeader(line.to_string()));
        };

        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH_HEADER) {
            let value = value.trim();
            let length = value
                .parse::<usize>()
                .map_err(|_| FramingError::InvalidContentLength(value.to_string()))?;
            content_length = Some(length);
        }
    }

    content_length.ok_or(FramingError::MissingContentLength)
}
