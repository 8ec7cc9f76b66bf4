//! Error types for the LSP client engine
//!
//! [`ProtocolError`] means the peer sent something the engine cannot accept.
//! [`StateError`] means the caller invoked a command the session does not
//! allow right now.

use crate::lsp::framing::FramingError;
use crate::lsp::protocol::RequestId;
use crate::lsp::state::SessionState;

// ============================================================================
// Peer Protocol Errors
// ============================================================================

/// Faults in what the server sent
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame could not be decoded (bad header, oversized body, invalid JSON),
    /// or the reply it requires could not be encoded
    #[error("Malformed LSP frame: {0}")]
    Framing(#[from] FramingError),

    /// Decoded JSON violates the Request/Response/Notification shape rules
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Response id has no matching pending request
    #[error("Unexpected response: no pending request with id {id}")]
    UnexpectedResponse { id: RequestId },
}

impl ProtocolError {
    /// Whether this is a malformed-input fault (framing or shape)
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProtocolError::Framing(_) | ProtocolError::Malformed(_))
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ProtocolError::Malformed(message.into())
    }
}

// ============================================================================
// Caller Precondition Errors
// ============================================================================

/// Lifecycle command invoked when the session does not allow it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Cannot {operation} in state {current} (expected {expected})")]
    InvalidState {
        operation: &'static str,
        current: SessionState,
        expected: SessionState,
    },

    #[error("Cannot {operation}: session has exited")]
    Exited { operation: &'static str },

    #[error("No server request with id {id} is awaiting a reply")]
    UnknownServerRequest { id: RequestId },
}

// ============================================================================
// Combined Error
// ============================================================================

/// Either kind of engine error, for callers that just propagate with `?`
#[derive(Debug, thiserror::Error)]
pub enum LspError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    State(#[from] StateError),

    /// Outgoing message could not be serialized; nothing was queued
    #[error("Failed to encode outgoing message: {0}")]
    Encode(#[source] FramingError),
}
