//! Session lifecycle states
//!
//! ```text
//! Uninitialized -> AwaitingInitializeAck -> Normal -> AwaitingShutdownAck -> Shutdown -> Exited
//! ```
//!
//! A failed initialize returns to `Uninitialized`; a failed shutdown returns
//! to `Normal`.

use std::fmt;

use crate::lsp::error::StateError;

/// LSP session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No `initialize` request sent yet
    #[default]
    Uninitialized,
    /// `initialize` sent, waiting for the server's result
    AwaitingInitializeAck,
    /// Initialized; regular traffic allowed
    Normal,
    /// `shutdown` sent, waiting for the server's result
    AwaitingShutdownAck,
    /// Server acknowledged shutdown; only `exit` remains
    Shutdown,
    /// `exit` sent. Terminal.
    Exited,
}

impl SessionState {
    /// Check the precondition for `operation`
    pub fn expect(self, operation: &'static str, expected: SessionState) -> Result<(), StateError> {
        if self == expected {
            Ok(())
        } else {
            Err(StateError::InvalidState {
                operation,
                current: self,
                expected,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Exited
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::AwaitingInitializeAck => "awaiting-initialize-ack",
            SessionState::Normal => "normal",
            SessionState::AwaitingShutdownAck => "awaiting-shutdown-ack",
            SessionState::Shutdown => "shutdown",
            SessionState::Exited => "exited",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
