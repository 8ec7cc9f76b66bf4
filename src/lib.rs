//! Sans-I/O Language Server Protocol client
//!
//! The [`lsp`] module holds the protocol engine: it consumes raw bytes from a
//! transport, produces raw bytes to send, and exposes typed events. It never
//! reads, writes, spawns or sleeps; the caller owns the event loop.

pub mod config;
pub mod logging;
pub mod lsp;

#[cfg(test)]
mod test_utils;

pub use config::{ClientConfig, ConfigError};
pub use lsp::{Client, ClientInfo, Event, LspError, SessionState};
