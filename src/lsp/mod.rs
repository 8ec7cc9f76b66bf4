//! Sans-I/O LSP client protocol engine
//!
//! Layered leaf-first:
//!
//! - **Framing**: Content-Length framing of JSON-RPC payloads
//! - **Protocol**: JSON-RPC 2.0 message model and classification
//! - **State**: session lifecycle states
//! - **Events**: translation of server traffic into typed events
//! - **Client**: the engine tying them together over in-memory buffers
//!
//! Example usage, with the caller owning the transport:
//!
//! ```rust
//! use lsp_sansio_client::lsp::{Client, Event, TraceValue};
//!
//! let mut client = Client::new();
//! client.initialize(Some(1234), Some("file:///proj"), TraceValue::Off)?;
//! let to_server = client.drain_outgoing();
//! # let _ = to_server;
//!
//! let from_server = b"Content-Length: 53\r\n\r\n{\"jsonrpc\":\"2.0\",\"id\":0,\"result\":{\"capabilities\":{}}}";
//! for event in client.feed(from_server)? {
//!     if let Event::Initialized { capabilities } = event {
//!         assert!(capabilities.is_object());
//!     }
//! }
//! # Ok::<(), lsp_sansio_client::lsp::LspError>(())
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod framing;
pub mod jsonrpc_utils;
pub mod protocol;
pub mod state;

// Re-export main types for convenience
pub use client::{Client, ClientRequest, PendingRequest};
pub use error::{LspError, ProtocolError, StateError};
pub use events::{Event, MessageType, ServerMethod};
pub use framing::FramingError;
pub use jsonrpc_utils::error_codes;
pub use lsp_types::{ClientInfo, MessageActionItem, TraceValue};
pub use protocol::{Message, Notification, Request, RequestId, Response, ResponseError};
pub use state::SessionState;
