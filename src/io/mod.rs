//! I/O layer for the `lsp-handshake` binary
//!
//! The engine in [`lsp_sansio_client::lsp`] never touches a transport. This
//! module supplies one:
//!
//! - **Process**: language server process lifecycle with piped stdio
//! - **Pump**: moves bytes between async streams and a [`Client`](lsp_sansio_client::Client)

pub mod process;
pub mod pump;

pub use process::ServerProcess;
pub use pump::{EnginePump, PumpError};
