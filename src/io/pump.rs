//! Byte pump between async streams and the client engine
//!
//! Writes whatever the engine queued, reads whatever the server sent and
//! feeds it back in. Server requests the binary has no UI for are answered
//! automatically.

use std::collections::VecDeque;
use std::io;

use lsp_sansio_client::lsp::{Client, Event, LspError, MessageType, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, trace, warn};

/// Size of the read buffer for server output
const READ_BUFFER_SIZE: usize = 4096;

/// Error types for the pump
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Lsp(#[from] LspError),

    #[error("Server closed its output")]
    Eof,
}

impl From<ProtocolError> for PumpError {
    fn from(error: ProtocolError) -> Self {
        PumpError::Lsp(error.into())
    }
}

/// Drives a [`Client`] over a reader (server output) and a writer (server input)
pub struct EnginePump<R, W> {
    client: Client,
    reader: R,
    writer: W,
    backlog: VecDeque<Event>,
    read_buffer: Vec<u8>,
}

impl<R, W> EnginePump<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(client: Client, reader: R, writer: W) -> Self {
        Self {
            client,
            reader,
            writer,
            backlog: VecDeque::new(),
            read_buffer: vec![0; READ_BUFFER_SIZE],
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn into_parts(self) -> (Client, R, W) {
        (self.client, self.reader, self.writer)
    }

    /// Write every queued outgoing byte
    pub async fn flush(&mut self) -> Result<(), PumpError> {
        let bytes = self.client.drain_outgoing();
        if bytes.is_empty() {
            return Ok(());
        }

        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        trace!("EnginePump: Wrote {} bytes", bytes.len());
        Ok(())
    }

    /// Next event from the server, reading as much as needed.
    ///
    /// Outgoing bytes are flushed before every read, including replies the
    /// pump queues for server requests.
    pub async fn next_event(&mut self) -> Result<Event, PumpError> {
        loop {
            if let Some(event) = self.backlog.pop_front() {
                self.handle(&event)?;
                self.flush().await?;
                return Ok(event);
            }

            self.flush().await?;
            self.receive().await?;
        }
    }

    /// Consume events until `done` accepts one, which is returned
    pub async fn wait_for<F>(&mut self, mut done: F) -> Result<Event, PumpError>
    where
        F: FnMut(&Event) -> bool,
    {
        loop {
            let event = self.next_event().await?;
            if done(&event) {
                return Ok(event);
            }
        }
    }

    async fn receive(&mut self) -> Result<(), PumpError> {
        let read = self.reader.read(&mut self.read_buffer).await?;
        if read == 0 {
            return Err(PumpError::Eof);
        }

        let events = self.client.feed(&self.read_buffer[..read])?;
        self.backlog.extend(events);
        Ok(())
    }

    fn handle(&mut self, event: &Event) -> Result<(), LspError> {
        match event {
            Event::ShowMessage { severity, text } | Event::LogMessage { severity, text } => {
                log_server_message(*severity, text);
            }
            Event::ShowMessageRequest { id, severity, text, .. } => {
                log_server_message(*severity, text);
                // No UI to pick an action with
                self.client.reply_to_show_message_request(id.clone(), None)?;
            }
            Event::Unsupported {
                id: Some(id),
                method,
                ..
            } => {
                debug!("Rejecting unsupported server request {} ({})", method, id);
                self.client.reply_method_not_found(id.clone(), method)?;
            }
            Event::Unsupported { id: None, method, .. } => {
                debug!("Ignoring unsupported server notification {}", method);
            }
            Event::PublishDiagnostics(params) => {
                info!(
                    uri = ?params.uri,
                    count = params.diagnostics.len(),
                    "Diagnostics published"
                );
            }
            Event::InitializeFailed { error } | Event::ShutdownFailed { error } => {
                warn!("Server returned error: {}", error);
            }
            Event::Initialized { .. } | Event::ShutdownAcked => {
                debug!("Lifecycle event: {:?}", event);
            }
        }
        Ok(())
    }
}

fn log_server_message(severity: MessageType, text: &str) {
    match severity {
        MessageType::Error => error!(target: "lsp_server", "{}", text),
        MessageType::Warning => warn!(target: "lsp_server", "{}", text),
        MessageType::Info => info!(target: "lsp_server", "{}", text),
        MessageType::Log => debug!(target: "lsp_server", "{}", text),
    }
}
