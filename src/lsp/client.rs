//! LSP client engine
//!
//! [`Client`] owns the receive and send buffers, the request id counter, the
//! pending request table and the session state. It performs no I/O: callers
//! [`feed`](Client::feed) whatever bytes the transport delivered and
//! [`drain_outgoing`](Client::drain_outgoing) whatever has to be written back.

use std::collections::{HashMap, HashSet};
use std::fmt;

use lsp_types::{ClientInfo, MessageActionItem, TraceValue};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{Level, debug, trace, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::lsp::error::{LspError, ProtocolError, StateError};
use crate::lsp::events::{Event, translate_call};
use crate::lsp::framing::{self, FramingError};
use crate::lsp::jsonrpc_utils::{error_response, method_not_found_response, success_response};
use crate::lsp::protocol::{
    Message, Notification, Request, RequestId, Response, ResponseError, classify,
};
use crate::lsp::state::SessionState;

// ============================================================================
// Pending Requests
// ============================================================================

/// Requests the client issues and correlates with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientRequest {
    Initialize,
    Shutdown,
}

impl ClientRequest {
    pub fn method(self) -> &'static str {
        match self {
            ClientRequest::Initialize => "initialize",
            ClientRequest::Shutdown => "shutdown",
        }
    }
}

/// Entry of the pending request table
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub kind: ClientRequest,
    pub request: Request,
}

/// `initialize` parameters; capabilities stay raw JSON so any shape the
/// caller configured reaches the server unchanged
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams<'a> {
    process_id: Option<u32>,
    root_uri: Option<&'a str>,
    capabilities: &'a Value,
    trace: TraceValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_info: Option<&'a ClientInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initialization_options: Option<&'a Value>,
}

/// Successful `initialize` reply, with the `initialized` frame already encoded
struct Initialization {
    capabilities: Value,
    initialized_frame: Vec<u8>,
}

/// A decoded message that passed validation but has not touched any state yet
enum Incoming {
    Call(Event),
    InitializeReply(RequestId, Result<Initialization, ResponseError>),
    ShutdownReply(RequestId, Result<(), ResponseError>),
}

// ============================================================================
// Client Engine
// ============================================================================

/// Sans-I/O LSP client session
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,

    /// Session lifecycle state
    state: SessionState,

    /// Bytes received but not yet decoded
    receive_buffer: Vec<u8>,

    /// Encoded frames waiting for the caller
    send_buffer: Vec<u8>,

    /// Outgoing requests awaiting a response
    pending_requests: HashMap<RequestId, PendingRequest>,

    /// Server requests awaiting our reply
    server_requests: HashSet<RequestId>,

    /// Next outgoing request id
    next_id: i64,

    /// Capabilities from the last successful initialize
    server_capabilities: Option<Value>,
}

impl Default for Client {
    fn default() -> Self {
        Self::from_config(ClientConfig::default())
    }
}

impl Client {
    /// Create a client with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client with a validated configuration
    pub fn with_config(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            state: SessionState::Uninitialized,
            receive_buffer: Vec::new(),
            send_buffer: Vec::new(),
            pending_requests: HashMap::new(),
            server_requests: HashSet::new(),
            next_id: 0,
            server_capabilities: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn server_capabilities(&self) -> Option<&Value> {
        self.server_capabilities.as_ref()
    }

    /// Whether an outgoing request with `id` still awaits its response
    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending_requests.contains_key(id)
    }

    pub fn pending_request(&self, id: &RequestId) -> Option<&PendingRequest> {
        self.pending_requests.get(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    /// Whether the server request `id` still awaits a reply from us
    pub fn is_awaiting_reply(&self, id: &RequestId) -> bool {
        self.server_requests.contains(id)
    }

    /// Whether a partial frame is buffered
    pub fn has_buffered_input(&self) -> bool {
        !self.receive_buffer.is_empty()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.send_buffer.is_empty()
    }

    // ========================================================================
    // Byte Interface
    // ========================================================================

    /// Feed bytes received from the server.
    ///
    /// Returns the events of every frame completed by these bytes. A trailing
    /// partial frame yields no events at all for this call; the bytes stay
    /// buffered until a later call completes them.
    ///
    /// On error no events are emitted, the receive buffer is discarded and
    /// the session (state, pending table, send buffer) is left as it was
    /// before the call.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Event>, ProtocolError> {
        self.receive_buffer.extend_from_slice(bytes);
        trace!(
            "LspClient: Received {} bytes ({} buffered)",
            bytes.len(),
            self.receive_buffer.len()
        );

        let framing::Decoded { messages, consumed } =
            match framing::decode_with_limit(&self.receive_buffer, self.config.max_message_size) {
                Ok(decoded) => decoded,
                Err(e) if e.is_incomplete() => {
                    trace!("LspClient: Waiting for more input: {}", e);
                    return Ok(Vec::new());
                }
                Err(e) => {
                    warn!("LspClient: Discarding receive buffer: {}", e);
                    self.receive_buffer.clear();
                    return Err(e.into());
                }
            };

        let incoming = match self.validate_batch(messages) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!("LspClient: Rejecting batch: {}", e);
                self.receive_buffer.clear();
                return Err(e);
            }
        };
        self.receive_buffer.drain(..consumed);

        Ok(incoming
            .into_iter()
            .map(|incoming| self.apply(incoming))
            .collect())
    }

    /// Take every byte queued for the server
    pub fn drain_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.send_buffer)
    }

    // ========================================================================
    // Lifecycle Commands
    // ========================================================================

    /// Send `initialize`. Allowed only before initialization.
    pub fn initialize(
        &mut self,
        process_id: Option<u32>,
        root_uri: Option<&str>,
        trace: TraceValue,
    ) -> Result<RequestId, LspError> {
        self.state
            .expect("initialize", SessionState::Uninitialized)?;

        let params = InitializeParams {
            process_id,
            root_uri,
            capabilities: &self.config.capabilities,
            trace,
            client_info: self.config.client_info.as_ref(),
            initialization_options: self.config.initialization_options.as_ref(),
        };
        let params = serde_json::to_value(params)
            .map_err(|e| LspError::Encode(FramingError::InvalidJson(e)))?;

        let id = self.send_request(ClientRequest::Initialize, Some(params))?;
        self.transition(SessionState::AwaitingInitializeAck);
        Ok(id)
    }

    /// Send `shutdown`. Allowed only once initialized.
    pub fn shutdown(&mut self) -> Result<RequestId, LspError> {
        self.state.expect("shutdown", SessionState::Normal)?;

        let id = self.send_request(ClientRequest::Shutdown, None)?;
        self.transition(SessionState::AwaitingShutdownAck);
        Ok(id)
    }

    /// Send `exit`. Allowed only after the server acknowledged shutdown.
    pub fn exit(&mut self) -> Result<(), LspError> {
        self.state.expect("exit", SessionState::Shutdown)?;

        self.send("exit", &Notification::new("exit", None))?;
        self.transition(SessionState::Exited);
        Ok(())
    }

    /// Answer a `window/showMessageRequest` with the chosen action, or `None`
    /// when the user dismissed it
    pub fn reply_to_show_message_request(
        &mut self,
        id: RequestId,
        action: Option<MessageActionItem>,
    ) -> Result<(), LspError> {
        self.check_server_request("reply to showMessageRequest", &id)?;
        self.send("response", &success_response(id.clone(), json!(action)))?;
        self.server_requests.remove(&id);
        Ok(())
    }

    /// Answer any server request with a JSON-RPC error
    pub fn reply_with_error(
        &mut self,
        id: RequestId,
        code: i32,
        message: impl Into<String>,
    ) -> Result<(), LspError> {
        self.check_server_request("reply with error", &id)?;
        self.send("response", &error_response(id.clone(), code, message.into(), None))?;
        self.server_requests.remove(&id);
        Ok(())
    }

    /// Reject an [`Event::Unsupported`] request with `MethodNotFound` (-32601)
    pub fn reply_method_not_found(&mut self, id: RequestId, method: &str) -> Result<(), LspError> {
        self.check_server_request("reply method not found", &id)?;
        self.send("response", &method_not_found_response(id.clone(), method))?;
        self.server_requests.remove(&id);
        Ok(())
    }

    // ========================================================================
    // Incoming Messages
    // ========================================================================

    /// Classify, translate and correlate a whole batch without mutating
    /// anything, so that a fault anywhere rejects the batch as a unit
    fn validate_batch(&self, messages: Vec<Value>) -> Result<Vec<Incoming>, ProtocolError> {
        let mut answered = HashSet::new();

        messages
            .into_iter()
            .map(|value| match classify(value)? {
                Message::Request(Request { id, method, params }) => {
                    crate::log_lsp_message!(Level::DEBUG, "incoming", method.as_str(), &params);
                    translate_call(Some(id), method, params).map(Incoming::Call)
                }
                Message::Notification(Notification { method, params }) => {
                    crate::log_lsp_message!(Level::DEBUG, "incoming", method.as_str(), &params);
                    translate_call(None, method, params).map(Incoming::Call)
                }
                Message::Response(response) => self.correlate(response, &mut answered),
            })
            .collect()
    }

    fn correlate(
        &self,
        response: Response,
        answered: &mut HashSet<RequestId>,
    ) -> Result<Incoming, ProtocolError> {
        let kind = match self.pending_requests.get(&response.id) {
            Some(pending) if !answered.contains(&response.id) => pending.kind,
            _ => {
                return Err(ProtocolError::UnexpectedResponse { id: response.id });
            }
        };
        answered.insert(response.id.clone());

        crate::log_lsp_message!(Level::DEBUG, "incoming", kind.method(), &response.payload);

        match kind {
            ClientRequest::Initialize => {
                let payload = match response.payload {
                    Ok(result) => Ok(Initialization {
                        capabilities: extract_capabilities(result)?,
                        initialized_frame: framing::encode(&Notification::new(
                            "initialized",
                            Some(json!({})),
                        ))?,
                    }),
                    Err(error) => Err(error),
                };
                Ok(Incoming::InitializeReply(response.id, payload))
            }
            ClientRequest::Shutdown => Ok(Incoming::ShutdownReply(
                response.id,
                response.payload.map(|_| ()),
            )),
        }
    }

    fn apply(&mut self, incoming: Incoming) -> Event {
        match incoming {
            Incoming::Call(event) => {
                if let Some(id) = event.server_request_id() {
                    self.server_requests.insert(id.clone());
                }
                event
            }
            Incoming::InitializeReply(id, payload) => {
                self.pending_requests.remove(&id);
                debug_assert_eq!(self.state, SessionState::AwaitingInitializeAck);

                match payload {
                    Ok(Initialization {
                        capabilities,
                        initialized_frame,
                    }) => {
                        self.send_buffer.extend_from_slice(&initialized_frame);
                        debug!("LspClient: Queued initialized notification");
                        self.server_capabilities = Some(capabilities.clone());
                        self.transition(SessionState::Normal);
                        Event::Initialized { capabilities }
                    }
                    Err(error) => {
                        warn!("LspClient: initialize failed: {}", error);
                        self.transition(SessionState::Uninitialized);
                        Event::InitializeFailed { error }
                    }
                }
            }
            Incoming::ShutdownReply(id, payload) => {
                self.pending_requests.remove(&id);
                debug_assert_eq!(self.state, SessionState::AwaitingShutdownAck);

                match payload {
                    Ok(()) => {
                        self.transition(SessionState::Shutdown);
                        Event::ShutdownAcked
                    }
                    Err(error) => {
                        warn!("LspClient: shutdown failed: {}", error);
                        self.transition(SessionState::Normal);
                        Event::ShutdownFailed { error }
                    }
                }
            }
        }
    }

    // ========================================================================
    // Outgoing Messages
    // ========================================================================

    fn send_request(
        &mut self,
        kind: ClientRequest,
        params: Option<Value>,
    ) -> Result<RequestId, LspError> {
        let id = RequestId::Integer(self.next_id);
        let request = Request::new(id.clone(), kind.method(), params);
        self.send(kind.method(), &request)?;
        self.next_id += 1;

        self.pending_requests
            .insert(id.clone(), PendingRequest { kind, request });
        Ok(id)
    }

    /// Frame `message` onto the send buffer; nothing is queued on failure
    fn send<T: Serialize + fmt::Debug>(&mut self, method: &str, message: &T) -> Result<(), LspError> {
        framing::encode_into(&mut self.send_buffer, message).map_err(LspError::Encode)?;
        crate::log_lsp_message!(Level::DEBUG, "outgoing", method, message);
        Ok(())
    }

    fn check_server_request(
        &self,
        operation: &'static str,
        id: &RequestId,
    ) -> Result<(), StateError> {
        if self.state.is_terminal() {
            return Err(StateError::Exited { operation });
        }
        if !self.server_requests.contains(id) {
            return Err(StateError::UnknownServerRequest { id: id.clone() });
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!("LspClient: State transition {} -> {}", self.state, next);
        self.state = next;
    }
}

fn extract_capabilities(result: Value) -> Result<Value, ProtocolError> {
    match result {
        Value::Object(mut object) => object.remove("capabilities").ok_or_else(|| {
            ProtocolError::malformed("initialize result has no capabilities")
        }),
        other => Err(ProtocolError::malformed(format!(
            "initialize result must be an object, got {other}"
        ))),
    }
}
