//! Events emitted by the client engine
//!
//! Server-to-client traffic is translated into [`Event`] values through a
//! closed mapping of method names ([`ServerMethod`]). Methods outside that
//! mapping come out as [`Event::Unsupported`] rather than being dropped.

use lsp_types::{MessageActionItem, PublishDiagnosticsParams};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::lsp::error::ProtocolError;
use crate::lsp::protocol::{RequestId, ResponseError};

// ============================================================================
// Message Severity
// ============================================================================

/// LSP `MessageType`, restricted to the codes the protocol defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    Error = 1,
    Warning = 2,
    Info = 3,
    Log = 4,
}

impl MessageType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(MessageType::Error),
            2 => Some(MessageType::Warning),
            3 => Some(MessageType::Info),
            4 => Some(MessageType::Log),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

// ============================================================================
// Events
// ============================================================================

/// Something the caller has to know about
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Server answered `initialize`; `initialized` has been queued
    Initialized { capabilities: Value },

    /// Server answered `initialize` with an error; session is uninitialized again
    InitializeFailed { error: ResponseError },

    /// `window/showMessage`
    ShowMessage { severity: MessageType, text: String },

    /// `window/showMessageRequest`; answer with
    /// [`Client::reply_to_show_message_request`](crate::lsp::Client::reply_to_show_message_request)
    ShowMessageRequest {
        id: RequestId,
        severity: MessageType,
        text: String,
        actions: Vec<MessageActionItem>,
    },

    /// `window/logMessage`
    LogMessage { severity: MessageType, text: String },

    /// `textDocument/publishDiagnostics`
    PublishDiagnostics(PublishDiagnosticsParams),

    /// Server answered `shutdown`; only `exit` remains
    ShutdownAcked,

    /// Server answered `shutdown` with an error; session is back to normal
    ShutdownFailed { error: ResponseError },

    /// Request or notification with a method the engine does not translate.
    /// When `id` is set the server expects a reply, e.g. through
    /// [`Client::reply_with_error`](crate::lsp::Client::reply_with_error).
    Unsupported {
        id: Option<RequestId>,
        method: String,
        params: Option<Value>,
    },
}

impl Event {
    /// Id of the server request behind this event, if it awaits a reply
    pub fn server_request_id(&self) -> Option<&RequestId> {
        match self {
            Event::ShowMessageRequest { id, .. } => Some(id),
            Event::Unsupported { id, .. } => id.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Server Methods
// ============================================================================

/// Server-to-client methods the engine translates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMethod {
    ShowMessage,
    ShowMessageRequest,
    LogMessage,
    PublishDiagnostics,
}

impl ServerMethod {
    pub const ALL: [ServerMethod; 4] = [
        ServerMethod::ShowMessage,
        ServerMethod::ShowMessageRequest,
        ServerMethod::LogMessage,
        ServerMethod::PublishDiagnostics,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerMethod::ShowMessage => "window/showMessage",
            ServerMethod::ShowMessageRequest => "window/showMessageRequest",
            ServerMethod::LogMessage => "window/logMessage",
            ServerMethod::PublishDiagnostics => "textDocument/publishDiagnostics",
        }
    }
}

#[derive(Deserialize)]
struct MessageParams {
    #[serde(rename = "type")]
    kind: i64,
    message: String,
}

#[derive(Deserialize)]
struct MessageRequestParams {
    #[serde(rename = "type")]
    kind: i64,
    message: String,
    #[serde(default)]
    actions: Option<Vec<MessageActionItem>>,
}

/// Translate an incoming request (`id` set) or notification into an event
pub(crate) fn translate_call(
    id: Option<RequestId>,
    method: String,
    params: Option<Value>,
) -> Result<Event, ProtocolError> {
    let Some(server_method) = ServerMethod::from_name(&method) else {
        return Ok(Event::Unsupported { id, method, params });
    };

    match server_method {
        ServerMethod::ShowMessage => {
            let params: MessageParams = parse_params(server_method, params)?;
            Ok(Event::ShowMessage {
                severity: severity(server_method, params.kind)?,
                text: params.message,
            })
        }
        ServerMethod::LogMessage => {
            let params: MessageParams = parse_params(server_method, params)?;
            Ok(Event::LogMessage {
                severity: severity(server_method, params.kind)?,
                text: params.message,
            })
        }
        ServerMethod::ShowMessageRequest => {
            let Some(id) = id else {
                return Err(ProtocolError::malformed(format!(
                    "{} sent as a notification (no id)",
                    server_method.as_str()
                )));
            };
            let params: MessageRequestParams = parse_params(server_method, params)?;
            Ok(Event::ShowMessageRequest {
                id,
                severity: severity(server_method, params.kind)?,
                text: params.message,
                actions: params.actions.unwrap_or_default(),
            })
        }
        ServerMethod::PublishDiagnostics => Ok(Event::PublishDiagnostics(parse_params(
            server_method,
            params,
        )?)),
    }
}

fn parse_params<T: DeserializeOwned>(
    method: ServerMethod,
    params: Option<Value>,
) -> Result<T, ProtocolError> {
    let params = params.ok_or_else(|| {
        ProtocolError::malformed(format!("{} is missing params", method.as_str()))
    })?;
    serde_json::from_value(params).map_err(|e| {
        ProtocolError::malformed(format!("{} has invalid params: {e}", method.as_str()))
    })
}

fn severity(method: ServerMethod, code: i64) -> Result<MessageType, ProtocolError> {
    MessageType::from_code(code).ok_or_else(|| {
        ProtocolError::malformed(format!(
            "{} has invalid message type {code}",
            method.as_str()
        ))
    })
}
