//! Configuration for the LSP client engine
//!
//! Provides ClientConfig with builder pattern and validation. The engine has
//! no I/O, so everything here shapes what goes on the wire: the
//! `initialize` parameters and the framing size limit.

use lsp_types::ClientInfo;
use serde_json::{Value, json};

use crate::lsp::framing::DEFAULT_MAX_MESSAGE_SIZE;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Maximum message size must be greater than zero")]
    ZeroMessageSize,

    #[error("Client capabilities must be a JSON object, got: {0}")]
    CapabilitiesNotObject(String),

    #[error("Client name must not be empty")]
    EmptyClientName,
}

// ============================================================================
// Core Configuration Types
// ============================================================================

/// Client engine configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client identification; omitted from `initialize` when `None`
    pub client_info: Option<ClientInfo>,

    /// Client capabilities advertised in `initialize`
    pub capabilities: Value,

    /// Server-specific `initializationOptions`
    pub initialization_options: Option<Value>,

    /// Largest accepted frame body in bytes
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_info: Some(ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: json!({}),
            initialization_options: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: Option<String>) -> Self {
        self.client_info = Some(ClientInfo {
            name: name.into(),
            version,
        });
        self
    }

    pub fn without_client_info(mut self) -> Self {
        self.client_info = None;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Value) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_initialization_options(mut self, options: Value) -> Self {
        self.initialization_options = Some(options);
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroMessageSize);
        }

        if !self.capabilities.is_object() {
            return Err(ConfigError::CapabilitiesNotObject(
                self.capabilities.to_string(),
            ));
        }

        if let Some(info) = &self.client_info
            && info.name.trim().is_empty()
        {
            return Err(ConfigError::EmptyClientName);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capabilities, json!({}));
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(
            config.client_info.as_ref().map(|info| info.name.as_str()),
            Some("lsp-sansio-client")
        );
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::new()
            .with_client_info("editor", None)
            .with_capabilities(json!({"window": {"showMessage": {}}}))
            .with_initialization_options(json!({"fallbackFlags": ["-std=c++20"]}))
            .with_max_message_size(1024);

        assert!(config.validate().is_ok());
        assert_eq!(
            serde_json::to_value(config.client_info.as_ref().unwrap()).unwrap(),
            json!({"name": "editor"})
        );
        assert_eq!(config.max_message_size, 1024);
        assert!(config.initialization_options.is_some());
    }

    #[test]
    fn test_validation_failures() {
        assert_eq!(
            ClientConfig::new().with_max_message_size(0).validate(),
            Err(ConfigError::ZeroMessageSize)
        );
        assert_eq!(
            ClientConfig::new().with_capabilities(json!([])).validate(),
            Err(ConfigError::CapabilitiesNotObject("[]".to_string()))
        );
        assert_eq!(
            ClientConfig::new().with_client_info("  ", None).validate(),
            Err(ConfigError::EmptyClientName)
        );
        assert!(ClientConfig::new().without_client_info().validate().is_ok());
    }
}
