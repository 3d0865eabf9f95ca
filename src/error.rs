//! Client errors

use crate::plugins::RegistryError;
use crate::transport::TransportError;

/// Errors surfaced by the chat loop and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Request construction failed: {0}")]
    Request(String),

    #[error("Pre-request hook of plugin '{plugin}' failed: {message}")]
    Hook { plugin: String, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The event stream was dropped before the response was finalized
    #[error("Stream aborted before completion")]
    Aborted,
}

impl ClientError {
    /// Whether this wraps the transport timeout sentinel
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(e) if e.is_timeout())
    }
}
