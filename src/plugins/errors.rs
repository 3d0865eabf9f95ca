//! Plugin registry errors

use super::trust::VerificationReason;

/// Structural validation errors, one per rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Plugin name is missing")]
    MissingName,

    #[error("Plugin '{0}' has no version")]
    MissingVersion(String),

    #[error("Invalid tool name '{0}': must match ^[A-Za-z][A-Za-z0-9_]{{0,63}}$")]
    InvalidToolName(String),

    #[error("Tool '{0}' has no description")]
    MissingDescription(String),

    #[error("Tool '{tool}' has an invalid parameter schema: {reason}")]
    InvalidParameters { tool: String, reason: String },

    #[error("Tool '{0}' is declared twice in the same plugin")]
    DuplicateTool(String),

    #[error("Callback '{0}' has no matching tool schema")]
    OrphanCallback(String),
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("Tool '{tool}' is already provided by plugin '{owner}'")]
    ToolConflict { tool: String, owner: String },

    #[error("Plugin '{plugin}' failed verification ({reason}): {detail}")]
    Verification {
        plugin: String,
        reason: VerificationReason,
        detail: String,
    },

    #[error("Plugin '{0}' is not registered")]
    NotRegistered(String),

    #[error("Hook of plugin '{plugin}' failed: {message}")]
    Hook { plugin: String, message: String },
}
