//! Plugins
//!
//! Installable bundles of tool schemas, client-side callbacks and lifecycle
//! hooks, gated by a trust policy before they are registered.

pub mod bundle;
pub mod errors;
pub mod registry;
pub mod trust;
pub mod validate;

pub use bundle::{CallbackEntry, FnCallback, PluginBundle, PluginHooks, ToolCallback, ToolSchema};
pub use errors::{RegistryError, ValidationError};
pub use registry::{PluginId, PluginRegistry, RegisteredPlugin};
pub use trust::{
    canonical_payload, decode_verifying_key, sign_ed25519, sign_hmac, verify_bundle,
    verify_signature, PluginVerifier, Signature, SignatureAlgorithm, TrustConfig,
    VerificationEvent, VerificationEventKind, VerificationOutcome, VerificationReason,
};
pub use validate::{is_valid_tool_name, validate_bundle, validate_tool, TOOL_NAME_PATTERN};
