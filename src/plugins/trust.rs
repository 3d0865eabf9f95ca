//! Plugin trust verification
//!
//! Decides whether a bundle may be registered. Policy precedence:
//!
//! 1. `skip_verification` accepts everything
//! 2. bundles named in `trusted_plugins` are accepted
//! 3. a custom [`PluginVerifier`], when installed, decides
//! 4. otherwise the built-in signature check runs
//!
//! The signature covers [`canonical_payload`]: tool descriptions and
//! callback source, each sorted by name, serialized as compact JSON.
//! Changing either invalidates the signature.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::bundle::PluginBundle;
use crate::observer::Observable;

type HmacSha256 = Hmac<Sha256>;

/// Bundle names trusted without a signature by default
pub const DEFAULT_TRUSTED_PLUGINS: &[&str] = &["builtin-tools"];

/// Signature scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// Shared-key HMAC-SHA256
    HmacSha256,
    /// Ed25519 with a configured public key
    Ed25519,
}

/// Detached signature over the canonical payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: SignatureAlgorithm,
    /// Base64 signature bytes
    pub value: String,
}

/// Trust configuration (`[trust]` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Accept every bundle without checks
    pub skip_verification: bool,
    /// Bundle names accepted without a signature
    pub trusted_plugins: Vec<String>,
    /// Shared key for HMAC-SHA256 signatures
    pub hmac_key: Option<String>,
    /// Base64 Ed25519 public key (32 bytes)
    pub ed25519_public_key: Option<String>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            skip_verification: true,
            trusted_plugins: DEFAULT_TRUSTED_PLUGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hmac_key: None,
            ed25519_public_key: None,
        }
    }
}

impl TrustConfig {
    /// Configuration that requires a check for every bundle
    pub fn strict() -> Self {
        Self {
            skip_verification: false,
            trusted_plugins: Vec::new(),
            ..Self::default()
        }
    }

    /// Require HMAC signatures made with `key`
    pub fn with_hmac_key(mut self, key: impl Into<String>) -> Self {
        self.hmac_key = Some(key.into());
        self
    }

    /// Require Ed25519 signatures verifiable with `key`
    pub fn with_ed25519_key(mut self, key: &VerifyingKey) -> Self {
        self.ed25519_public_key = Some(BASE64.encode(key.as_bytes()));
        self
    }

    /// Replace the allow-list
    pub fn with_trusted(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trusted_plugins = names.into_iter().map(Into::into).collect();
        self
    }

    fn is_trusted(&self, name: &str) -> bool {
        self.trusted_plugins.iter().any(|n| n == name)
    }
}

/// Why a bundle was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    Skipped,
    TrustedName,
    CustomVerifier,
    ValidSignature,
    MissingSignature,
    InvalidSignature,
    MissingKey,
    CustomRejected,
    CustomError,
}

impl fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationReason::Skipped => "skipped",
            VerificationReason::TrustedName => "trusted_name",
            VerificationReason::CustomVerifier => "custom_verifier",
            VerificationReason::ValidSignature => "valid_signature",
            VerificationReason::MissingSignature => "missing_signature",
            VerificationReason::InvalidSignature => "invalid_signature",
            VerificationReason::MissingKey => "missing_key",
            VerificationReason::CustomRejected => "custom_rejected",
            VerificationReason::CustomError => "custom_error",
        };
        f.write_str(s)
    }
}

/// Result of one verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub verified: bool,
    pub reason: VerificationReason,
    pub plugin_name: String,
    pub error: Option<String>,
}

impl VerificationOutcome {
    fn accept(plugin: &str, reason: VerificationReason) -> Self {
        Self {
            verified: true,
            reason,
            plugin_name: plugin.to_string(),
            error: None,
        }
    }

    fn reject(plugin: &str, reason: VerificationReason, error: impl Into<String>) -> Self {
        Self {
            verified: false,
            reason,
            plugin_name: plugin.to_string(),
            error: Some(error.into()),
        }
    }
}

/// Kind of verification notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationEventKind {
    Success,
    Failure,
    Skipped,
}

/// Verification notification delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEvent {
    pub kind: VerificationEventKind,
    pub outcome: VerificationOutcome,
}

impl From<VerificationOutcome> for VerificationEvent {
    fn from(outcome: VerificationOutcome) -> Self {
        let kind = match (outcome.verified, outcome.reason) {
            (true, VerificationReason::Skipped) => VerificationEventKind::Skipped,
            (true, _) => VerificationEventKind::Success,
            (false, _) => VerificationEventKind::Failure,
        };
        Self { kind, outcome }
    }
}

impl Observable for VerificationEvent {
    type Kind = VerificationEventKind;

    fn kind(&self) -> VerificationEventKind {
        self.kind
    }
}

/// Caller-supplied verification policy
#[async_trait]
pub trait PluginVerifier: Send + Sync {
    /// `Ok(true)` accepts, `Ok(false)` rejects
    async fn verify(&self, bundle: &PluginBundle) -> anyhow::Result<bool>;
}

#[derive(Serialize)]
struct CanonicalPayload<'a> {
    tools: BTreeMap<&'a str, &'a str>,
    callbacks: BTreeMap<&'a str, &'a str>,
}

/// Deterministic serialization of the signed parts of a bundle
pub fn canonical_payload(bundle: &PluginBundle) -> String {
    let payload = CanonicalPayload {
        tools: bundle
            .tools
            .iter()
            .map(|t| (t.name.as_str(), t.description.as_str()))
            .collect(),
        callbacks: bundle
            .callbacks
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.code.as_str()))
            .collect(),
    };
    // Maps of strings always serialize
    serde_json::to_string(&payload).unwrap_or_default()
}

fn hmac_for(bundle: &PluginBundle, key: &[u8]) -> anyhow::Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("HMAC key rejected: {}", e))?;
    mac.update(canonical_payload(bundle).as_bytes());
    Ok(mac)
}

/// Sign a bundle with a shared HMAC key
pub fn sign_hmac(bundle: &PluginBundle, key: &[u8]) -> anyhow::Result<Signature> {
    let tag = hmac_for(bundle, key)?.finalize().into_bytes();
    Ok(Signature {
        algorithm: SignatureAlgorithm::HmacSha256,
        value: BASE64.encode(tag),
    })
}

/// Sign a bundle with an Ed25519 key
pub fn sign_ed25519(bundle: &PluginBundle, signing_key: &SigningKey) -> Signature {
    let sig = signing_key.sign(canonical_payload(bundle).as_bytes());
    Signature {
        algorithm: SignatureAlgorithm::Ed25519,
        value: BASE64.encode(sig.to_bytes()),
    }
}

/// Built-in signature check only
pub fn verify_signature(bundle: &PluginBundle, config: &TrustConfig) -> VerificationOutcome {
    let name = bundle.name.as_str();
    let Some(signature) = &bundle.signature else {
        return VerificationOutcome::reject(
            name,
            VerificationReason::MissingSignature,
            "bundle carries no signature",
        );
    };

    let raw = match BASE64.decode(&signature.value) {
        Ok(raw) => raw,
        Err(e) => {
            return VerificationOutcome::reject(
                name,
                VerificationReason::InvalidSignature,
                format!("signature is not base64: {}", e),
            )
        }
    };

    let checked = match signature.algorithm {
        SignatureAlgorithm::HmacSha256 => {
            let Some(key) = &config.hmac_key else {
                return VerificationOutcome::reject(
                    name,
                    VerificationReason::MissingKey,
                    "no hmac_key configured",
                );
            };
            hmac_for(bundle, key.as_bytes())
                .and_then(|mac| mac.verify_slice(&raw).map_err(|_| anyhow::anyhow!("HMAC mismatch")))
        }
        SignatureAlgorithm::Ed25519 => {
            let Some(key_b64) = &config.ed25519_public_key else {
                return VerificationOutcome::reject(
                    name,
                    VerificationReason::MissingKey,
                    "no ed25519_public_key configured",
                );
            };
            let key = match decode_verifying_key(key_b64) {
                Ok(key) => key,
                Err(e) => {
                    return VerificationOutcome::reject(name, VerificationReason::MissingKey, e.to_string())
                }
            };
            Ed25519Signature::from_slice(&raw)
                .map_err(|e| anyhow::anyhow!("malformed signature: {}", e))
                .and_then(|sig| {
                    key.verify(canonical_payload(bundle).as_bytes(), &sig)
                        .map_err(|_| anyhow::anyhow!("Ed25519 signature mismatch"))
                })
        }
    };

    match checked {
        Ok(()) => VerificationOutcome::accept(name, VerificationReason::ValidSignature),
        Err(e) => VerificationOutcome::reject(name, VerificationReason::InvalidSignature, e.to_string()),
    }
}

/// Decode a base64 Ed25519 public key
pub fn decode_verifying_key(key_b64: &str) -> anyhow::Result<VerifyingKey> {
    let bytes = BASE64.decode(key_b64.trim())?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("Ed25519 public key must be 32 bytes, got {}", bytes.len()))?;
    Ok(VerifyingKey::from_bytes(&bytes)?)
}

/// Apply the full policy to one bundle
pub async fn verify_bundle(
    bundle: &PluginBundle,
    config: &TrustConfig,
    custom: Option<&dyn PluginVerifier>,
) -> VerificationOutcome {
    let name = bundle.name.as_str();

    if config.skip_verification {
        return VerificationOutcome::accept(name, VerificationReason::Skipped);
    }
    if config.is_trusted(name) {
        return VerificationOutcome::accept(name, VerificationReason::TrustedName);
    }
    if let Some(verifier) = custom {
        return match verifier.verify(bundle).await {
            Ok(true) => VerificationOutcome::accept(name, VerificationReason::CustomVerifier),
            Ok(false) => VerificationOutcome::reject(
                name,
                VerificationReason::CustomRejected,
                "custom verifier rejected the bundle",
            ),
            Err(e) => VerificationOutcome::reject(name, VerificationReason::CustomError, e.to_string()),
        };
    }

    verify_signature(bundle, config)
}
