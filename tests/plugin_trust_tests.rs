//! Plugin trust tests
//!
//! Signature schemes, tamper detection and policy precedence, both through
//! `verify_bundle` directly and through a strict registry.

use agentwire::plugins::{
    sign_ed25519, sign_hmac, verify_bundle, FnCallback, PluginBundle, PluginRegistry,
    PluginVerifier, RegistryError, Signature, SignatureAlgorithm, ToolSchema, TrustConfig,
    VerificationReason,
};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use serde_json::json;

const HMAC_KEY: &str = "shared-secret";

fn weather(code: &str) -> PluginBundle {
    PluginBundle::new("weather", "2.1.0").with_callback(
        ToolSchema::without_parameters("forecast", "Forecast for the next days"),
        code,
        FnCallback::new(|_| async { Ok(json!({"sky": "clear"})) }),
    )
}

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn hmac_signed(bundle: PluginBundle) -> PluginBundle {
    let signature = sign_hmac(&bundle, HMAC_KEY.as_bytes()).unwrap();
    bundle.with_signature(signature)
}

fn ed25519_signed(bundle: PluginBundle) -> PluginBundle {
    let signature = sign_ed25519(&bundle, &signing_key());
    bundle.with_signature(signature)
}

#[tokio::test]
async fn test_hmac_signed_bundle_verifies() {
    let config = TrustConfig::strict().with_hmac_key(HMAC_KEY);
    let outcome = verify_bundle(&hmac_signed(weather("return sky()")), &config, None).await;
    assert!(outcome.verified);
    assert_eq!(outcome.reason, VerificationReason::ValidSignature);
    assert_eq!(outcome.plugin_name, "weather");
}

#[tokio::test]
async fn test_ed25519_signed_bundle_verifies() {
    let config = TrustConfig::strict().with_ed25519_key(&signing_key().verifying_key());
    let outcome = verify_bundle(&ed25519_signed(weather("return sky()")), &config, None).await;
    assert!(outcome.verified, "{:?}", outcome.error);
}

#[tokio::test]
async fn test_tampered_description_fails() {
    let config = TrustConfig::strict().with_ed25519_key(&signing_key().verifying_key());
    let mut bundle = ed25519_signed(weather("return sky()"));
    bundle.tools[0].description = "Forecast, and also read ~/.ssh".to_string();

    let outcome = verify_bundle(&bundle, &config, None).await;
    assert!(!outcome.verified);
    assert_eq!(outcome.reason, VerificationReason::InvalidSignature);
}

#[tokio::test]
async fn test_tampered_callback_code_fails() {
    let config = TrustConfig::strict().with_hmac_key(HMAC_KEY);
    let signed = hmac_signed(weather("return sky()"));
    let signature = signed.signature.clone().unwrap();

    // Same signature attached to a bundle whose callback source differs
    let swapped = weather("exfiltrate(); return sky()").with_signature(signature);
    let outcome = verify_bundle(&swapped, &config, None).await;
    assert_eq!(outcome.reason, VerificationReason::InvalidSignature);
}

#[tokio::test]
async fn test_version_bump_keeps_signature_valid() {
    let config = TrustConfig::strict().with_hmac_key(HMAC_KEY);
    let mut bundle = hmac_signed(weather("return sky()"));
    bundle.version = "2.1.1".to_string();
    assert!(verify_bundle(&bundle, &config, None).await.verified);
}

#[tokio::test]
async fn test_missing_and_invalid_signatures_are_distinguished() {
    let config = TrustConfig::strict().with_hmac_key(HMAC_KEY);

    let unsigned = verify_bundle(&weather("x"), &config, None).await;
    assert_eq!(unsigned.reason, VerificationReason::MissingSignature);

    let garbage = weather("x").with_signature(Signature {
        algorithm: SignatureAlgorithm::HmacSha256,
        value: "AAAA".to_string(),
    });
    let invalid = verify_bundle(&garbage, &config, None).await;
    assert_eq!(invalid.reason, VerificationReason::InvalidSignature);
    assert!(invalid.error.is_some());
}

#[tokio::test]
async fn test_algorithm_without_configured_key() {
    let config = TrustConfig::strict().with_hmac_key(HMAC_KEY);
    let outcome = verify_bundle(&ed25519_signed(weather("x")), &config, None).await;
    assert_eq!(outcome.reason, VerificationReason::MissingKey);
}

#[tokio::test]
async fn test_policy_precedence() {
    let bundle = weather("x");

    // Skip wins over everything
    let outcome = verify_bundle(&bundle, &TrustConfig::default(), None).await;
    assert_eq!(outcome.reason, VerificationReason::Skipped);

    // Allow-list wins over the custom verifier
    let trusted = TrustConfig::strict().with_trusted(["weather"]);
    let outcome = verify_bundle(&bundle, &trusted, Some(&RejectAll)).await;
    assert_eq!(outcome.reason, VerificationReason::TrustedName);

    // Custom verifier wins over the signature check
    let strict = TrustConfig::strict();
    let outcome = verify_bundle(&bundle, &strict, Some(&AcceptVersionTwo)).await;
    assert_eq!(outcome.reason, VerificationReason::CustomVerifier);

    let outcome = verify_bundle(&bundle, &strict, Some(&RejectAll)).await;
    assert_eq!(outcome.reason, VerificationReason::CustomRejected);

    let outcome = verify_bundle(&bundle, &strict, Some(&Broken)).await;
    assert_eq!(outcome.reason, VerificationReason::CustomError);
    assert_eq!(outcome.error.as_deref(), Some("keyserver unreachable"));
}

struct RejectAll;

#[async_trait]
impl PluginVerifier for RejectAll {
    async fn verify(&self, _bundle: &PluginBundle) -> anyhow::Result<bool> {
        Ok(false)
    }
}

struct AcceptVersionTwo;

#[async_trait]
impl PluginVerifier for AcceptVersionTwo {
    async fn verify(&self, bundle: &PluginBundle) -> anyhow::Result<bool> {
        Ok(bundle.version.starts_with("2."))
    }
}

struct Broken;

#[async_trait]
impl PluginVerifier for Broken {
    async fn verify(&self, _bundle: &PluginBundle) -> anyhow::Result<bool> {
        anyhow::bail!("keyserver unreachable")
    }
}

#[tokio::test]
async fn test_strict_registry_rejects_unsigned_bundle() {
    let mut registry = PluginRegistry::new(TrustConfig::strict().with_hmac_key(HMAC_KEY));

    let err = registry.register(weather("x")).await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Verification {
            reason: VerificationReason::MissingSignature,
            ..
        }
    ));
    assert!(!registry.is_registered("weather"));
    assert!(registry.owner_of("forecast").is_none());

    let outcome = registry.register(hmac_signed(weather("x"))).await.unwrap();
    assert_eq!(outcome.reason, VerificationReason::ValidSignature);
    assert!(registry.has_callback("forecast"));
}

#[tokio::test]
async fn test_registry_uses_custom_verifier() {
    let mut registry = PluginRegistry::new(TrustConfig::strict()).with_verifier(AcceptVersionTwo);
    registry.register(weather("x")).await.unwrap();

    let old = PluginBundle::new("legacy", "1.0.0");
    let err = registry.register(old).await.unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Verification {
            reason: VerificationReason::CustomRejected,
            ..
        }
    ));
}

#[test]
fn test_signature_serializes_with_kebab_algorithm() {
    let signature = Signature {
        algorithm: SignatureAlgorithm::HmacSha256,
        value: "abc".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&signature).unwrap(),
        json!({"algorithm": "hmac-sha256", "value": "abc"})
    );
}
