//! Configuration file tests

use agentwire::config::ClientConfig;
use agentwire::error::ClientError;
use agentwire::plugins::TrustConfig;
use ed25519_dalek::SigningKey;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agentwire.toml");

    let mut config = ClientConfig::default();
    config.endpoint.url = "https://agent.example/api/chat".to_string();
    config.endpoint.timeout_secs = 30;
    config
        .endpoint
        .headers
        .insert("x-api-key".to_string(), "k".to_string());
    config.chat_loop.max_rounds = 4;
    config.trust = TrustConfig::strict()
        .with_hmac_key("secret")
        .with_ed25519_key(&SigningKey::from_bytes(&[1u8; 32]).verifying_key());
    config
        .request
        .fields
        .insert("model".to_string(), json!("agent-large"));

    config.save(&path).await.unwrap();
    let loaded = ClientConfig::load(&path).await.unwrap();

    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

#[tokio::test]
async fn test_load_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = ClientConfig::load(dir.path().join("absent.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

#[tokio::test]
async fn test_load_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    tokio::fs::write(&path, "[endpoint\nurl = ").await.unwrap();

    let err = ClientConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_trust_section_from_toml() {
    let config = ClientConfig::from_toml_str(
        r#"
        [endpoint]
        url = "http://localhost:3000/chat"

        [trust]
        skip_verification = false
        trusted_plugins = ["builtin-tools", "house-tools"]
        hmac_key = "abc"
        "#,
    )
    .unwrap();

    assert!(!config.trust.skip_verification);
    assert_eq!(config.trust.trusted_plugins.len(), 2);
    assert_eq!(config.trust.hmac_key.as_deref(), Some("abc"));
    assert!(config.validate().is_ok());
}
