//! Client configuration
//!
//! TOML configuration for the endpoint, the chat loop and the plugin trust
//! policy. Every section is optional and falls back to its defaults.
//!
//! ```toml
//! [endpoint]
//! url = "https://agent.example.com/api/chat"
//! timeout_secs = 120
//!
//! [endpoint.headers]
//! x-client = "agentwire"
//!
//! [chat_loop]
//! max_rounds = 10
//!
//! [trust]
//! skip_verification = false
//! trusted_plugins = ["builtin-tools"]
//! hmac_key = "shared-secret"
//!
//! [request.fields]
//! model = "agent-1"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::chat_loop::constants::{DEFAULT_MAX_ROUNDS, DEFAULT_TOOL_FINISH_REASONS};
use crate::error::ClientError;
use crate::plugins::trust::{decode_verifying_key, TrustConfig};
use crate::transport::DEFAULT_TIMEOUT_SECS;

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: EndpointConfig,
    pub chat_loop: LoopConfig,
    pub trust: TrustConfig,
    pub request: RequestConfig,
}

/// Endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Streaming chat endpoint
    pub url: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headers: BTreeMap::new(),
        }
    }
}

impl EndpointConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Chat loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Round cap (0 = unbounded)
    pub max_rounds: u32,
    /// Finish reasons that trigger client tool execution
    pub tool_finish_reasons: Vec<String>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            tool_finish_reasons: DEFAULT_TOOL_FINISH_REASONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl LoopConfig {
    /// Set the round cap
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}

/// Static request body fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub fields: Map<String, Value>,
}

impl ClientConfig {
    /// Parse from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ClientError> {
        toml::from_str(content).map_err(|e| ClientError::Config(format!("Failed to parse config: {e}")))
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, ClientError> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Load from a TOML file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::Config(format!("Failed to read config file {path:?}: {e}")))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded client configuration from {:?}", path);
        Ok(config)
    }

    /// Write to a TOML file
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ClientError> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_toml_string()?)
            .await
            .map_err(|e| ClientError::Config(format!("Failed to write config file {path:?}: {e}")))?;
        info!("Saved client configuration to {:?}", path);
        Ok(())
    }

    /// Check values that parse but cannot work
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.endpoint.url.trim().is_empty() {
            return Err(ClientError::Config("endpoint.url is empty".to_string()));
        }
        if self.endpoint.timeout_secs == 0 {
            return Err(ClientError::Config("endpoint.timeout_secs must be positive".to_string()));
        }
        if self.chat_loop.tool_finish_reasons.is_empty() {
            return Err(ClientError::Config(
                "chat_loop.tool_finish_reasons is empty".to_string(),
            ));
        }
        if let Some(key) = &self.trust.ed25519_public_key {
            decode_verifying_key(key)
                .map_err(|e| ClientError::Config(format!("trust.ed25519_public_key: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint.timeout_secs, 120);
        assert_eq!(config.chat_loop.max_rounds, 10);
        assert!(config.trust.skip_verification);
        assert_eq!(config.trust.trusted_plugins, vec!["builtin-tools".to_string()]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            [endpoint]
            url = "http://localhost:8080/chat"

            [chat_loop]
            max_rounds = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint.url, "http://localhost:8080/chat");
        assert_eq!(config.endpoint.timeout_secs, 120);
        assert_eq!(config.chat_loop.max_rounds, 0);
        assert_eq!(config.chat_loop.tool_finish_reasons.len(), 2);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ClientConfig::from_toml_str("[endpoint\nurl="),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = ClientConfig::default();
        assert!(config.validate().is_err());

        config.endpoint.url = "http://x".to_string();
        assert!(config.validate().is_ok());

        config.trust.ed25519_public_key = Some("not base64!".to_string());
        assert!(config.validate().is_err());
    }
}
