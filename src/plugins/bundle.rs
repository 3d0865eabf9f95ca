//! Plugin bundles
//!
//! A bundle contributes tool schemas, the callbacks implementing them,
//! optional lifecycle hooks and an optional signature.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::trust::Signature;
use crate::aggregate::AggregatedResponse;
use crate::transport::OutboundRequest;

/// Tool schema advertised to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (`^[A-Za-z][A-Za-z0-9_]{0,63}$`)
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments, `type: "object"`
    pub parameters: Value,
}

impl ToolSchema {
    /// Create schema
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Schema taking no arguments
    pub fn without_parameters(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, json!({"type": "object", "properties": {}}))
    }
}

/// Client-side tool implementation
#[async_trait]
pub trait ToolCallback: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value>;
}

type BoxedCallFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Closure-backed callback
pub struct FnCallback {
    f: Box<dyn Fn(Map<String, Value>) -> BoxedCallFuture + Send + Sync>,
}

impl FnCallback {
    /// Wrap an async closure
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            f: Box::new(move |args| Box::pin(f(args))),
        }
    }
}

#[async_trait]
impl ToolCallback for FnCallback {
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value> {
        (self.f)(arguments).await
    }
}

/// Callback plus the source text its signature covers
#[derive(Clone)]
pub struct CallbackEntry {
    pub callback: Arc<dyn ToolCallback>,
    /// Serialized callback code, part of the signed payload
    pub code: String,
}

impl fmt::Debug for CallbackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackEntry")
            .field("code_len", &self.code.len())
            .finish()
    }
}

/// Lifecycle hooks
///
/// Pre-request hooks run in registration order and may rewrite the outbound
/// request. Post-response hooks observe the finalized response.
#[async_trait]
pub trait PluginHooks: Send + Sync {
    /// Rewrite the outbound request
    async fn pre_request(&self, _request: &mut OutboundRequest) -> Result<()> {
        Ok(())
    }

    /// Observe the finalized response
    async fn post_response(&self, _response: &AggregatedResponse) -> Result<()> {
        Ok(())
    }

    /// Called once the plugin passed verification, before it is installed
    async fn on_register(&self) -> Result<()> {
        Ok(())
    }

    /// Teardown, called before the plugin's tools are removed
    async fn on_unregister(&self) -> Result<()> {
        Ok(())
    }
}

/// Installable plugin
#[derive(Clone, Default)]
pub struct PluginBundle {
    pub name: String,
    pub version: String,
    pub tools: Vec<ToolSchema>,
    /// Tool name -> callback; sorted so serialization is deterministic
    pub callbacks: BTreeMap<String, CallbackEntry>,
    pub hooks: Option<Arc<dyn PluginHooks>>,
    pub signature: Option<Signature>,
}

impl PluginBundle {
    /// Create empty bundle
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Add a tool schema without a local callback
    pub fn with_tool(mut self, schema: ToolSchema) -> Self {
        self.tools.push(schema);
        self
    }

    /// Add a tool schema and its callback
    pub fn with_callback(
        mut self,
        schema: ToolSchema,
        code: impl Into<String>,
        callback: impl ToolCallback + 'static,
    ) -> Self {
        self.callbacks.insert(
            schema.name.clone(),
            CallbackEntry {
                callback: Arc::new(callback),
                code: code.into(),
            },
        );
        self.tools.push(schema);
        self
    }

    /// Attach lifecycle hooks
    pub fn with_hooks(mut self, hooks: impl PluginHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Attach a signature
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Tool names in declaration order
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }
}

impl fmt::Debug for PluginBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBundle")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("tools", &self.tools.len())
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.is_some())
            .field("signed", &self.signature.is_some())
            .finish()
    }
}
