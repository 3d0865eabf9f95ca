//! Plugin registry
//!
//! # Layout
//!
//! Registered bundles live in an arena of slots; `by_name` and `tool_owner`
//! index into it. Tool-name uniqueness is enforced on the `tool_owner`
//! index, never by scanning bundles.
//!
//! # Lifecycle
//!
//! unregistered -> verifying -> registered | rejected, and
//! registered -> unregistering -> unregistered. Every check that can fail
//! runs before any index is touched, so a failed registration leaves the
//! registry exactly as it was.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::bundle::{PluginBundle, PluginHooks, ToolCallback, ToolSchema};
use super::errors::RegistryError;
use super::trust::{
    verify_bundle, PluginVerifier, TrustConfig, VerificationEvent, VerificationEventKind,
    VerificationOutcome,
};
use super::validate::validate_bundle;
use crate::config::ClientConfig;
use crate::observer::{Observers, Subscription};

/// Handle of a registered bundle (arena slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId(usize);

/// A bundle that passed registration
#[derive(Debug)]
pub struct RegisteredPlugin {
    pub bundle: PluginBundle,
    pub outcome: VerificationOutcome,
    pub registered_at: DateTime<Utc>,
}

/// Registry of installed plugins
pub struct PluginRegistry {
    slots: Vec<Option<RegisteredPlugin>>,
    free: Vec<usize>,
    by_name: HashMap<String, PluginId>,
    tool_owner: HashMap<String, PluginId>,
    /// Registration order, for schema listing and hook invocation
    order: Vec<PluginId>,
    trust: TrustConfig,
    verifier: Option<Arc<dyn PluginVerifier>>,
    verification_events: Observers<VerificationEvent>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(TrustConfig::default())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_names())
            .field("tools", &self.tool_owner.len())
            .field("trust", &self.trust)
            .field("custom_verifier", &self.verifier.is_some())
            .finish()
    }
}

impl PluginRegistry {
    /// Create registry with a trust policy
    pub fn new(trust: TrustConfig) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_name: HashMap::new(),
            tool_owner: HashMap::new(),
            order: Vec::new(),
            trust,
            verifier: None,
            verification_events: Observers::new(),
        }
    }

    /// Create registry from the `[trust]` section of a client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.trust.clone())
    }

    /// Install a custom verifier
    pub fn with_verifier(mut self, verifier: impl PluginVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Trust policy in effect
    pub fn trust(&self) -> &TrustConfig {
        &self.trust
    }

    /// Listen for every verification outcome
    pub fn subscribe_verification<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&VerificationEvent) + Send + Sync + 'static,
    {
        self.verification_events.subscribe_all(listener)
    }

    /// Listen for one kind of verification outcome
    pub fn subscribe_verification_kind<F>(&self, kind: VerificationEventKind, listener: F) -> Subscription
    where
        F: Fn(&VerificationEvent) + Send + Sync + 'static,
    {
        self.verification_events.subscribe(kind, listener)
    }

    /// Validate, verify and install one bundle
    pub async fn register(&mut self, bundle: PluginBundle) -> Result<VerificationOutcome, RegistryError> {
        let mut outcomes = self.register_all(vec![bundle]).await?;
        Ok(outcomes.remove(0))
    }

    /// Register several bundles atomically
    ///
    /// Either every bundle is installed or none is. Tool names must be
    /// unique across the batch and against already registered bundles.
    pub async fn register_all(
        &mut self,
        bundles: Vec<PluginBundle>,
    ) -> Result<Vec<VerificationOutcome>, RegistryError> {
        // Structure and uniqueness first, nothing mutated yet
        let mut batch_names = HashSet::new();
        let mut batch_tools: HashMap<&str, &str> = HashMap::new();
        for bundle in &bundles {
            if let Err(e) = validate_bundle(bundle) {
                warn!(plugin = %bundle.name, error = %e, "plugin rejected: invalid structure");
                return Err(e.into());
            }
            if self.by_name.contains_key(&bundle.name) || !batch_names.insert(bundle.name.as_str()) {
                warn!(plugin = %bundle.name, "plugin rejected: duplicate name");
                return Err(RegistryError::DuplicatePlugin(bundle.name.clone()));
            }
            for tool in bundle.tool_names() {
                let owner = self
                    .owner_of(tool)
                    .map(str::to_string)
                    .or_else(|| batch_tools.get(tool).map(|o| o.to_string()));
                if let Some(owner) = owner {
                    warn!(plugin = %bundle.name, tool = %tool, owner = %owner, "plugin rejected: tool conflict");
                    return Err(RegistryError::ToolConflict {
                        tool: tool.to_string(),
                        owner,
                    });
                }
                batch_tools.insert(tool, bundle.name.as_str());
            }
        }

        // Trust
        let mut outcomes = Vec::with_capacity(bundles.len());
        for bundle in &bundles {
            let outcome = verify_bundle(bundle, &self.trust, self.verifier.as_deref()).await;
            self.verification_events
                .emit(&VerificationEvent::from(outcome.clone()));
            if !outcome.verified {
                warn!(plugin = %bundle.name, reason = %outcome.reason, "plugin failed verification");
                return Err(RegistryError::Verification {
                    plugin: bundle.name.clone(),
                    reason: outcome.reason,
                    detail: outcome.error.clone().unwrap_or_default(),
                });
            }
            debug!(plugin = %bundle.name, reason = %outcome.reason, "plugin verified");
            outcomes.push(outcome);
        }

        // Registration hooks; roll back the ones that already ran on failure
        for (index, bundle) in bundles.iter().enumerate() {
            let Some(hooks) = &bundle.hooks else { continue };
            if let Err(e) = hooks.on_register().await {
                warn!(plugin = %bundle.name, error = %e, "on_register hook failed");
                for earlier in &bundles[..index] {
                    if let Some(h) = &earlier.hooks {
                        if let Err(e) = h.on_unregister().await {
                            warn!(plugin = %earlier.name, error = %e, "rollback teardown failed");
                        }
                    }
                }
                return Err(RegistryError::Hook {
                    plugin: bundle.name.clone(),
                    message: e.to_string(),
                });
            }
        }

        for (bundle, outcome) in bundles.into_iter().zip(outcomes.iter().cloned()) {
            self.install(bundle, outcome);
        }
        Ok(outcomes)
    }

    fn install(&mut self, bundle: PluginBundle, outcome: VerificationOutcome) {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        let id = PluginId(slot);

        for tool in bundle.tool_names() {
            self.tool_owner.insert(tool.to_string(), id);
        }
        self.by_name.insert(bundle.name.clone(), id);
        self.order.push(id);

        info!(
            "Registered plugin: {} v{} ({} tools, {} callbacks)",
            bundle.name,
            bundle.version,
            bundle.tools.len(),
            bundle.callbacks.len()
        );

        self.slots[slot] = Some(RegisteredPlugin {
            bundle,
            outcome,
            registered_at: Utc::now(),
        });
    }

    /// Run the teardown hook and remove a bundle
    ///
    /// A failing teardown hook is logged; the bundle is removed regardless.
    pub async fn unregister(&mut self, name: &str) -> Result<PluginBundle, RegistryError> {
        let id = *self
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;

        if let Some(hooks) = self.get(name).and_then(|b| b.hooks.clone()) {
            if let Err(e) = hooks.on_unregister().await {
                warn!(plugin = %name, error = %e, "on_unregister hook failed");
            }
        }

        let plugin = self.slots[id.0]
            .take()
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        self.by_name.remove(name);
        self.tool_owner.retain(|_, owner| *owner != id);
        self.order.retain(|p| *p != id);
        self.free.push(id.0);

        info!("Unregistered plugin: {}", name);
        Ok(plugin.bundle)
    }

    fn slot(&self, id: PluginId) -> Option<&RegisteredPlugin> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn registered(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.order.iter().filter_map(|id| self.slot(*id))
    }

    /// Bundle registered under `name`
    pub fn get(&self, name: &str) -> Option<&PluginBundle> {
        self.by_name
            .get(name)
            .and_then(|id| self.slot(*id))
            .map(|p| &p.bundle)
    }

    /// Registration record for `name`
    pub fn record(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.by_name.get(name).and_then(|id| self.slot(*id))
    }

    /// Name of the bundle owning a tool
    pub fn owner_of(&self, tool: &str) -> Option<&str> {
        self.tool_owner
            .get(tool)
            .and_then(|id| self.slot(*id))
            .map(|p| p.bundle.name.as_str())
    }

    /// Whether `name` is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered bundle names, in registration order
    pub fn plugin_names(&self) -> Vec<String> {
        self.registered().map(|p| p.bundle.name.clone()).collect()
    }

    /// Every advertised tool schema, in registration order
    pub fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.registered()
            .flat_map(|p| p.bundle.tools.iter().cloned())
            .collect()
    }

    /// Local callback for a tool
    pub fn callback(&self, tool: &str) -> Option<Arc<dyn ToolCallback>> {
        let id = self.tool_owner.get(tool)?;
        self.slot(*id)?
            .bundle
            .callbacks
            .get(tool)
            .map(|entry| Arc::clone(&entry.callback))
    }

    /// Whether a tool has a local callback
    pub fn has_callback(&self, tool: &str) -> bool {
        self.callback(tool).is_some()
    }

    /// Names of every tool with a local callback
    pub fn callable_tools(&self) -> HashSet<String> {
        self.registered()
            .flat_map(|p| p.bundle.callbacks.keys().cloned())
            .collect()
    }

    /// Lifecycle hooks, in registration order
    pub fn hooks(&self) -> Vec<(String, Arc<dyn PluginHooks>)> {
        self.registered()
            .filter_map(|p| {
                p.bundle
                    .hooks
                    .as_ref()
                    .map(|h| (p.bundle.name.clone(), Arc::clone(h)))
            })
            .collect()
    }

    /// Number of registered bundles
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no bundle is registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
