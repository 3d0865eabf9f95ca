//! Plugin registry tests
//!
//! Atomic batch registration, tool ownership, hook ordering and teardown.

use std::sync::{Arc, Mutex};

use agentwire::plugins::{
    FnCallback, PluginBundle, PluginHooks, PluginRegistry, RegistryError, ToolSchema,
    TrustConfig, ValidationError, VerificationEventKind,
};
use async_trait::async_trait;
use serde_json::json;

fn bundle(name: &str, tools: &[&str]) -> PluginBundle {
    tools.iter().fold(PluginBundle::new(name, "1.0.0"), |b, tool| {
        b.with_callback(
            ToolSchema::without_parameters(*tool, format!("{} tool", tool)),
            format!("{}()", tool),
            FnCallback::new(|_| async { Ok(json!(null)) }),
        )
    })
}

/// Records hook calls as "<plugin>:<hook>"
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_register: bool,
}

impl Recorder {
    fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name,
            log: Arc::clone(log),
            fail_register: false,
        }
    }

    fn failing(mut self) -> Self {
        self.fail_register = true;
        self
    }

    fn push(&self, hook: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, hook));
    }
}

#[async_trait]
impl PluginHooks for Recorder {
    async fn on_register(&self) -> anyhow::Result<()> {
        self.push("register");
        if self.fail_register {
            anyhow::bail!("init failed");
        }
        Ok(())
    }

    async fn on_unregister(&self) -> anyhow::Result<()> {
        self.push("unregister");
        Ok(())
    }
}

#[tokio::test]
async fn test_overlapping_batch_installs_nothing() {
    let mut registry = PluginRegistry::default();
    let err = registry
        .register_all(vec![
            bundle("first", &["search", "fetch"]),
            bundle("second", &["fetch"]),
        ])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegistryError::ToolConflict {
            tool: "fetch".to_string(),
            owner: "first".to_string(),
        }
    );
    assert!(registry.is_empty());
    assert!(registry.owner_of("search").is_none());
}

#[tokio::test]
async fn test_conflict_with_registered_plugin() {
    let mut registry = PluginRegistry::default();
    registry.register(bundle("files", &["read_file"])).await.unwrap();

    let err = registry
        .register(bundle("other", &["read_file", "write_file"]))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ToolConflict { ref owner, .. } if owner == "files"));
    assert!(!registry.is_registered("other"));
    assert!(registry.owner_of("write_file").is_none());
    assert_eq!(registry.owner_of("read_file"), Some("files"));
}

#[tokio::test]
async fn test_invalid_bundle_rejected_before_anything_runs() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = PluginRegistry::default();

    let err = registry
        .register_all(vec![
            bundle("ok", &["fine"]).with_hooks(Recorder::new("ok", &log)),
            bundle("bad", &["9lives"]),
        ])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RegistryError::Validation(ValidationError::InvalidToolName("9lives".to_string()))
    );
    assert!(log.lock().unwrap().is_empty());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_failed_register_hook_rolls_back_batch() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = PluginRegistry::default();

    let err = registry
        .register_all(vec![
            bundle("a", &["alpha"]).with_hooks(Recorder::new("a", &log)),
            bundle("b", &["beta"]).with_hooks(Recorder::new("b", &log).failing()),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Hook { ref plugin, .. } if plugin == "b"));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:register", "b:register", "a:unregister"]
    );
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_unregister_runs_teardown_and_frees_tools() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = PluginRegistry::default();
    registry
        .register(bundle("git", &["git_status"]).with_hooks(Recorder::new("git", &log)))
        .await
        .unwrap();
    assert!(registry.has_callback("git_status"));

    let removed = registry.unregister("git").await.unwrap();
    assert_eq!(removed.name, "git");
    assert_eq!(*log.lock().unwrap(), vec!["git:register", "git:unregister"]);
    assert!(!registry.has_callback("git_status"));

    // Tool name is free again
    registry.register(bundle("git2", &["git_status"])).await.unwrap();
    assert_eq!(registry.owner_of("git_status"), Some("git2"));
}

#[tokio::test]
async fn test_schemas_and_hooks_follow_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = PluginRegistry::default();
    registry
        .register_all(vec![
            bundle("zeta", &["z_tool"]).with_hooks(Recorder::new("zeta", &log)),
            bundle("alpha", &["a_tool"]).with_hooks(Recorder::new("alpha", &log)),
        ])
        .await
        .unwrap();

    let schemas: Vec<_> = registry.tool_schemas().into_iter().map(|s| s.name).collect();
    assert_eq!(schemas, vec!["z_tool", "a_tool"]);

    let hooks: Vec<_> = registry.hooks().into_iter().map(|(name, _)| name).collect();
    assert_eq!(hooks, vec!["zeta", "alpha"]);
    assert_eq!(registry.plugin_names(), vec!["zeta", "alpha"]);
}

#[tokio::test]
async fn test_schema_only_tools_are_advertised_but_not_callable() {
    let mut registry = PluginRegistry::default();
    registry
        .register(
            PluginBundle::new("remote", "0.1.0")
                .with_tool(ToolSchema::without_parameters("server_search", "Runs on the server")),
        )
        .await
        .unwrap();

    assert_eq!(registry.tool_schemas().len(), 1);
    assert!(registry.callable_tools().is_empty());
    assert!(registry.callback("server_search").is_none());
}

#[tokio::test]
async fn test_callback_invocation_through_registry() {
    let mut registry = PluginRegistry::default();
    registry
        .register(PluginBundle::new("math", "1.0.0").with_callback(
            ToolSchema::new(
                "add",
                "Add two numbers",
                json!({"type": "object", "properties": {"a": {}, "b": {}}}),
            ),
            "a + b",
            FnCallback::new(|args| async move {
                let a = args.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
                let b = args.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(json!(a + b))
            }),
        ))
        .await
        .unwrap();

    let callback = registry.callback("add").unwrap();
    let args = json!({"a": 2, "b": 3}).as_object().cloned().unwrap();
    assert_eq!(callback.call(args).await.unwrap(), json!(5));
}

#[tokio::test]
async fn test_verification_events_are_published() {
    let mut registry = PluginRegistry::new(TrustConfig::strict().with_trusted(["builtin-tools"]));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let failures = Arc::new(Mutex::new(0));

    let sink = Arc::clone(&seen);
    let _all = registry.subscribe_verification(move |e| {
        sink.lock().unwrap().push((e.kind, e.outcome.plugin_name.clone()));
    });
    let counter = Arc::clone(&failures);
    let _failed = registry.subscribe_verification_kind(VerificationEventKind::Failure, move |_| {
        *counter.lock().unwrap() += 1;
    });

    registry.register(bundle("builtin-tools", &["echo"])).await.unwrap();
    assert!(registry.register(bundle("unsigned", &["other"])).await.is_err());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (VerificationEventKind::Success, "builtin-tools".to_string()),
            (VerificationEventKind::Failure, "unsigned".to_string()),
        ]
    );
    assert_eq!(*failures.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_registered_record_keeps_outcome() {
    let mut registry = PluginRegistry::default();
    registry.register(bundle("anything", &["thing"])).await.unwrap();

    let record = registry.record("anything").unwrap();
    assert!(record.outcome.verified);
    assert_eq!(record.bundle.version, "1.0.0");
    assert_eq!(registry.len(), 1);
}
