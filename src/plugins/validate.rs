//! Structural validation of plugin bundles
//!
//! Fails fast on the first violation.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::bundle::{PluginBundle, ToolSchema};
use super::errors::ValidationError;

/// Tool name pattern
pub const TOOL_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_]{0,63}$";

fn tool_name_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(TOOL_NAME_PATTERN).ok())
        .as_ref()
}

/// Whether a tool name is acceptable
pub fn is_valid_tool_name(name: &str) -> bool {
    tool_name_regex().is_some_and(|re| re.is_match(name))
}

/// Validate one tool schema
pub fn validate_tool(tool: &ToolSchema) -> Result<(), ValidationError> {
    if !is_valid_tool_name(&tool.name) {
        return Err(ValidationError::InvalidToolName(tool.name.clone()));
    }
    if tool.description.trim().is_empty() {
        return Err(ValidationError::MissingDescription(tool.name.clone()));
    }
    match &tool.parameters {
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some("object") => Ok(()),
            other => Err(ValidationError::InvalidParameters {
                tool: tool.name.clone(),
                reason: format!("type must be \"object\", got {:?}", other),
            }),
        },
        _ => Err(ValidationError::InvalidParameters {
            tool: tool.name.clone(),
            reason: "schema must be a JSON object".to_string(),
        }),
    }
}

/// Validate a whole bundle
pub fn validate_bundle(bundle: &PluginBundle) -> Result<(), ValidationError> {
    if bundle.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if bundle.version.trim().is_empty() {
        return Err(ValidationError::MissingVersion(bundle.name.clone()));
    }

    let mut seen = HashSet::new();
    for tool in &bundle.tools {
        validate_tool(tool)?;
        if !seen.insert(tool.name.as_str()) {
            return Err(ValidationError::DuplicateTool(tool.name.clone()));
        }
    }

    if let Some(orphan) = bundle.callbacks.keys().find(|k| !seen.contains(k.as_str())) {
        return Err(ValidationError::OrphanCallback(orphan.clone()));
    }

    Ok(())
}
