//! Tool catalog — typed metadata, parameter validation, prompt generation.
//!
//! Owns tool definitions: name, input schema, admission table, scoping flags,
//! sensitivity classification, and the handler that performs the underlying
//! read/write. Definitions are registered once at process start and are
//! immutable thereafter; the catalog is safe for unsynchronized concurrent
//! reads behind an `Arc`.

use crate::actor::{AccessLevel, Actor};
use crate::types::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    StringList,
    Enum(Vec<String>),
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Int => {
                if value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected integer, got {}", value_type_name(value)))
                }
            }
            ParamType::Float => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("expected number, got {}", value_type_name(value)))
                }
            }
            ParamType::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected boolean, got {}", value_type_name(value)))
                }
            }
            ParamType::StringList => {
                if let Some(arr) = value.as_array() {
                    for (i, item) in arr.iter().enumerate() {
                        if !item.is_string() {
                            return Err(format!(
                                "expected string at index {}, got {}",
                                i,
                                value_type_name(item)
                            ));
                        }
                    }
                    Ok(())
                } else {
                    Err(format!("expected array, got {}", value_type_name(value)))
                }
            }
            ParamType::Enum(variants) => {
                if let Some(s) = value.as_str() {
                    if variants.iter().any(|v| v == s) {
                        Ok(())
                    } else {
                        Err(format!(
                            "invalid enum value '{}', expected one of: {}",
                            s,
                            variants.join(", ")
                        ))
                    }
                } else {
                    Err(format!(
                        "expected string for enum, got {}",
                        value_type_name(value)
                    ))
                }
            }
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }

    /// Human-readable type name for prompt generation.
    pub fn display_name(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Int => "integer".to_string(),
            ParamType::Float => "number".to_string(),
            ParamType::Bool => "boolean".to_string(),
            ParamType::StringList => "string[]".to_string(),
            ParamType::Enum(variants) => format!("enum({})", variants.join("|")),
            ParamType::Optional(inner) => format!("{}?", inner.display_name()),
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Sensitivity
// =============================================================================

/// Data-sensitivity classification of a tool's output.
///
/// Drives redaction and audit behavior: HIGH/CRITICAL results are audited
/// synchronously and may be redacted per actor; LOW/MEDIUM audits are
/// best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSensitivity {
    Low,
    Medium,
    High,
    Critical,
}

impl DataSensitivity {
    /// True when audit entries must be durable before the call reports.
    pub fn requires_synchronous_audit(self) -> bool {
        matches!(self, DataSensitivity::High | DataSensitivity::Critical)
    }
}

// =============================================================================
// Tool handler
// =============================================================================

/// The function that performs a tool's underlying read/write.
///
/// Handlers receive scope-injected arguments and must not perform their own
/// authorization; admission, scoping, redaction, and audit all belong to the
/// enforcer. Data-layer validation ("record not found") is the handler's job.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn run(&self, args: Value, actor: &Actor) -> Result<Value>;
}

// =============================================================================
// Tool definition
// =============================================================================

/// Complete tool definition entry.
#[derive(Clone)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    pub description: String,
    pub params: Vec<ParamDef>,
    /// Privilege tiers allowed to invoke this tool. Admission is membership
    /// in this set, never an ordering comparison.
    pub allowed_levels: Vec<AccessLevel>,
    /// The enforcer must inject the actor's region filter into the arguments.
    pub requires_region_scope: bool,
    /// The enforcer must inject the actor's tenant filter into the arguments.
    pub requires_tenant_scope: bool,
    pub sensitivity: DataSensitivity,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("allowed_levels", &self.allowed_levels)
            .field("requires_region_scope", &self.requires_region_scope)
            .field("requires_tenant_scope", &self.requires_tenant_scope)
            .field("sensitivity", &self.sensitivity)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    /// Generate a prompt line for this tool.
    ///
    /// Format: `- tool_name(param1: type, param2?: type): description`
    pub fn to_prompt_line(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let optional = if p.is_required() { "" } else { "?" };
                format!("{}{}: {}", p.name, optional, p.param_type.display_name())
            })
            .collect();

        format!("- {}({}): {}", self.name, params.join(", "), self.description)
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// In-memory tool catalog keyed by tool name.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: HashMap<String, ToolDefinition>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool definition. Names are unique keys; re-registering an
    /// existing name is rejected rather than silently replacing the entry.
    pub fn register(&mut self, def: ToolDefinition) -> Result<()> {
        if def.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if def.allowed_levels.is_empty() {
            return Err(Error::validation(format!(
                "Tool '{}' must allow at least one access level",
                def.name
            )));
        }
        if self.entries.contains_key(&def.name) {
            return Err(Error::validation(format!(
                "Tool '{}' is already registered",
                def.name
            )));
        }
        self.entries.insert(def.name.clone(), def);
        Ok(())
    }

    /// Get a tool definition by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.entries.get(name)
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// List all tool names.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Catalog entries admissible at the given privilege tier, sorted by name.
    ///
    /// This is the only gate deciding which operations the conversational
    /// loop may even see; tools outside this set are never advertised, not
    /// merely rejected when called.
    pub fn allowed_for(&self, level: AccessLevel) -> Vec<&ToolDefinition> {
        let mut entries: Vec<&ToolDefinition> = self
            .entries
            .values()
            .filter(|def| def.allowed_levels.contains(&level))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Single-tool admission check, re-run at call time as defense in depth.
    pub fn can_use(&self, level: AccessLevel, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|def| def.allowed_levels.contains(&level))
    }

    /// Validate parameters against a tool's parameter definitions.
    ///
    /// Returns a list of validation errors (empty = valid).
    pub fn validate_params(&self, name: &str, params: &Value) -> Result<Vec<String>> {
        let def = self
            .entries
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;

        let param_map = params
            .as_object()
            .ok_or_else(|| Error::validation("Parameters must be a JSON object"))?;

        let mut errors = Vec::new();

        // Check required parameters are present
        for param_def in &def.params {
            if param_def.is_required() && !param_map.contains_key(&param_def.name) {
                errors.push(format!("Missing required parameter: {}", param_def.name));
            }
        }

        // Build param name lookup for checking unknown params
        let known_names: HashMap<&str, &ParamDef> =
            def.params.iter().map(|p| (p.name.as_str(), p)).collect();

        // Validate types of provided parameters
        for (key, value) in param_map {
            if let Some(param_def) = known_names.get(key.as_str()) {
                if let Err(e) = param_def.param_type.validate(value) {
                    errors.push(format!("Parameter '{}': {}", key, e));
                }
            } else {
                errors.push(format!("Unknown parameter: {}", key));
            }
        }

        Ok(errors)
    }

    /// Fill in default values for missing optional parameters.
    pub fn fill_defaults(&self, name: &str, params: &mut Value) -> Result<()> {
        let def = self
            .entries
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;

        if let Some(map) = params.as_object_mut() {
            for param_def in &def.params {
                if !map.contains_key(&param_def.name) {
                    if let Some(default) = &param_def.default {
                        map.insert(param_def.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Generate the tool prompt section for a privilege tier.
    ///
    /// Only admissible tools appear; an actor never sees the name of a tool
    /// it cannot call.
    pub fn generate_prompt(&self, level: AccessLevel) -> String {
        let entries = self.allowed_for(level);
        if entries.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push("Available tools:".to_string());
        for def in entries {
            lines.push(def.to_prompt_line());
        }
        lines.join("\n")
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
