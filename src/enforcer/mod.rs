//! Access control enforcer — admission, scoping, execution, redaction, audit.
//!
//! Every tool invocation walks the same fixed pipeline:
//!
//! ```text
//!   Requested → Admitted | Denied
//!   Admitted  → Scoped → Executed → Redacted → Audited → Done
//!   Denied    → Done
//! ```
//!
//! Every terminal state produces a [`ToolOutcome`]; nothing throws past the
//! engine boundary. Denials are data the conversational loop can explain to
//! the end user, not errors that abort a turn.

pub mod audit;
pub mod redact;
pub mod scope;

pub use audit::{AuditEntry, AuditSink, MemoryAuditSink};
pub use redact::{redact, PROTECTED_FIELDS};
pub use scope::{build_scope, inject_scope, ScopeFilter};

use crate::actor::{AccessLevel, Actor};
use crate::tools::{DataSensitivity, ToolCatalog, ToolDefinition};
use crate::types::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Outcomes
// =============================================================================

/// Why a tool call did not produce data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    AccessDenied,
    EmptyScope,
    InvalidParams,
    Execution,
    Timeout,
    AuditWrite,
}

/// Structured, user-explainable failure attached to an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub reason: String,
}

/// Terminal result of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool_name: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl ToolOutcome {
    fn succeeded(tool_name: &str, data: Value, duration_ms: u64) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            success: true,
            duration_ms,
            data: Some(data),
            error: None,
        }
    }

    fn failed(tool_name: &str, kind: FailureKind, reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            success: false,
            duration_ms,
            data: None,
            error: Some(ToolFailure {
                kind,
                reason: reason.into(),
            }),
        }
    }

    /// Structured denial for tools the actor may not run.
    pub fn denied(tool_name: &str, reason: impl Into<String>) -> Self {
        Self::failed(tool_name, FailureKind::AccessDenied, reason, 0)
    }

    /// Failure for a name the catalog does not know.
    pub fn unknown_tool(tool_name: &str) -> Self {
        Self::failed(
            tool_name,
            FailureKind::UnknownTool,
            format!("Unknown tool: {}", tool_name),
            0,
        )
    }
}

// =============================================================================
// Enforcer
// =============================================================================

/// Drives the admission → scope → execute → redact → audit pipeline.
pub struct AccessEnforcer {
    audit: Arc<dyn AuditSink>,
    call_timeout: Duration,
}

impl fmt::Debug for AccessEnforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessEnforcer")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl AccessEnforcer {
    pub fn new(audit: Arc<dyn AuditSink>, call_timeout: Duration) -> Self {
        Self {
            audit,
            call_timeout,
        }
    }

    /// Execute one admitted-or-denied tool call end to end.
    ///
    /// The actor has already been validated and resolved by the engine entry
    /// point; admission is re-checked here as defense in depth, since the
    /// model can request tool names it was never shown.
    pub async fn execute(
        &self,
        catalog: &ToolCatalog,
        actor: &Actor,
        level: AccessLevel,
        tool_name: &str,
        mut args: Value,
    ) -> ToolOutcome {
        let Some(def) = catalog.get(tool_name) else {
            return ToolOutcome::unknown_tool(tool_name);
        };

        // Admission
        if !def.allowed_levels.contains(&level) {
            tracing::warn!(
                tool = tool_name,
                actor = %actor.user_id(),
                level = level.as_str(),
                "tool call denied"
            );
            return ToolOutcome::denied(
                tool_name,
                format!(
                    "'{}' is not available at access level {}",
                    tool_name,
                    level.as_str()
                ),
            );
        }

        // Input schema
        let param_errors = match catalog.validate_params(tool_name, &args) {
            Ok(errors) => errors,
            Err(e) => {
                return ToolOutcome::failed(tool_name, FailureKind::InvalidParams, e.to_string(), 0)
            }
        };
        if !param_errors.is_empty() {
            return ToolOutcome::failed(
                tool_name,
                FailureKind::InvalidParams,
                param_errors.join("; "),
                0,
            );
        }
        if let Err(e) = catalog.fill_defaults(tool_name, &mut args) {
            return ToolOutcome::failed(tool_name, FailureKind::InvalidParams, e.to_string(), 0);
        }

        // Scope injection
        let filter = match build_scope(actor, level) {
            Ok(filter) => filter,
            Err(Error::EmptyScope(reason)) => {
                tracing::warn!(tool = tool_name, actor = %actor.user_id(), %reason, "empty scope");
                return ToolOutcome::failed(tool_name, FailureKind::EmptyScope, reason, 0);
            }
            Err(e) => {
                return ToolOutcome::failed(tool_name, FailureKind::Execution, e.to_string(), 0)
            }
        };
        inject_scope(&mut args, &filter, def);

        // Execution
        let started = Instant::now();
        let run = tokio::time::timeout(self.call_timeout, def.handler.run(args.clone(), actor));
        let outcome = match run.await {
            Ok(Ok(data)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let data = redact(actor, level, data, def.sensitivity);
                ToolOutcome::succeeded(tool_name, data, duration_ms)
            }
            Ok(Err(err)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(tool = tool_name, error = %err, "tool execution failed");
                ToolOutcome::failed(
                    tool_name,
                    FailureKind::Execution,
                    execution_reason(def, &err),
                    duration_ms,
                )
            }
            Err(_elapsed) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(tool = tool_name, timeout = ?self.call_timeout, "tool call timed out");
                ToolOutcome::failed(
                    tool_name,
                    FailureKind::Timeout,
                    format!("'{}' exceeded the call timeout", tool_name),
                    duration_ms,
                )
            }
        };

        // Audit
        self.audit_call(def, actor, &args, outcome).await
    }

    /// Persist the audit record per the tool's sensitivity.
    ///
    /// CRITICAL: synchronous, and a failed append fails the call; the
    /// engine never reports success without a durable trail. HIGH:
    /// synchronous, logged on failure. LOW/MEDIUM: detached, failures
    /// swallowed off the response path.
    async fn audit_call(
        &self,
        def: &ToolDefinition,
        actor: &Actor,
        args: &Value,
        outcome: ToolOutcome,
    ) -> ToolOutcome {
        let entry =
            AuditEntry::for_tool_call(&def.name, def.sensitivity, actor, args, outcome.success);

        match def.sensitivity {
            DataSensitivity::Critical => {
                if let Err(err) = self.audit.append(entry).await {
                    tracing::error!(tool = %def.name, error = %err, "critical audit write failed");
                    return ToolOutcome::failed(
                        &def.name,
                        FailureKind::AuditWrite,
                        "audit trail unavailable",
                        outcome.duration_ms,
                    );
                }
                outcome
            }
            DataSensitivity::High => {
                if let Err(err) = self.audit.append(entry).await {
                    tracing::warn!(tool = %def.name, error = %err, "audit write failed");
                }
                outcome
            }
            DataSensitivity::Low | DataSensitivity::Medium => {
                let sink = Arc::clone(&self.audit);
                tokio::spawn(async move {
                    if let Err(err) = sink.append(entry).await {
                        tracing::debug!(error = %err, "best-effort audit write failed");
                    }
                });
                outcome
            }
        }
    }
}

/// User-facing reason for an execution failure.
///
/// CRITICAL tools never surface raw handler errors through the chat surface;
/// callers get a generic reason while the detail stays in the logs.
fn execution_reason(def: &ToolDefinition, err: &Error) -> String {
    if def.sensitivity == DataSensitivity::Critical {
        format!("'{}' failed", def.name)
    } else {
        err.to_string()
    }
}
