//! Audit trail — append-only entries for sensitive tool executions.
//!
//! Entries are created per call and never mutated. The sink is a black-box
//! append-only store; in-memory implementation provided for embedding and
//! tests.

use crate::actor::Actor;
use crate::tools::DataSensitivity;
use crate::types::{AuditEntryId, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

/// One immutable audit record for a sensitive tool execution.
///
/// Entries for concurrent batch items have no guaranteed relative order in
/// the sink; `created_at` is the reconstruction key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    /// Entity class; always "tool" for engine-produced entries.
    pub entity_type: String,
    /// The tool name.
    pub entity_id: String,
    /// "execute" or "execute_failed".
    pub action: String,
    pub actor_id: String,
    pub actor_email: String,
    pub actor_role: String,
    /// Scope-injected argument snapshot; values masked for CRITICAL tools.
    pub changes: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry for one tool invocation.
    pub fn for_tool_call(
        tool_name: &str,
        sensitivity: DataSensitivity,
        actor: &Actor,
        args: &Value,
        success: bool,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            entity_type: "tool".to_string(),
            entity_id: tool_name.to_string(),
            action: if success { "execute" } else { "execute_failed" }.to_string(),
            actor_id: actor.user_id().as_str().to_string(),
            actor_email: actor.email().to_string(),
            actor_role: actor.role_label().to_string(),
            changes: argument_snapshot(args, sensitivity),
            created_at: Utc::now(),
        }
    }
}

/// Snapshot the arguments for the audit trail.
///
/// CRITICAL tools record only which argument keys were supplied, never the
/// values, so the trail itself cannot leak financial payloads.
fn argument_snapshot(args: &Value, sensitivity: DataSensitivity) -> Value {
    if sensitivity != DataSensitivity::Critical {
        return args.clone();
    }
    match args.as_object() {
        Some(map) => Value::Object(
            map.keys()
                .map(|k| (k.clone(), Value::String("[redacted]".to_string())))
                .collect(),
        ),
        None => Value::String("[redacted]".to_string()),
    }
}

/// Append-only audit store.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<()>;
}

/// In-memory audit sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in append order.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
