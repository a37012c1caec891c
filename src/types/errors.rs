//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the Attache tool engine.
///
/// Propagation policy: only `InvalidActor` and `BatchLimitExceeded` abort an
/// engine entry point before side effects. Every other variant is converted
/// into per-call outcome data so a conversational turn survives individual
/// tool failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or incomplete actor. Raised before any tool is considered.
    #[error("invalid actor: {0}")]
    InvalidActor(String),

    /// Actor lacks the privilege level required by a tool.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A scoped actor resolved to zero accessible regions. Hard denial,
    /// never "no restriction".
    #[error("empty scope: {0}")]
    EmptyScope(String),

    /// The underlying tool function failed. Captured per call.
    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    /// Batch request exceeded the per-round call cap.
    #[error("batch limit exceeded: {0}")]
    BatchLimitExceeded(String),

    /// Audit sink rejected an append.
    #[error("audit write failed: {0}")]
    AuditWrite(String),

    /// Validation errors (tool parameters, config, identifiers).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (unknown tool, unknown record).
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

// Convenience constructors
impl Error {
    pub fn invalid_actor(msg: impl Into<String>) -> Self {
        Self::InvalidActor(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn empty_scope(msg: impl Into<String>) -> Self {
        Self::EmptyScope(msg.into())
    }

    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    pub fn batch_limit(msg: impl Into<String>) -> Self {
        Self::BatchLimitExceeded(msg.into())
    }

    pub fn audit_write(msg: impl Into<String>) -> Self {
        Self::AuditWrite(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
