//! Core types for the Attache tool engine.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (UserId, TenantId, RegionId, etc.)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the engine and observability

mod config;
mod errors;
mod ids;

pub use config::{Config, EngineConfig, ObservabilityConfig};
pub use errors::{Error, Result};
pub use ids::{AuditEntryId, ConsultantId, LicenseeId, RegionId, TenantId, UserId};
