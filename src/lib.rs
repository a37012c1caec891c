//! # Attache Core - Capability-Scoped Tool Execution Engine
//!
//! Mediates between a conversational model and a multi-tenant operational
//! data store:
//! - Typed actor model with closed role parsing at the boundary
//! - Table-driven tool admission per resolved access level
//! - Automatic tenant/region/consultant scope injection
//! - Financial-field redaction by sensitivity classification
//! - Append-only audit trail for sensitive operations
//! - Single, batched (concurrent), and turn-based execution with streaming
//!
//! ## Architecture
//!
//! ```text
//!   caller turn → ExecutionEngine
//!                    │  admissible tools only
//!                    ▼
//!               ModelProvider ──── tool-call requests ───┐
//!                    ▲                                   ▼
//!                    │                            AccessEnforcer
//!                    │                       admission → scope →
//!               tool results ◄── redact ◄── execute ◄── inject
//!                                   │
//!                                audit sink (append-only)
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod actor;
pub mod enforcer;
pub mod engine;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use actor::{resolve, AccessLevel, Actor};
pub use engine::{BatchOutcome, ExecutionEngine, TurnEvent, TurnResult};
pub use types::{Config, EngineConfig, Error, Result};
