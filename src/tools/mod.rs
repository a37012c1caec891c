//! Tool infrastructure — catalog, parameter validation, built-in tool set.
//!
//! The catalog owns tool metadata and the admission table; handlers delegate
//! to the data-access collaborator. Authorization, scoping, redaction, and
//! audit live in the enforcer, never here.

pub mod builtin;
pub mod catalog;

pub use builtin::{standard_catalog, DataAccess};
pub use catalog::{
    DataSensitivity, ParamDef, ParamType, ToolCatalog, ToolDefinition, ToolHandler,
};
