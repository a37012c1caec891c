//! Built-in operational tool set.
//!
//! The fixed catalog the assistant serves: job/candidate/placement reads and
//! the two write operations, all delegating to the [`DataAccess`] collaborator.
//! Repositories behind that trait are conventional CRUD plumbing and stay out
//! of this crate; tools reach them only through scope-injected arguments.

use super::catalog::{
    DataSensitivity, ParamDef, ParamType, ToolCatalog, ToolDefinition, ToolHandler,
};
use crate::actor::{AccessLevel, Actor};
use crate::types::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Black-box data store façade.
///
/// Every method receives arguments that already carry the caller's scope
/// filters (`region_ids`, `tenant_id`, `consultant_id` keys where the tool
/// declares them). Implementations apply those filters to their queries and
/// may fail with data-layer errors; they never authorize.
#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn search_jobs(&self, args: &Value) -> Result<Value>;
    async fn get_job(&self, args: &Value) -> Result<Value>;
    async fn search_candidates(&self, args: &Value) -> Result<Value>;
    async fn list_assigned_candidates(&self, args: &Value) -> Result<Value>;
    async fn placement_financials(&self, args: &Value) -> Result<Value>;
    async fn company_invoices(&self, args: &Value) -> Result<Value>;
    async fn update_candidate_stage(&self, args: &Value) -> Result<Value>;
    async fn assign_consultant(&self, args: &Value) -> Result<Value>;
}

/// Which `DataAccess` method a built-in tool dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataOp {
    SearchJobs,
    GetJob,
    SearchCandidates,
    ListAssignedCandidates,
    PlacementFinancials,
    CompanyInvoices,
    UpdateCandidateStage,
    AssignConsultant,
}

/// Handler adapter from a tool definition to one `DataAccess` method.
struct DataTool {
    data: Arc<dyn DataAccess>,
    op: DataOp,
}

impl fmt::Debug for DataTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTool").field("op", &self.op).finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolHandler for DataTool {
    async fn run(&self, args: Value, _actor: &Actor) -> Result<Value> {
        match self.op {
            DataOp::SearchJobs => self.data.search_jobs(&args).await,
            DataOp::GetJob => self.data.get_job(&args).await,
            DataOp::SearchCandidates => self.data.search_candidates(&args).await,
            DataOp::ListAssignedCandidates => self.data.list_assigned_candidates(&args).await,
            DataOp::PlacementFinancials => self.data.placement_financials(&args).await,
            DataOp::CompanyInvoices => self.data.company_invoices(&args).await,
            DataOp::UpdateCandidateStage => self.data.update_candidate_stage(&args).await,
            DataOp::AssignConsultant => self.data.assign_consultant(&args).await,
        }
    }
}

fn required(name: &str, param_type: ParamType, description: &str) -> ParamDef {
    ParamDef {
        name: name.to_string(),
        param_type,
        description: description.to_string(),
        default: None,
    }
}

fn optional(name: &str, inner: ParamType, description: &str, default: Option<Value>) -> ParamDef {
    ParamDef {
        name: name.to_string(),
        param_type: ParamType::Optional(Box::new(inner)),
        description: description.to_string(),
        default,
    }
}

/// Build the standard catalog over a data store.
///
/// Registration happens once at startup; callers wrap the result in an `Arc`
/// and share it read-only.
pub fn standard_catalog(data: Arc<dyn DataAccess>) -> Result<ToolCatalog> {
    use AccessLevel::*;

    let mut catalog = ToolCatalog::new();
    let tool = |op: DataOp| -> Arc<dyn ToolHandler> {
        Arc::new(DataTool {
            data: Arc::clone(&data),
            op,
        })
    };

    catalog.register(ToolDefinition {
        name: "search_jobs".to_string(),
        description: "Search open jobs by keyword and status".to_string(),
        params: vec![
            required("query", ParamType::String, "Search query"),
            optional(
                "status",
                ParamType::Enum(vec!["open".into(), "on_hold".into(), "filled".into()]),
                "Job status filter",
                None,
            ),
            optional("limit", ParamType::Int, "Maximum results", Some(Value::from(20))),
        ],
        allowed_levels: vec![
            TenantLimited,
            TenantAdmin,
            FieldConsultant,
            RegionalAdmin,
            GlobalAdmin,
        ],
        requires_region_scope: true,
        requires_tenant_scope: true,
        sensitivity: DataSensitivity::Medium,
        handler: tool(DataOp::SearchJobs),
    })?;

    catalog.register(ToolDefinition {
        name: "get_job".to_string(),
        description: "Fetch a single job by id".to_string(),
        params: vec![required("job_id", ParamType::String, "Job identifier")],
        allowed_levels: vec![
            TenantLimited,
            TenantAdmin,
            FieldConsultant,
            RegionalAdmin,
            GlobalAdmin,
        ],
        requires_region_scope: true,
        requires_tenant_scope: true,
        sensitivity: DataSensitivity::Low,
        handler: tool(DataOp::GetJob),
    })?;

    catalog.register(ToolDefinition {
        name: "search_candidates".to_string(),
        description: "Search candidates by skill or name".to_string(),
        params: vec![
            required("query", ParamType::String, "Search query"),
            optional("limit", ParamType::Int, "Maximum results", Some(Value::from(20))),
        ],
        allowed_levels: vec![TenantAdmin, FieldConsultant, RegionalAdmin, GlobalAdmin],
        requires_region_scope: true,
        requires_tenant_scope: true,
        sensitivity: DataSensitivity::Medium,
        handler: tool(DataOp::SearchCandidates),
    })?;

    catalog.register(ToolDefinition {
        name: "list_my_candidates".to_string(),
        description: "List candidates assigned to the calling consultant".to_string(),
        params: vec![optional(
            "stage",
            ParamType::Enum(vec![
                "sourced".into(),
                "interviewing".into(),
                "offered".into(),
                "placed".into(),
            ]),
            "Pipeline stage filter",
            None,
        )],
        allowed_levels: vec![FieldConsultant],
        requires_region_scope: true,
        requires_tenant_scope: false,
        sensitivity: DataSensitivity::Medium,
        handler: tool(DataOp::ListAssignedCandidates),
    })?;

    catalog.register(ToolDefinition {
        name: "get_placement_financials".to_string(),
        description: "Placement fee and commission breakdown for a job".to_string(),
        params: vec![required("job_id", ParamType::String, "Job identifier")],
        allowed_levels: vec![TenantAdmin, FieldConsultant, RegionalAdmin, GlobalAdmin],
        requires_region_scope: true,
        requires_tenant_scope: true,
        sensitivity: DataSensitivity::Critical,
        handler: tool(DataOp::PlacementFinancials),
    })?;

    catalog.register(ToolDefinition {
        name: "list_company_invoices".to_string(),
        description: "List invoices issued to the company".to_string(),
        params: vec![optional(
            "since",
            ParamType::String,
            "ISO date lower bound",
            None,
        )],
        allowed_levels: vec![TenantAdmin, GlobalAdmin],
        requires_region_scope: false,
        requires_tenant_scope: true,
        sensitivity: DataSensitivity::High,
        handler: tool(DataOp::CompanyInvoices),
    })?;

    catalog.register(ToolDefinition {
        name: "update_candidate_stage".to_string(),
        description: "Move a candidate to a new pipeline stage".to_string(),
        params: vec![
            required("candidate_id", ParamType::String, "Candidate identifier"),
            required(
                "stage",
                ParamType::Enum(vec![
                    "sourced".into(),
                    "interviewing".into(),
                    "offered".into(),
                    "placed".into(),
                    "rejected".into(),
                ]),
                "Target stage",
            ),
        ],
        allowed_levels: vec![TenantAdmin, RegionalAdmin, GlobalAdmin],
        requires_region_scope: false,
        requires_tenant_scope: true,
        sensitivity: DataSensitivity::High,
        handler: tool(DataOp::UpdateCandidateStage),
    })?;

    catalog.register(ToolDefinition {
        name: "assign_consultant".to_string(),
        description: "Assign a field consultant to a job".to_string(),
        params: vec![
            required("job_id", ParamType::String, "Job identifier"),
            required("consultant_id", ParamType::String, "Consultant identifier"),
        ],
        allowed_levels: vec![RegionalAdmin, GlobalAdmin],
        requires_region_scope: true,
        requires_tenant_scope: false,
        sensitivity: DataSensitivity::Critical,
        handler: tool(DataOp::AssignConsultant),
    })?;

    Ok(catalog)
}
