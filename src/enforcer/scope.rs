//! Scope derivation and argument injection.
//!
//! Pure functions over (actor, level, tool definition). A `None` filter means
//! unrestricted; an empty region set is never a valid filter and raises
//! `EmptyScope` instead of widening the query.

use crate::actor::{AccessLevel, Actor};
use crate::tools::ToolDefinition;
use crate::types::{ConsultantId, Error, RegionId, Result, TenantId};
use serde_json::Value;

/// The set of region/tenant/consultant identifiers an actor is permitted to
/// see. `None` means no restriction on that axis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeFilter {
    pub region_ids: Option<Vec<RegionId>>,
    pub tenant_id: Option<TenantId>,
    pub consultant_id: Option<ConsultantId>,
}

/// Compute the scope filters for an actor at its resolved level.
///
/// The empty-region check is unreachable for a validated actor; it is
/// re-asserted here so a validation regression upstream turns into a hard
/// denial rather than an unrestricted query.
pub fn build_scope(actor: &Actor, level: AccessLevel) -> Result<ScopeFilter> {
    let mut filter = ScopeFilter::default();

    match level {
        AccessLevel::GlobalAdmin => {}
        AccessLevel::RegionalAdmin => {
            let regions = match actor {
                Actor::PlatformUser {
                    assigned_region_ids,
                    ..
                } => assigned_region_ids.clone(),
                _ => Vec::new(),
            };
            if regions.is_empty() {
                return Err(Error::empty_scope(format!(
                    "regional admin {} has no assigned regions",
                    actor.user_id()
                )));
            }
            filter.region_ids = Some(regions);
        }
        AccessLevel::FieldConsultant => {
            let Actor::FieldConsultant {
                consultant_id,
                region_id,
                ..
            } = actor
            else {
                return Err(Error::empty_scope(format!(
                    "consultant level resolved for non-consultant actor {}",
                    actor.user_id()
                )));
            };
            filter.region_ids = Some(vec![region_id.clone()]);
            filter.consultant_id = Some(consultant_id.clone());
        }
        AccessLevel::TenantAdmin | AccessLevel::TenantLimited => {
            let Actor::TenantUser { tenant_id, .. } = actor else {
                return Err(Error::empty_scope(format!(
                    "tenant level resolved for non-tenant actor {}",
                    actor.user_id()
                )));
            };
            filter.tenant_id = Some(tenant_id.clone());
        }
    }

    Ok(filter)
}

/// Merge computed filters into tool arguments.
///
/// Only filters the definition declares are injected; a tool that did not ask
/// for a scope axis must not receive its key, so a handler can never widen a
/// query through an unused filter. The consultant filter rides whichever
/// scope axis the tool declares, since it narrows record visibility rather
/// than adding a new axis.
pub fn inject_scope(args: &mut Value, filter: &ScopeFilter, def: &ToolDefinition) {
    let Some(map) = args.as_object_mut() else {
        return;
    };

    if def.requires_region_scope {
        if let Some(regions) = &filter.region_ids {
            let ids: Vec<Value> = regions
                .iter()
                .map(|r| Value::String(r.as_str().to_string()))
                .collect();
            map.insert("region_ids".to_string(), Value::Array(ids));
        }
    }

    if def.requires_tenant_scope {
        if let Some(tenant) = &filter.tenant_id {
            map.insert(
                "tenant_id".to_string(),
                Value::String(tenant.as_str().to_string()),
            );
        }
    }

    if def.requires_region_scope || def.requires_tenant_scope {
        if let Some(consultant) = &filter.consultant_id {
            map.insert(
                "consultant_id".to_string(),
                Value::String(consultant.as_str().to_string()),
            );
        }
    }
}
