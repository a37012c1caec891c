//! Access level resolution — raw roles to privilege tiers.
//!
//! The resolved [`AccessLevel`] is what admission decisions are made against;
//! an actor's raw role string never reaches the tool layer.

use super::{Actor, PlatformRole, TenantRole};
use crate::types::Result;
use serde::{Deserialize, Serialize};

/// Privilege tier, totally ordered for outranking comparisons.
///
/// The ordering is used only for comparisons between actors (e.g. "does A
/// outrank B"); tool admission is table-driven via each tool's allowed set,
/// never via `>=` on levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    TenantLimited,
    TenantAdmin,
    FieldConsultant,
    RegionalAdmin,
    GlobalAdmin,
}

impl AccessLevel {
    /// True if `self` is a strictly higher privilege tier than `other`.
    pub fn outranks(self, other: AccessLevel) -> bool {
        self > other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TenantLimited => "tenant_limited",
            Self::TenantAdmin => "tenant_admin",
            Self::FieldConsultant => "field_consultant",
            Self::RegionalAdmin => "regional_admin",
            Self::GlobalAdmin => "global_admin",
        }
    }
}

/// Resolve an actor to its privilege tier.
///
/// Validates the actor first; a malformed actor aborts here, before any tool
/// is considered. Unknown tenant roles fail safe toward *less* privilege.
/// Unknown platform roles fall back to RegionalAdmin, preserved from the
/// legacy session system's behavior. This is a latent escalation risk; a
/// conservative implementation would map them to the least privileged tier
/// instead.
pub fn resolve(actor: &Actor) -> Result<AccessLevel> {
    actor.validate()?;

    let level = match actor {
        Actor::TenantUser { role, .. } => match role {
            TenantRole::Admin => AccessLevel::TenantAdmin,
            TenantRole::Member | TenantRole::Limited => AccessLevel::TenantLimited,
            TenantRole::Unknown(raw) => {
                tracing::warn!(
                    role = %raw,
                    user = %actor.user_id(),
                    "unknown tenant role, resolving to tenant_limited"
                );
                AccessLevel::TenantLimited
            }
        },
        Actor::PlatformUser { role, .. } => match role {
            PlatformRole::GlobalAdmin => AccessLevel::GlobalAdmin,
            PlatformRole::RegionalLicensee => AccessLevel::RegionalAdmin,
            PlatformRole::Unknown(raw) => {
                tracing::warn!(
                    role = %raw,
                    user = %actor.user_id(),
                    "unknown platform role, resolving to regional_admin"
                );
                AccessLevel::RegionalAdmin
            }
        },
        Actor::FieldConsultant { .. } => AccessLevel::FieldConsultant,
    };

    Ok(level)
}
