//! Actor model — typed description of "who is asking".
//!
//! Every inbound request carries exactly one [`Actor`], built once by the
//! upstream session layer and immutable for the duration of a conversational
//! turn. Role strings from the external session system are parsed once at
//! this boundary into closed enums; nothing downstream compares raw strings.

pub mod level;

pub use level::{resolve, AccessLevel};

use crate::types::{ConsultantId, Error, LicenseeId, RegionId, Result, TenantId, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Roles
// =============================================================================

/// Role of a company (tenant) user.
///
/// Unknown role strings are preserved for diagnostics and resolve to the
/// least privileged level, never more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TenantRole {
    Admin,
    Member,
    Limited,
    Unknown(String),
}

impl TenantRole {
    /// Parse a raw role string from the session system.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "admin" => Self::Admin,
            "member" => Self::Member,
            "limited" => Self::Limited,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Limited => "limited",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for TenantRole {
    fn from(s: String) -> Self {
        Self::from_raw(&s)
    }
}

impl From<TenantRole> for String {
    fn from(role: TenantRole) -> Self {
        role.as_str().to_string()
    }
}

/// Role of an internal platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlatformRole {
    GlobalAdmin,
    RegionalLicensee,
    Unknown(String),
}

impl PlatformRole {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "global-admin" => Self::GlobalAdmin,
            "regional-licensee" => Self::RegionalLicensee,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::GlobalAdmin => "global-admin",
            Self::RegionalLicensee => "regional-licensee",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for PlatformRole {
    fn from(s: String) -> Self {
        Self::from_raw(&s)
    }
}

impl From<PlatformRole> for String {
    fn from(role: PlatformRole) -> Self {
        role.as_str().to_string()
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The authenticated party making a request, tagged by which tenant/role
/// system it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// Company staff, bound to a single tenant.
    TenantUser {
        user_id: UserId,
        email: String,
        tenant_id: TenantId,
        role: TenantRole,
    },

    /// Internal platform staff. Regional licensees carry the set of regions
    /// they administer; global admins carry none.
    PlatformUser {
        user_id: UserId,
        email: String,
        role: PlatformRole,
        #[serde(skip_serializing_if = "Option::is_none")]
        licensee_id: Option<LicenseeId>,
        #[serde(default)]
        assigned_region_ids: Vec<RegionId>,
    },

    /// Independent field consultant, bound to one consultant record in one
    /// region.
    FieldConsultant {
        user_id: UserId,
        email: String,
        consultant_id: ConsultantId,
        region_id: RegionId,
    },
}

impl Actor {
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::TenantUser { user_id, .. }
            | Self::PlatformUser { user_id, .. }
            | Self::FieldConsultant { user_id, .. } => user_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Self::TenantUser { email, .. }
            | Self::PlatformUser { email, .. }
            | Self::FieldConsultant { email, .. } => email,
        }
    }

    /// Actor kind label for logs and audit attribution.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TenantUser { .. } => "tenant_user",
            Self::PlatformUser { .. } => "platform_user",
            Self::FieldConsultant { .. } => "field_consultant",
        }
    }

    /// Raw role label for audit attribution.
    pub fn role_label(&self) -> &str {
        match self {
            Self::TenantUser { role, .. } => role.as_str(),
            Self::PlatformUser { role, .. } => role.as_str(),
            Self::FieldConsultant { .. } => "consultant",
        }
    }

    /// Validate the per-variant invariants.
    ///
    /// A regional licensee with zero assigned regions is a data-model error,
    /// rejected here; it must never be treated as "no restriction".
    pub fn validate(&self) -> Result<()> {
        if self.user_id().as_str().is_empty() {
            return Err(Error::invalid_actor("user id cannot be empty"));
        }
        if self.email().is_empty() {
            return Err(Error::invalid_actor("email cannot be empty"));
        }

        match self {
            Self::TenantUser { tenant_id, .. } => {
                if tenant_id.as_str().is_empty() {
                    return Err(Error::invalid_actor("tenant user requires a tenant id"));
                }
            }
            Self::PlatformUser {
                role,
                assigned_region_ids,
                ..
            } => {
                if *role == PlatformRole::RegionalLicensee && assigned_region_ids.is_empty() {
                    return Err(Error::invalid_actor(
                        "regional licensee requires at least one assigned region",
                    ));
                }
                if assigned_region_ids.iter().any(|r| r.as_str().is_empty()) {
                    return Err(Error::invalid_actor("assigned region ids cannot be empty"));
                }
            }
            Self::FieldConsultant {
                consultant_id,
                region_id,
                ..
            } => {
                if consultant_id.as_str().is_empty() {
                    return Err(Error::invalid_actor(
                        "field consultant requires a consultant id",
                    ));
                }
                if region_id.as_str().is_empty() {
                    return Err(Error::invalid_actor("field consultant requires a region id"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant_user(role: &str) -> Actor {
        Actor::TenantUser {
            user_id: UserId::from_string("u-1".into()).unwrap(),
            email: "staff@acme.example".into(),
            tenant_id: TenantId::from_string("t-acme".into()).unwrap(),
            role: TenantRole::from_raw(role),
        }
    }

    #[test]
    fn test_role_parsing_is_closed() {
        assert_eq!(TenantRole::from_raw("admin"), TenantRole::Admin);
        assert_eq!(
            TenantRole::from_raw("superuser"),
            TenantRole::Unknown("superuser".to_string())
        );
        assert_eq!(
            PlatformRole::from_raw("regional-licensee"),
            PlatformRole::RegionalLicensee
        );
        assert_eq!(
            PlatformRole::from_raw("ops"),
            PlatformRole::Unknown("ops".to_string())
        );
    }

    #[test]
    fn test_role_serde_round_trip() {
        let role: TenantRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, TenantRole::Admin);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"admin\"");

        let role: PlatformRole = serde_json::from_str("\"night-shift\"").unwrap();
        assert_eq!(role, PlatformRole::Unknown("night-shift".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"night-shift\"");
    }

    #[test]
    fn test_validate_tenant_user() {
        assert!(tenant_user("admin").validate().is_ok());
    }

    #[test]
    fn test_validate_licensee_without_regions_rejected() {
        let actor = Actor::PlatformUser {
            user_id: UserId::from_string("u-2".into()).unwrap(),
            email: "licensee@platform.example".into(),
            role: PlatformRole::RegionalLicensee,
            licensee_id: Some(LicenseeId::from_string("lic-9".into()).unwrap()),
            assigned_region_ids: vec![],
        };
        let err = actor.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidActor(_)));
    }

    #[test]
    fn test_validate_global_admin_without_regions_ok() {
        let actor = Actor::PlatformUser {
            user_id: UserId::from_string("u-3".into()).unwrap(),
            email: "root@platform.example".into(),
            role: PlatformRole::GlobalAdmin,
            licensee_id: None,
            assigned_region_ids: vec![],
        };
        assert!(actor.validate().is_ok());
    }

    #[test]
    fn test_validate_consultant_requires_both_ids() {
        let actor = Actor::FieldConsultant {
            user_id: UserId::from_string("u-4".into()).unwrap(),
            email: "sam@consultants.example".into(),
            consultant_id: ConsultantId::from_string("c-1".into()).unwrap(),
            region_id: RegionId::from_string("r-1".into()).unwrap(),
        };
        assert!(actor.validate().is_ok());
    }

    #[test]
    fn test_actor_serde_tagged() {
        let actor = tenant_user("member");
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["kind"], "tenant_user");
        assert_eq!(json["role"], "member");

        let back: Actor = serde_json::from_value(json).unwrap();
        assert_eq!(back, actor);
    }
}
