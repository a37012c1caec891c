//! Output redaction — financial field stripping by actor and sensitivity.
//!
//! A typed recursive visitor over the closed set of JSON shapes
//! (object/array/scalar). The protected-field set is defined once as a
//! constant table; redaction is a pure function of (actor, sensitivity, data)
//! and is idempotent.

use crate::actor::{AccessLevel, Actor};
use crate::tools::DataSensitivity;
use serde_json::Value;

/// Financial fields stripped from results the caller is not cleared to see.
pub const PROTECTED_FIELDS: &[&str] = &[
    "amount",
    "amounts",
    "commission",
    "commission_rate",
    "salary",
    "offer_amount",
    "revenue",
    "margin",
    "fee",
    "invoice_total",
    "placement_fee",
];

fn is_protected(key: &str) -> bool {
    PROTECTED_FIELDS.contains(&key)
}

/// Redact a tool result for the given caller.
///
/// - Tenant-level callers lose every protected field at HIGH/CRITICAL
///   sensitivity.
/// - Field consultants at CRITICAL sensitivity lose protected fields only
///   inside records carrying a different consultant's id; their own records
///   pass through untouched.
/// - All other combinations pass through unchanged.
pub fn redact(
    actor: &Actor,
    level: AccessLevel,
    data: Value,
    sensitivity: DataSensitivity,
) -> Value {
    match level {
        AccessLevel::TenantLimited | AccessLevel::TenantAdmin
            if matches!(
                sensitivity,
                DataSensitivity::High | DataSensitivity::Critical
            ) =>
        {
            strip_all(data)
        }
        AccessLevel::FieldConsultant if sensitivity == DataSensitivity::Critical => {
            match actor {
                Actor::FieldConsultant { consultant_id, .. } => {
                    strip_foreign(data, consultant_id.as_str(), false)
                }
                // Consultant level implies a consultant actor; anything else
                // already failed scope derivation.
                _ => data,
            }
        }
        _ => data,
    }
}

/// Remove protected fields everywhere in the value.
fn strip_all(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !is_protected(key))
                .map(|(key, child)| (key, strip_all(child)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_all).collect()),
        scalar => scalar,
    }
}

/// Remove protected fields from records owned by another consultant.
///
/// Ownership is inherited downward: once a sub-object carries a foreign
/// `consultant_id`, everything nested under it is foreign until a closer
/// `consultant_id` says otherwise.
fn strip_foreign(value: Value, own_id: &str, inherited_foreign: bool) -> Value {
    match value {
        Value::Object(map) => {
            let foreign = match map.get("consultant_id").and_then(Value::as_str) {
                Some(id) => id != own_id,
                None => inherited_foreign,
            };
            Value::Object(
                map.into_iter()
                    .filter(|(key, _)| !(foreign && is_protected(key)))
                    .map(|(key, child)| (key, strip_foreign(child, own_id, foreign)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| strip_foreign(item, own_id, inherited_foreign))
                .collect(),
        ),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::TenantRole;
    use crate::types::{ConsultantId, RegionId, TenantId, UserId};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tenant_admin() -> Actor {
        Actor::TenantUser {
            user_id: UserId::from_string("u-1".into()).unwrap(),
            email: "staff@acme.example".into(),
            tenant_id: TenantId::from_string("t-acme".into()).unwrap(),
            role: TenantRole::Admin,
        }
    }

    fn consultant(id: &str) -> Actor {
        Actor::FieldConsultant {
            user_id: UserId::from_string("u-2".into()).unwrap(),
            email: "sam@consultants.example".into(),
            consultant_id: ConsultantId::from_string(id.into()).unwrap(),
            region_id: RegionId::from_string("r-1".into()).unwrap(),
        }
    }

    #[test]
    fn test_tenant_high_strips_everywhere() {
        let data = json!({
            "job": {"title": "Fitter", "salary": 52000},
            "placements": [
                {"candidate": "A", "placement_fee": 4000},
                {"candidate": "B", "nested": {"commission": 900}}
            ]
        });
        let out = redact(
            &tenant_admin(),
            AccessLevel::TenantAdmin,
            data,
            DataSensitivity::High,
        );
        assert_eq!(
            out,
            json!({
                "job": {"title": "Fitter"},
                "placements": [
                    {"candidate": "A"},
                    {"candidate": "B", "nested": {}}
                ]
            })
        );
    }

    #[test]
    fn test_tenant_medium_passes_through() {
        let data = json!({"salary": 52000});
        let out = redact(
            &tenant_admin(),
            AccessLevel::TenantAdmin,
            data.clone(),
            DataSensitivity::Medium,
        );
        assert_eq!(out, data);
    }

    #[test]
    fn test_consultant_keeps_own_strips_foreign() {
        let data = json!([
            {"consultant_id": "c1", "amount": 500},
            {"consultant_id": "c2", "amount": 300}
        ]);
        let out = redact(
            &consultant("c1"),
            AccessLevel::FieldConsultant,
            data,
            DataSensitivity::Critical,
        );
        assert_eq!(
            out,
            json!([
                {"consultant_id": "c1", "amount": 500},
                {"consultant_id": "c2"}
            ])
        );
    }

    #[test]
    fn test_consultant_foreign_ownership_inherited() {
        let data = json!({
            "consultant_id": "c2",
            "placements": [{"fee": 100, "label": "ok"}]
        });
        let out = redact(
            &consultant("c1"),
            AccessLevel::FieldConsultant,
            data,
            DataSensitivity::Critical,
        );
        assert_eq!(
            out,
            json!({
                "consultant_id": "c2",
                "placements": [{"label": "ok"}]
            })
        );
    }

    #[test]
    fn test_consultant_high_passes_through() {
        let data = json!([{"consultant_id": "c2", "amount": 300}]);
        let out = redact(
            &consultant("c1"),
            AccessLevel::FieldConsultant,
            data.clone(),
            DataSensitivity::High,
        );
        assert_eq!(out, data);
    }

    #[test]
    fn test_platform_levels_pass_through() {
        let data = json!({"commission": 900});
        let actor = tenant_admin(); // actor irrelevant for these levels
        for level in [AccessLevel::RegionalAdmin, AccessLevel::GlobalAdmin] {
            assert_eq!(
                redact(&actor, level, data.clone(), DataSensitivity::Critical),
                data
            );
        }
    }

    #[test]
    fn test_non_financial_fields_untouched() {
        let data = json!({"name": "A", "stage": "offered", "notes": ["x"]});
        let out = redact(
            &tenant_admin(),
            AccessLevel::TenantAdmin,
            data.clone(),
            DataSensitivity::Critical,
        );
        assert_eq!(out, data);
    }

    // Property: redaction is idempotent and never touches unprotected keys,
    // for every actor/sensitivity combination.
    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_json() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(Value::from),
                "[a-z]{0,8}".prop_map(Value::String),
            ];
            leaf.prop_recursive(4, 32, 6, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::hash_map(
                        prop_oneof![
                            "[a-z_]{1,10}",
                            Just("amount".to_string()),
                            Just("commission".to_string()),
                            Just("consultant_id".to_string()),
                        ],
                        inner,
                        0..4
                    )
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        fn arb_sensitivity() -> impl Strategy<Value = DataSensitivity> {
            prop_oneof![
                Just(DataSensitivity::Low),
                Just(DataSensitivity::Medium),
                Just(DataSensitivity::High),
                Just(DataSensitivity::Critical),
            ]
        }

        proptest! {
            #[test]
            fn redact_is_idempotent_for_tenant(data in arb_json(), s in arb_sensitivity()) {
                let actor = tenant_admin();
                let once = redact(&actor, AccessLevel::TenantAdmin, data, s);
                let twice = redact(&actor, AccessLevel::TenantAdmin, once.clone(), s);
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn redact_is_idempotent_for_consultant(data in arb_json(), s in arb_sensitivity()) {
                let actor = consultant("c1");
                let once = redact(&actor, AccessLevel::FieldConsultant, data, s);
                let twice = redact(&actor, AccessLevel::FieldConsultant, once.clone(), s);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
