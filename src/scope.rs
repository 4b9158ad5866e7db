//! Scope resolution: which schemas one analysis run covers.
//!
//! Explicit configuration always wins; the restricted tier never sees
//! past the authenticated principal; the elevated whole-instance case
//! enumerates user schemas and falls back to the principal when the
//! enumeration fails or comes back empty.

use anyhow::Result;
use tracing::{info, warn};

use crate::config::ConnectionProfile;
use crate::model::CapabilityTier;
use crate::source::SourceConnection;

/// Schemas maintained by the instance itself, never part of a
/// whole-instance scope.
pub const SYSTEM_SCHEMAS: &[&str] = &[
    "SYS",
    "SYSTEM",
    "PUBLIC",
    "OUTLN",
    "DBSNMP",
    "APPQOSSYS",
    "AUDSYS",
    "CTXSYS",
    "DVSYS",
    "DVF",
    "GGSYS",
    "GSMADMIN_INTERNAL",
    "LBACSYS",
    "MDSYS",
    "OJVMSYS",
    "OLAPSYS",
    "ORDDATA",
    "ORDPLUGINS",
    "ORDSYS",
    "REMOTE_SCHEDULER_AGENT",
    "WMSYS",
    "XDB",
    "XS$NULL",
    "ANONYMOUS",
    "DIP",
    "SYSBACKUP",
    "SYSDG",
    "SYSKM",
    "SYSRAC",
    "SYS$UMF",
];

/// Whole-instance schema enumeration: user schemas outside the system
/// set and naming patterns that own at least one user-facing object.
fn enumeration_sql() -> String {
    let excluded = SYSTEM_SCHEMAS
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT u.username \
         FROM all_users u \
         WHERE u.username NOT IN ({excluded}) \
           AND u.username NOT LIKE 'APEX%' \
           AND u.username NOT LIKE 'ORA$%' \
           AND EXISTS (\
               SELECT 1 FROM all_objects o \
               WHERE o.owner = u.username \
                 AND o.object_type IN \
                     ('TABLE', 'VIEW', 'PROCEDURE', 'FUNCTION', 'PACKAGE', 'TRIGGER')) \
         ORDER BY u.username"
    )
}

/// Resolve the ordered schema set for one run.
///
/// The returned list is sorted by name with the authenticated principal
/// first when present, so scope labels and estimator targets are stable
/// across runs.
pub fn resolve_scope(
    conn: &dyn SourceConnection,
    tier: CapabilityTier,
    profile: &ConnectionProfile,
) -> Result<Vec<String>> {
    if let Some(schema) = profile
        .target_schema
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let schema = schema.to_uppercase();
        info!(profile = %profile.name, %schema, "scope pinned by configuration");
        return Ok(vec![schema]);
    }

    let principal = conn.current_user()?;

    if tier == CapabilityTier::Restricted || !profile.whole_instance {
        return Ok(vec![principal]);
    }

    // Elevated, whole-instance requested.
    let schemas = match conn.query(&enumeration_sql(), &[]) {
        Ok(rows) => rows
            .iter()
            .map(|r| r.text(0))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>(),
        Err(err) => {
            warn!(profile = %profile.name, %err, "schema enumeration failed, falling back to principal");
            Vec::new()
        }
    };

    if schemas.is_empty() {
        return Ok(vec![principal]);
    }

    let mut ordered: Vec<String> = schemas;
    ordered.sort();
    ordered.dedup();
    if let Some(pos) = ordered.iter().position(|s| s == &principal) {
        let own = ordered.remove(pos);
        ordered.insert(0, own);
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapabilityOverride;
    use crate::source::{Params, Row, SqlValue};
    use anyhow::anyhow;

    struct EnumSource {
        user: &'static str,
        schemas: Option<Vec<&'static str>>,
    }

    impl SourceConnection for EnumSource {
        fn current_user(&self) -> Result<String> {
            Ok(self.user.to_string())
        }

        fn query(&self, sql: &str, _params: Params) -> Result<Vec<Row>> {
            assert!(sql.contains("FROM all_users"), "unexpected query: {sql}");
            match &self.schemas {
                Some(names) => Ok(names
                    .iter()
                    .map(|n| Row::new(vec![SqlValue::Text(n.to_string())]))
                    .collect()),
                None => Err(anyhow!("simulated enumeration failure")),
            }
        }
    }

    fn profile(target_schema: Option<&str>, whole_instance: bool) -> ConnectionProfile {
        ConnectionProfile {
            name: "T".into(),
            address: Some("h:1521/S".into()),
            username: "APP".into(),
            password: "p".into(),
            description: None,
            target_schema: target_schema.map(String::from),
            elevated: CapabilityOverride::Auto,
            whole_instance,
        }
    }

    #[test]
    fn test_explicit_schema_wins_regardless_of_tier() {
        let conn = EnumSource {
            user: "APP",
            schemas: Some(vec!["OTHER"]),
        };
        for tier in [CapabilityTier::Elevated, CapabilityTier::Restricted] {
            for whole in [true, false] {
                let scope = resolve_scope(&conn, tier, &profile(Some("billing"), whole)).unwrap();
                assert_eq!(scope, vec!["BILLING".to_string()]);
            }
        }
    }

    #[test]
    fn test_restricted_is_principal_only() {
        let conn = EnumSource {
            user: "APP",
            schemas: Some(vec!["A", "B"]),
        };
        let scope =
            resolve_scope(&conn, CapabilityTier::Restricted, &profile(None, true)).unwrap();
        assert_eq!(scope, vec!["APP".to_string()]);
    }

    #[test]
    fn test_elevated_single_schema_is_principal() {
        let conn = EnumSource {
            user: "APP",
            schemas: Some(vec!["A", "B"]),
        };
        let scope =
            resolve_scope(&conn, CapabilityTier::Elevated, &profile(None, false)).unwrap();
        assert_eq!(scope, vec!["APP".to_string()]);
    }

    #[test]
    fn test_whole_instance_orders_principal_first() {
        let conn = EnumSource {
            user: "MID",
            schemas: Some(vec!["ZEBRA", "MID", "ALPHA"]),
        };
        let scope = resolve_scope(&conn, CapabilityTier::Elevated, &profile(None, true)).unwrap();
        assert_eq!(scope, vec!["MID", "ALPHA", "ZEBRA"]);
    }

    #[test]
    fn test_enumeration_failure_falls_back_to_principal() {
        let conn = EnumSource {
            user: "APP",
            schemas: None,
        };
        let scope = resolve_scope(&conn, CapabilityTier::Elevated, &profile(None, true)).unwrap();
        assert_eq!(scope, vec!["APP".to_string()]);
    }

    #[test]
    fn test_empty_enumeration_falls_back_to_principal() {
        let conn = EnumSource {
            user: "APP",
            schemas: Some(vec![]),
        };
        let scope = resolve_scope(&conn, CapabilityTier::Elevated, &profile(None, true)).unwrap();
        assert_eq!(scope, vec!["APP".to_string()]);
    }

    #[test]
    fn test_enumeration_sql_excludes_system_schemas() {
        let sql = enumeration_sql();
        assert!(sql.contains("'SYS'"));
        assert!(sql.contains("NOT LIKE 'APEX%'"));
    }
}
