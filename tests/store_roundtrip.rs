// Results-store persistence across process-like reopen cycles.

use migrascope::config::{CapabilityOverride, ConnectionProfile};
use migrascope::model::{
    CapabilityTier, DependencyBundle, DependencyEdge, MigrationEstimate, SizeBundle,
    TablespaceRestricted, TablespaceSizes,
};
use migrascope::store::ResultsStore;

fn profile(name: &str) -> ConnectionProfile {
    ConnectionProfile {
        name: name.to_string(),
        address: Some("db1.example.com:1521/SVC".to_string()),
        username: "APP".to_string(),
        password: "secret".to_string(),
        description: Some("integration fixture".to_string()),
        target_schema: None,
        elevated: CapabilityOverride::Auto,
        whole_instance: false,
    }
}

fn edges(n: usize) -> DependencyBundle {
    DependencyBundle {
        dependencies: (0..n)
            .map(|i| DependencyEdge {
                source_owner: "APP".to_string(),
                source_name: format!("PKG_{i}"),
                source_type: "PACKAGE".to_string(),
                target_owner: "HR".to_string(),
                target_name: "EMPLOYEES".to_string(),
                target_type: "TABLE".to_string(),
                link_name: None,
            })
            .collect(),
        ..Default::default()
    }
}

fn restricted_sizes() -> SizeBundle {
    SizeBundle {
        tablespaces: TablespaceSizes::Restricted(vec![TablespaceRestricted {
            tablespace_name: "USERS".to_string(),
            used_gb: 3.0,
            used_mb: 3072.0,
            used_bytes: 3_221_225_472,
            segment_count: 7,
        }]),
        ..Default::default()
    }
}

#[test]
fn replace_run_survives_reopen_with_exact_counts() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("inventory.db");
    let scope = vec!["APP".to_string()];

    {
        let mut store = ResultsStore::open(&db_path).unwrap();
        let id = store
            .upsert_connection(&profile("BILLING"), CapabilityTier::Restricted, &scope)
            .unwrap();
        store
            .replace_run(
                id,
                CapabilityTier::Restricted,
                &edges(5),
                Some(&restricted_sizes()),
                &MigrationEstimate::unknown("APP"),
                &[],
            )
            .unwrap();
    }

    // Reopen and re-persist the identical run: counts must not grow.
    let mut store = ResultsStore::open(&db_path).unwrap();
    let id = store
        .upsert_connection(&profile("BILLING"), CapabilityTier::Restricted, &scope)
        .unwrap();
    store
        .replace_run(
            id,
            CapabilityTier::Restricted,
            &edges(5),
            Some(&restricted_sizes()),
            &MigrationEstimate::unknown("APP"),
            &[],
        )
        .unwrap();

    let deps: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM dep_restricted_dependencies", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(deps, 5);

    let tablespaces: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM sizes_restricted_tablespace", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(tablespaces, 1);

    let status = store.status().unwrap();
    assert_eq!(status.connections, 1);
    assert_eq!(status.cost_estimates, 1);
}

#[test]
fn shrinking_runs_remove_stale_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("inventory.db");
    let scope = vec!["APP".to_string()];

    let mut store = ResultsStore::open(&db_path).unwrap();
    let id = store
        .upsert_connection(&profile("BILLING"), CapabilityTier::Restricted, &scope)
        .unwrap();
    let estimate = MigrationEstimate::unknown("APP");

    store
        .replace_run(id, CapabilityTier::Restricted, &edges(8), None, &estimate, &[])
        .unwrap();
    store
        .replace_run(id, CapabilityTier::Restricted, &edges(2), None, &estimate, &[])
        .unwrap();

    let deps: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM dep_restricted_dependencies", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(deps, 2);
}

#[test]
fn tier_switch_leaves_other_family_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("inventory.db");
    let scope = vec!["APP".to_string()];

    let mut store = ResultsStore::open(&db_path).unwrap();
    let id = store
        .upsert_connection(&profile("BILLING"), CapabilityTier::Restricted, &scope)
        .unwrap();
    let estimate = MigrationEstimate::unknown("APP");

    store
        .replace_run(
            id,
            CapabilityTier::Restricted,
            &edges(3),
            Some(&restricted_sizes()),
            &estimate,
            &[],
        )
        .unwrap();

    // The instance was upgraded; the next run classifies elevated.
    store
        .upsert_connection(&profile("BILLING"), CapabilityTier::Elevated, &scope)
        .unwrap();
    store
        .replace_run(id, CapabilityTier::Elevated, &edges(1), None, &estimate, &[])
        .unwrap();

    let restricted: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM dep_restricted_dependencies", [], |r| {
            r.get(0)
        })
        .unwrap();
    let elevated: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM dep_elevated_dependencies", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(restricted, 3);
    assert_eq!(elevated, 1);

    let tier: String = store
        .conn()
        .query_row("SELECT tier FROM connections WHERE id = ?", [id], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(tier, "elevated");
}
