// End-to-end pipeline run over fake sources.

use anyhow::{anyhow, Result};
use migrascope::config::{
    AnalyzerConfig, CapabilityOverride, ConnectionProfile, EstimatorOutputMode, OutputOptions,
};
use migrascope::model::CapabilityTier;
use migrascope::pipeline::{run_analysis, SourceFactory};
use migrascope::source::{Params, Row, SourceConnection, SqlValue};
use migrascope::store::ResultsStore;

/// Restricted-tier source with one cross-schema dependency and one
/// tablespace. Panics if a capability probe reaches it, so explicit
/// overrides are verified to short-circuit classification.
struct RestrictedSource;

impl SourceConnection for RestrictedSource {
    fn current_user(&self) -> Result<String> {
        Ok("APP".to_string())
    }

    fn query(&self, sql: &str, _params: Params) -> Result<Vec<Row>> {
        if sql.contains("session_roles") || sql.contains("dba_users") || sql.contains("session_privs")
        {
            panic!("capability probe executed despite explicit override: {sql}");
        }
        if sql.contains("all_dependencies") {
            return Ok(vec![Row::new(vec![
                SqlValue::Text("APP".into()),
                SqlValue::Text("PKG_BILLING".into()),
                SqlValue::Text("PACKAGE".into()),
                SqlValue::Text("HR".into()),
                SqlValue::Text("EMPLOYEES".into()),
                SqlValue::Text("TABLE".into()),
                SqlValue::Null,
            ])]);
        }
        if sql.contains("all_objects") {
            return Ok(vec![Row::new(vec![
                SqlValue::Text("APP".into()),
                SqlValue::Text("TABLE".into()),
                SqlValue::Int(42),
            ])]);
        }
        if sql.contains("all_db_links") || sql.contains("all_tab_privs") || sql.contains("all_synonyms")
        {
            return Ok(Vec::new());
        }
        if sql.contains("OWNED_SEGMENTS") {
            return Ok(vec![Row::new(vec![
                SqlValue::Text("OWNED_SEGMENTS".into()),
                SqlValue::Text("USER_SCHEMA".into()),
                SqlValue::Int(3_221_225_472),
                SqlValue::Int(12),
            ])]);
        }
        if sql.contains("GROUP BY tablespace_name") {
            return Ok(vec![Row::new(vec![
                SqlValue::Text("USERS".into()),
                SqlValue::Int(3_221_225_472),
                SqlValue::Int(12),
            ])]);
        }
        if sql.contains("GROUP BY USER") {
            return Ok(vec![Row::new(vec![
                SqlValue::Text("APP".into()),
                SqlValue::Int(3_221_225_472),
                SqlValue::Int(12),
            ])]);
        }
        if sql.contains("segment_type IN")
            || sql.contains("%INDEX%")
            || sql.contains("LENGTHB")
            || sql.contains("ORDER BY bytes DESC")
        {
            return Ok(Vec::new());
        }
        Err(anyhow!("unexpected query: {sql}"))
    }
}

struct FakeFactory;

impl SourceFactory for FakeFactory {
    fn connect(
        &self,
        _profile: &ConnectionProfile,
        _address: &str,
    ) -> Result<Box<dyn SourceConnection>> {
        Ok(Box::new(RestrictedSource))
    }
}

fn fleet_config(store_path: &str, output_dir: &str) -> AnalyzerConfig {
    AnalyzerConfig {
        store_path: store_path.to_string(),
        output_dir: Some(output_dir.to_string()),
        analyze_sizes: true,
        estimator_output_mode: EstimatorOutputMode::HtmlOnly,
        profiles: vec![
            ConnectionProfile {
                name: "NOADDR".to_string(),
                address: None,
                username: "APP".to_string(),
                password: "secret".to_string(),
                description: None,
                target_schema: None,
                elevated: CapabilityOverride::Auto,
                whole_instance: false,
            },
            ConnectionProfile {
                name: "APPDB".to_string(),
                address: Some("db1.example.com:1521/APPDB".to_string()),
                username: "APP".to_string(),
                password: "secret".to_string(),
                description: Some("app schema".to_string()),
                target_schema: None,
                elevated: CapabilityOverride::Explicit(false),
                whole_instance: false,
            },
        ],
    }
}

#[test]
fn fleet_run_isolates_failures_and_persists_restricted_family() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("inventory.db");
    let output_dir = dir.path().join("artifacts");

    let config = fleet_config(
        store_path.to_str().unwrap(),
        output_dir.to_str().unwrap(),
    );
    let options = OutputOptions::from_config(&config);

    let summary = run_analysis(&config, &options, &FakeFactory).unwrap();
    assert_eq!(summary.outcomes.len(), 2);

    // The address-less profile fails without aborting its successor.
    let noaddr = &summary.outcomes[0];
    assert_eq!(noaddr.name, "NOADDR");
    assert!(noaddr.error.as_deref().unwrap().contains("missing address"));

    let appdb = &summary.outcomes[1];
    assert_eq!(appdb.name, "APPDB");
    assert!(appdb.succeeded());
    assert_eq!(appdb.tier, Some(CapabilityTier::Restricted));
    assert_eq!(appdb.scope, vec!["APP".to_string()]);
    assert_eq!(appdb.dependency_rows, 2); // 1 edge + 1 object count
    assert!(appdb.size_rows >= 3);

    // Persistence landed in the restricted family only.
    let store = ResultsStore::open(&store_path).unwrap();
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
    assert_eq!(restricted, 1);
    assert_eq!(elevated, 0);

    let tablespace_gb: f64 = store
        .conn()
        .query_row(
            "SELECT used_gb FROM sizes_restricted_tablespace WHERE tablespace_name = 'USERS'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(tablespace_gb, 3.0);

    // Only the successful profile got a connection row.
    let status = store.status().unwrap();
    assert_eq!(status.connections, 1);

    // The run summary artifact exists and names both outcomes.
    let summary_text =
        std::fs::read_to_string(output_dir.join("analysis_summary.txt")).unwrap();
    assert!(summary_text.contains("[fail] NOADDR"));
    assert!(summary_text.contains("[ok]   APPDB"));
}

#[test]
fn disabled_sizes_skip_size_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("inventory.db");
    let output_dir = dir.path().join("artifacts");

    let config = fleet_config(
        store_path.to_str().unwrap(),
        output_dir.to_str().unwrap(),
    );
    let mut options = OutputOptions::from_config(&config);
    options.analyze_sizes = false;

    let summary = run_analysis(&config, &options, &FakeFactory).unwrap();
    let appdb = &summary.outcomes[1];
    assert!(appdb.succeeded());
    assert_eq!(appdb.size_rows, 0);

    let store = ResultsStore::open(&store_path).unwrap();
    let tablespaces: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM sizes_restricted_tablespace", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(tablespaces, 0);
}
