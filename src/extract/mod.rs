//! Privilege-aware extraction dispatcher.
//!
//! Given a tier and a resolved scope, runs the matching query family and
//! normalizes positional rows into the typed bundles of [`crate::model`].
//! Every category is failure-isolated: a failing query logs a warning and
//! contributes an empty result, it never aborts the sibling categories.

pub mod queries;
pub mod sizes;

use tracing::{debug, warn};

use crate::model::{
    CapabilityTier, CrossSchemaGrant, DependencyBundle, DependencyEdge, ExternalReference,
    InstanceLink, ObjectTypeCount,
};
use crate::source::{Params, Row, SourceConnection};

pub use sizes::extract_sizes;

/// Run one category query, degrading to an empty result on failure.
pub(crate) fn run_category(
    conn: &dyn SourceConnection,
    category: &str,
    sql: &str,
    params: Params,
) -> Vec<Row> {
    match conn.query(sql, params) {
        Ok(rows) => {
            debug!(category, rows = rows.len(), "category extracted");
            rows
        }
        Err(err) => {
            warn!(category, %err, "category query failed, continuing with empty result");
            Vec::new()
        }
    }
}

/// Extract the dependency bundle for one run.
pub fn extract_dependencies(
    conn: &dyn SourceConnection,
    tier: CapabilityTier,
    scope: &[String],
) -> DependencyBundle {
    let principal = scope.first().cloned().unwrap_or_default();
    let bind: [(&str, &str); 1] = [("principal", principal.as_str())];

    let (deps, links, counts, grants, refs) = match tier {
        CapabilityTier::Elevated => (
            run_category(conn, "dependencies", &queries::elevated::dependencies(scope), &[]),
            run_category(conn, "instance_links", &queries::elevated::instance_links(), &[]),
            run_category(conn, "object_counts", &queries::elevated::object_counts(scope), &[]),
            run_category(conn, "grants", &queries::elevated::grants(scope), &[]),
            run_category(conn, "external_refs", &queries::elevated::external_refs(scope), &[]),
        ),
        CapabilityTier::Restricted => (
            run_category(conn, "dependencies", &queries::restricted::dependencies(), &bind),
            run_category(conn, "instance_links", &queries::restricted::instance_links(), &bind),
            run_category(conn, "object_counts", &queries::restricted::object_counts(), &bind),
            run_category(conn, "grants", &queries::restricted::grants(), &bind),
            run_category(conn, "external_refs", &queries::restricted::external_refs(), &bind),
        ),
    };

    DependencyBundle {
        dependencies: deps
            .iter()
            .map(|r| DependencyEdge {
                source_owner: r.text(0),
                source_name: r.text(1),
                source_type: r.text(2),
                target_owner: r.text(3),
                target_name: r.text(4),
                target_type: r.text(5),
                link_name: r.opt_text(6),
            })
            .filter(|e| e.source_owner != e.target_owner)
            .collect(),
        instance_links: links
            .iter()
            .map(|r| InstanceLink {
                owner: r.text(0),
                link_name: r.text(1),
                remote_user: r.opt_text(2),
                remote_host: r.opt_text(3),
            })
            .collect(),
        object_counts: counts
            .iter()
            .map(|r| ObjectTypeCount {
                owner: r.text(0),
                object_type: r.text(1),
                count: r.int(2),
            })
            .collect(),
        grants: grants
            .iter()
            .map(|r| CrossSchemaGrant {
                grantor: r.text(0),
                grantee: r.text(1),
                object_owner: r.text(2),
                object_name: r.text(3),
                privilege: r.text(4),
            })
            .collect(),
        external_refs: refs
            .iter()
            .map(|r| ExternalReference {
                alias_owner: r.text(0),
                alias_name: r.text(1),
                referenced_owner: r.text(2),
                referenced_object: r.text(3),
                link_name: r.opt_text(4),
            })
            .collect(),
    }
}
