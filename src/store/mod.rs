//! SQLite results store.
//!
//! Connections are upserted by profile name; analysis rows are replaced
//! per run inside a single transaction, touching only the capability
//! family the run was classified into. A connection that moves between
//! tiers keeps its rows in the other family untouched until a run on
//! that tier replaces them.

pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::config::ConnectionProfile;
use crate::model::{
    CapabilityTier, CostEntry, DependencyBundle, MigrationEstimate, SizeBundle, TablespaceSizes,
};

pub use schema::create_schema;

/// Handle on an open results store.
#[derive(Debug)]
pub struct ResultsStore {
    conn: Connection,
}

/// Row counts reported by the `status` command.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStatus {
    pub connections: i64,
    pub elevated_rows: i64,
    pub restricted_rows: i64,
    pub cost_estimates: i64,
    pub cost_entries: i64,
}

impl ResultsStore {
    /// Open (creating if needed) a results store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening results store {}", path.display()))?;
        schema::create_schema(&conn)?;
        Ok(ResultsStore { conn })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory results store")?;
        schema::create_schema(&conn)?;
        Ok(ResultsStore { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert or update the connection row for a profile, keyed by the
    /// profile name. Returns the connection id.
    pub fn upsert_connection(
        &self,
        profile: &ConnectionProfile,
        tier: CapabilityTier,
        scope: &[String],
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let scope_label = scope.join(",");

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM connections WHERE name = ?",
                params![profile.name],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
            .context("looking up connection by name")?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        "UPDATE connections \
                         SET address = ?, username = ?, description = ?, tier = ?, \
                             explicit_scope = ?, analyzed_scope = ?, whole_instance = ?, \
                             updated_at = ? \
                         WHERE id = ?",
                        params![
                            profile.address,
                            profile.username,
                            profile.description,
                            tier.family(),
                            profile.target_schema,
                            scope_label,
                            profile.whole_instance as i64,
                            now,
                            id
                        ],
                    )
                    .context("updating connection")?;
                debug!(name = %profile.name, id, "connection updated");
                Ok(id)
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO connections \
                         (name, address, username, description, tier, explicit_scope, \
                          analyzed_scope, whole_instance, created_at, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        params![
                            profile.name,
                            profile.address,
                            profile.username,
                            profile.description,
                            tier.family(),
                            profile.target_schema,
                            scope_label,
                            profile.whole_instance as i64,
                            now,
                            now
                        ],
                    )
                    .context("inserting connection")?;
                let id = self.conn.last_insert_rowid();
                debug!(name = %profile.name, id, "connection inserted");
                Ok(id)
            }
        }
    }

    /// Replace one connection's analysis rows for one tier.
    ///
    /// Deletes the connection's rows from the run tier's table family
    /// plus the tier-agnostic cost tables, then inserts the new rows,
    /// all inside one transaction. Re-running with identical input
    /// leaves the same row counts.
    pub fn replace_run(
        &mut self,
        connection_id: i64,
        tier: CapabilityTier,
        dependencies: &DependencyBundle,
        sizes: Option<&SizeBundle>,
        estimate: &MigrationEstimate,
        cost_entries: &[CostEntry],
    ) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("beginning replace transaction")?;

        for table in schema::family_tables(tier) {
            tx.execute(
                &format!("DELETE FROM {table} WHERE connection_id = ?"),
                params![connection_id],
            )
            .with_context(|| format!("clearing {table}"))?;
        }
        for table in ["cost_estimates", "cost_entries"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE connection_id = ?"),
                params![connection_id],
            )
            .with_context(|| format!("clearing {table}"))?;
        }

        let f = tier.family();

        for edge in &dependencies.dependencies {
            tx.execute(
                &format!(
                    "INSERT INTO dep_{f}_dependencies \
                     (connection_id, source_owner, source_name, source_type, \
                      target_owner, target_name, target_type, link_name) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    connection_id,
                    edge.source_owner,
                    edge.source_name,
                    edge.source_type,
                    edge.target_owner,
                    edge.target_name,
                    edge.target_type,
                    edge.link_name
                ],
            )
            .context("inserting dependency edge")?;
        }
        for link in &dependencies.instance_links {
            tx.execute(
                &format!(
                    "INSERT INTO dep_{f}_instance_links \
                     (connection_id, owner, link_name, remote_user, remote_host) \
                     VALUES (?, ?, ?, ?, ?)"
                ),
                params![
                    connection_id,
                    link.owner,
                    link.link_name,
                    link.remote_user,
                    link.remote_host
                ],
            )
            .context("inserting instance link")?;
        }
        for count in &dependencies.object_counts {
            tx.execute(
                &format!(
                    "INSERT INTO dep_{f}_object_counts \
                     (connection_id, owner, object_type, object_count) \
                     VALUES (?, ?, ?, ?)"
                ),
                params![connection_id, count.owner, count.object_type, count.count],
            )
            .context("inserting object count")?;
        }
        for grant in &dependencies.grants {
            tx.execute(
                &format!(
                    "INSERT INTO dep_{f}_grants \
                     (connection_id, grantor, grantee, object_owner, object_name, privilege) \
                     VALUES (?, ?, ?, ?, ?, ?)"
                ),
                params![
                    connection_id,
                    grant.grantor,
                    grant.grantee,
                    grant.object_owner,
                    grant.object_name,
                    grant.privilege
                ],
            )
            .context("inserting grant")?;
        }
        for r in &dependencies.external_refs {
            tx.execute(
                &format!(
                    "INSERT INTO dep_{f}_external_refs \
                     (connection_id, alias_owner, alias_name, referenced_owner, \
                      referenced_object, link_name) \
                     VALUES (?, ?, ?, ?, ?, ?)"
                ),
                params![
                    connection_id,
                    r.alias_owner,
                    r.alias_name,
                    r.referenced_owner,
                    r.referenced_object,
                    r.link_name
                ],
            )
            .context("inserting external reference")?;
        }

        if let Some(sizes) = sizes {
            insert_sizes(&tx, connection_id, tier, sizes)?;
        }

        let metrics = serde_json::to_string(&estimate.object_counts)
            .context("serializing estimate metrics")?;
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO cost_estimates \
             (connection_id, schema_analyzed, total_cost, migration_level, metrics, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                connection_id,
                estimate.schema_analyzed,
                estimate.total_cost,
                estimate.migration_level,
                metrics,
                now
            ],
        )
        .context("inserting cost estimate")?;

        for entry in cost_entries {
            tx.execute(
                "INSERT INTO cost_entries \
                 (connection_id, schema_analyzed, object_name, object_count, invalid_count, \
                  estimated_cost, comments, details, entry_kind, procedure_name, procedure_cost) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    connection_id,
                    estimate.schema_analyzed,
                    entry.object_name,
                    entry.object_count,
                    entry.invalid_count,
                    entry.estimated_cost,
                    entry.comments,
                    entry.details,
                    entry.kind.as_str(),
                    entry.procedure_name,
                    entry.procedure_cost
                ],
            )
            .context("inserting cost entry")?;
        }

        tx.commit().context("committing replace transaction")?;
        info!(
            connection_id,
            tier = %tier,
            dependencies = dependencies.total_rows(),
            cost_entries = cost_entries.len(),
            "run persisted"
        );
        Ok(())
    }

    /// Row counts for the `status` command.
    pub fn status(&self) -> Result<StoreStatus> {
        let count = |sql: &str| -> Result<i64> {
            self.conn
                .query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("counting via: {sql}"))
        };

        let family_total = |tier: CapabilityTier| -> Result<i64> {
            let mut total = 0;
            for table in schema::family_tables(tier) {
                total += count(&format!("SELECT COUNT(*) FROM {table}"))?;
            }
            Ok(total)
        };

        Ok(StoreStatus {
            connections: count("SELECT COUNT(*) FROM connections")?,
            elevated_rows: family_total(CapabilityTier::Elevated)?,
            restricted_rows: family_total(CapabilityTier::Restricted)?,
            cost_estimates: count("SELECT COUNT(*) FROM cost_estimates")?,
            cost_entries: count("SELECT COUNT(*) FROM cost_entries")?,
        })
    }
}

fn insert_sizes(
    tx: &rusqlite::Transaction<'_>,
    connection_id: i64,
    tier: CapabilityTier,
    sizes: &SizeBundle,
) -> Result<()> {
    let f = tier.family();

    for row in &sizes.database {
        tx.execute(
            &format!(
                "INSERT INTO sizes_{f}_database \
                 (connection_id, metric, object_name, size_gb, size_mb, size_bytes, file_count) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                connection_id,
                row.metric,
                row.object_name,
                row.size_gb,
                row.size_mb,
                row.size_bytes,
                row.file_count
            ],
        )
        .context("inserting database size")?;
    }

    match &sizes.tablespaces {
        TablespaceSizes::Elevated(rows) => {
            for ts in rows {
                tx.execute(
                    &format!(
                        "INSERT INTO sizes_{f}_tablespace \
                         (connection_id, tablespace_name, allocated_gb, allocated_mb, \
                          allocated_bytes, used_gb, used_bytes, free_gb, free_bytes, \
                          pct_used, pct_free, file_count, status) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                    ),
                    params![
                        connection_id,
                        ts.tablespace_name,
                        ts.allocated_gb,
                        ts.allocated_mb,
                        ts.allocated_bytes,
                        ts.used_gb,
                        ts.used_bytes,
                        ts.free_gb,
                        ts.free_bytes,
                        ts.pct_used,
                        ts.pct_free,
                        ts.file_count,
                        ts.status
                    ],
                )
                .context("inserting elevated tablespace size")?;
            }
        }
        TablespaceSizes::Restricted(rows) => {
            for ts in rows {
                tx.execute(
                    &format!(
                        "INSERT INTO sizes_{f}_tablespace \
                         (connection_id, tablespace_name, used_gb, used_mb, used_bytes, \
                          segment_count) \
                         VALUES (?, ?, ?, ?, ?, ?)"
                    ),
                    params![
                        connection_id,
                        ts.tablespace_name,
                        ts.used_gb,
                        ts.used_mb,
                        ts.used_bytes,
                        ts.segment_count
                    ],
                )
                .context("inserting restricted tablespace size")?;
            }
        }
    }

    for row in &sizes.schemas {
        tx.execute(
            &format!(
                "INSERT INTO sizes_{f}_schema \
                 (connection_id, owner, size_gb, size_mb, size_bytes, segment_count) \
                 VALUES (?, ?, ?, ?, ?, ?)"
            ),
            params![
                connection_id,
                row.owner,
                row.size_gb,
                row.size_mb,
                row.size_bytes,
                row.segment_count
            ],
        )
        .context("inserting schema size")?;
    }

    for (suffix, rows) in [
        ("table", &sizes.tables),
        ("index", &sizes.indexes),
        ("segment", &sizes.segments),
    ] {
        for row in rows {
            tx.execute(
                &format!(
                    "INSERT INTO sizes_{f}_{suffix} \
                     (connection_id, owner, segment_name, segment_type, tablespace_name, \
                      size_gb, size_mb, size_bytes, blocks, extents) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                params![
                    connection_id,
                    row.owner,
                    row.segment_name,
                    row.segment_type,
                    row.tablespace_name,
                    row.size_gb,
                    row.size_mb,
                    row.size_bytes,
                    row.blocks,
                    row.extents
                ],
            )
            .with_context(|| format!("inserting {suffix} size"))?;
        }
    }

    for row in &sizes.code_stats {
        tx.execute(
            &format!(
                "INSERT INTO sizes_{f}_code_stats \
                 (connection_id, owner, object_name, object_type, total_lines, \
                  total_chars, total_bytes) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                connection_id,
                row.owner,
                row.object_name,
                row.object_type,
                row.total_lines,
                row.total_chars,
                row.total_bytes
            ],
        )
        .context("inserting code stats")?;
    }

    Ok(())
}
