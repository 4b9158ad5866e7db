//! Size-metric extraction and normalization.
//!
//! The tablespace category differs structurally between tiers: the
//! elevated family joins allocated, used and free space into one row per
//! tablespace; the restricted family can only aggregate the principal's
//! own segments. Both shapes stay distinct all the way into the store.

use crate::model::units::{gb2, gb4, mb2, pct2};
use crate::model::{
    CapabilityTier, CodeObjectStats, DatabaseSize, SchemaSize, SegmentSize, SizeBundle,
    TablespaceElevated, TablespaceRestricted, TablespaceSizes,
};
use crate::source::{Row, SourceConnection};

use super::{queries, run_category};

/// Extract the size bundle for one run.
pub fn extract_sizes(
    conn: &dyn SourceConnection,
    tier: CapabilityTier,
    scope: &[String],
) -> SizeBundle {
    let principal = scope.first().cloned().unwrap_or_default();
    let bind: [(&str, &str); 1] = [("principal", principal.as_str())];

    match tier {
        CapabilityTier::Elevated => SizeBundle {
            database: database_rows(run_category(
                conn,
                "database_size",
                &queries::elevated::database_size(),
                &[],
            )),
            tablespaces: TablespaceSizes::Elevated(
                run_category(conn, "tablespace_size", &queries::elevated::tablespace_size(), &[])
                    .iter()
                    .map(elevated_tablespace)
                    .collect(),
            ),
            schemas: schema_rows(run_category(
                conn,
                "schema_size",
                &queries::elevated::schema_size(scope),
                &[],
            )),
            tables: segment_rows(run_category(
                conn,
                "table_size",
                &queries::elevated::table_size(scope),
                &[],
            )),
            indexes: segment_rows(run_category(
                conn,
                "index_size",
                &queries::elevated::index_size(scope),
                &[],
            )),
            segments: segment_rows(run_category(
                conn,
                "segment_size",
                &queries::elevated::segment_size(scope),
                &[],
            )),
            code_stats: code_rows(run_category(
                conn,
                "code_stats",
                &queries::elevated::code_stats(scope),
                &[],
            )),
        },
        CapabilityTier::Restricted => SizeBundle {
            database: database_rows(run_category(
                conn,
                "database_size",
                &queries::restricted::database_size(),
                &bind,
            )),
            tablespaces: TablespaceSizes::Restricted(
                run_category(
                    conn,
                    "tablespace_size",
                    &queries::restricted::tablespace_size(),
                    &bind,
                )
                .iter()
                .map(restricted_tablespace)
                .collect(),
            ),
            schemas: schema_rows(run_category(
                conn,
                "schema_size",
                &queries::restricted::schema_size(),
                &bind,
            )),
            tables: segment_rows(run_category(
                conn,
                "table_size",
                &queries::restricted::table_size(),
                &bind,
            )),
            indexes: segment_rows(run_category(
                conn,
                "index_size",
                &queries::restricted::index_size(),
                &bind,
            )),
            segments: segment_rows(run_category(
                conn,
                "segment_size",
                &queries::restricted::segment_size(),
                &bind,
            )),
            code_stats: code_rows(run_category(
                conn,
                "code_stats",
                &queries::restricted::code_stats(),
                &bind,
            )),
        },
    }
}

// Row layouts match the column order of the queries in `queries`.

fn database_rows(rows: Vec<Row>) -> Vec<DatabaseSize> {
    rows.iter()
        .map(|r| {
            let bytes = r.int(2);
            DatabaseSize {
                metric: r.text(0),
                object_name: r.text(1),
                size_gb: gb2(bytes),
                size_mb: mb2(bytes),
                size_bytes: bytes,
                file_count: r.int(3),
            }
        })
        .collect()
}

fn elevated_tablespace(row: &Row) -> TablespaceElevated {
    let allocated = row.int(1);
    let used = row.int(2);
    let free = row.int(3);
    TablespaceElevated {
        tablespace_name: row.text(0),
        allocated_gb: gb2(allocated),
        allocated_mb: mb2(allocated),
        allocated_bytes: allocated,
        used_gb: gb2(used),
        used_bytes: used,
        free_gb: gb2(free),
        free_bytes: free,
        pct_used: pct2(used, allocated),
        pct_free: pct2(free, allocated),
        file_count: row.int(4),
        status: row.text(5),
    }
}

fn restricted_tablespace(row: &Row) -> TablespaceRestricted {
    let bytes = row.int(1);
    TablespaceRestricted {
        tablespace_name: row.text(0),
        used_gb: gb2(bytes),
        used_mb: mb2(bytes),
        used_bytes: bytes,
        segment_count: row.int(2),
    }
}

fn schema_rows(rows: Vec<Row>) -> Vec<SchemaSize> {
    rows.iter()
        .map(|r| {
            let bytes = r.int(1);
            SchemaSize {
                owner: r.text(0),
                size_gb: gb2(bytes),
                size_mb: mb2(bytes),
                size_bytes: bytes,
                segment_count: r.int(2),
            }
        })
        .collect()
}

fn segment_rows(rows: Vec<Row>) -> Vec<SegmentSize> {
    rows.iter()
        .map(|r| {
            let bytes = r.int(4);
            SegmentSize {
                owner: r.text(0),
                segment_name: r.text(1),
                segment_type: r.text(2),
                tablespace_name: r.opt_text(3),
                // Per-object sizes carry 4 GB decimals, aggregates 2.
                size_gb: gb4(bytes),
                size_mb: mb2(bytes),
                size_bytes: bytes,
                blocks: r.int(5),
                extents: r.int(6),
            }
        })
        .collect()
}

fn code_rows(rows: Vec<Row>) -> Vec<CodeObjectStats> {
    rows.iter()
        .map(|r| CodeObjectStats {
            owner: r.text(0),
            object_name: r.text(1),
            object_type: r.text(2),
            total_lines: r.int(3),
            total_chars: r.int(4),
            total_bytes: r.int(5),
        })
        .collect()
}
