//! Results-store schema.
//!
//! Dependency and size tables are partitioned by capability family:
//! every table exists once per family with a `dep_<family>_` or
//! `sizes_<family>_` prefix, and the elevated tablespace table carries
//! strictly more columns than its restricted sibling. Cost tables are
//! tier-agnostic. All data tables hang off `connections` with cascading
//! deletes.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::model::CapabilityTier;

/// Dependency-table suffixes, one table per family for each.
pub const DEP_TABLES: [&str; 5] = [
    "dependencies",
    "instance_links",
    "object_counts",
    "grants",
    "external_refs",
];

/// Size-table suffixes, one table per family for each.
pub const SIZE_TABLES: [&str; 7] = [
    "database",
    "tablespace",
    "schema",
    "table",
    "index",
    "segment",
    "code_stats",
];

/// All per-family data tables for one tier, in creation order.
pub fn family_tables(tier: CapabilityTier) -> Vec<String> {
    let family = tier.family();
    DEP_TABLES
        .iter()
        .map(|t| format!("dep_{family}_{t}"))
        .chain(SIZE_TABLES.iter().map(|t| format!("sizes_{family}_{t}")))
        .collect()
}

const SEGMENT_COLUMNS: &str = "owner TEXT NOT NULL,
    segment_name TEXT NOT NULL,
    segment_type TEXT NOT NULL,
    tablespace_name TEXT,
    size_gb REAL NOT NULL,
    size_mb REAL NOT NULL,
    size_bytes INTEGER NOT NULL,
    blocks INTEGER NOT NULL,
    extents INTEGER NOT NULL";

/// DDL for one family's dependency and size tables.
fn family_ddl(tier: CapabilityTier) -> Vec<String> {
    let f = tier.family();
    let mut ddl = vec![
        format!(
            "CREATE TABLE IF NOT EXISTS dep_{f}_dependencies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                source_owner TEXT NOT NULL,
                source_name TEXT NOT NULL,
                source_type TEXT NOT NULL,
                target_owner TEXT NOT NULL,
                target_name TEXT NOT NULL,
                target_type TEXT NOT NULL,
                link_name TEXT
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS dep_{f}_instance_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                owner TEXT NOT NULL,
                link_name TEXT NOT NULL,
                remote_user TEXT,
                remote_host TEXT
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS dep_{f}_object_counts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                owner TEXT NOT NULL,
                object_type TEXT NOT NULL,
                object_count INTEGER NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS dep_{f}_grants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                grantor TEXT NOT NULL,
                grantee TEXT NOT NULL,
                object_owner TEXT NOT NULL,
                object_name TEXT NOT NULL,
                privilege TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS dep_{f}_external_refs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                alias_owner TEXT NOT NULL,
                alias_name TEXT NOT NULL,
                referenced_owner TEXT NOT NULL,
                referenced_object TEXT NOT NULL,
                link_name TEXT
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS sizes_{f}_database (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                metric TEXT NOT NULL,
                object_name TEXT NOT NULL,
                size_gb REAL NOT NULL,
                size_mb REAL NOT NULL,
                size_bytes INTEGER NOT NULL,
                file_count INTEGER NOT NULL
            )"
        ),
    ];

    // The tablespace shapes are deliberately different per family.
    ddl.push(match tier {
        CapabilityTier::Elevated => format!(
            "CREATE TABLE IF NOT EXISTS sizes_{f}_tablespace (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                tablespace_name TEXT NOT NULL,
                allocated_gb REAL NOT NULL,
                allocated_mb REAL NOT NULL,
                allocated_bytes INTEGER NOT NULL,
                used_gb REAL NOT NULL,
                used_bytes INTEGER NOT NULL,
                free_gb REAL NOT NULL,
                free_bytes INTEGER NOT NULL,
                pct_used REAL NOT NULL,
                pct_free REAL NOT NULL,
                file_count INTEGER NOT NULL,
                status TEXT NOT NULL
            )"
        ),
        CapabilityTier::Restricted => format!(
            "CREATE TABLE IF NOT EXISTS sizes_{f}_tablespace (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                tablespace_name TEXT NOT NULL,
                used_gb REAL NOT NULL,
                used_mb REAL NOT NULL,
                used_bytes INTEGER NOT NULL,
                segment_count INTEGER NOT NULL
            )"
        ),
    });

    ddl.push(format!(
        "CREATE TABLE IF NOT EXISTS sizes_{f}_schema (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
            owner TEXT NOT NULL,
            size_gb REAL NOT NULL,
            size_mb REAL NOT NULL,
            size_bytes INTEGER NOT NULL,
            segment_count INTEGER NOT NULL
        )"
    ));
    for suffix in ["table", "index", "segment"] {
        ddl.push(format!(
            "CREATE TABLE IF NOT EXISTS sizes_{f}_{suffix} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
                {SEGMENT_COLUMNS}
            )"
        ));
    }
    ddl.push(format!(
        "CREATE TABLE IF NOT EXISTS sizes_{f}_code_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
            owner TEXT NOT NULL,
            object_name TEXT NOT NULL,
            object_type TEXT NOT NULL,
            total_lines INTEGER NOT NULL,
            total_chars INTEGER NOT NULL,
            total_bytes INTEGER NOT NULL
        )"
    ));

    ddl
}

/// Create all results-store tables and indexes.
///
/// Idempotent; safe to call on an already-initialized store.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("enabling foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS connections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            address TEXT,
            username TEXT NOT NULL,
            description TEXT,
            tier TEXT NOT NULL,
            explicit_scope TEXT,
            analyzed_scope TEXT NOT NULL,
            whole_instance INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .context("creating connections table")?;

    for tier in [CapabilityTier::Elevated, CapabilityTier::Restricted] {
        for ddl in family_ddl(tier) {
            conn.execute(&ddl, [])
                .with_context(|| format!("creating table: {}", first_line(&ddl)))?;
        }
        for table in family_tables(tier) {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_connection \
                     ON {table}(connection_id)"
                ),
                [],
            )
            .with_context(|| format!("indexing {table}"))?;
        }
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cost_estimates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
            schema_analyzed TEXT NOT NULL,
            total_cost REAL NOT NULL,
            migration_level TEXT NOT NULL,
            metrics TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("creating cost_estimates table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cost_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_id INTEGER NOT NULL REFERENCES connections(id) ON DELETE CASCADE,
            schema_analyzed TEXT NOT NULL,
            object_name TEXT NOT NULL,
            object_count INTEGER NOT NULL,
            invalid_count INTEGER NOT NULL,
            estimated_cost REAL NOT NULL,
            comments TEXT NOT NULL,
            details TEXT NOT NULL,
            entry_kind TEXT NOT NULL,
            procedure_name TEXT,
            procedure_cost REAL
        )",
        [],
    )
    .context("creating cost_entries table")?;

    for table in ["cost_estimates", "cost_entries"] {
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_connection \
                 ON {table}(connection_id)"
            ),
            [],
        )
        .with_context(|| format!("indexing {table}"))?;
    }

    Ok(())
}

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or(sql).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        create_schema(&conn).unwrap();
    }

    #[test]
    fn test_both_families_exist() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type = 'table' AND (name LIKE 'dep_%' OR name LIKE 'sizes_%')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        // 5 dependency + 7 size tables per family
        assert_eq!(count, 24);
    }

    #[test]
    fn test_tablespace_shapes_differ() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        let cols = |table: &str| -> i64 {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM pragma_table_info('{table}')"),
                [],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert!(cols("sizes_elevated_tablespace") > cols("sizes_restricted_tablespace"));
    }
}
