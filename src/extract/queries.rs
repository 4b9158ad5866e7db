//! The two metadata query families.
//!
//! Restricted queries read principal-scoped views and bind `:principal`;
//! elevated queries read instance-wide views and inline the resolved
//! scope set. Size queries return raw byte counts; derived GB/MB fields
//! are computed during normalization so both families round identically.

/// Owners never reported as dependency or grant targets.
const EXCLUDED_TARGETS: &str = "'SYS', 'SYSTEM', 'PUBLIC'";

/// Quote a schema list for an IN clause. Identifiers come from the
/// catalog or from validated configuration; embedded quotes are doubled.
pub fn in_list(schemas: &[String]) -> String {
    schemas
        .iter()
        .map(|s| format!("'{}'", s.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stored-code object types measured by the code statistics category.
const CODE_TYPES: &str = "'PACKAGE', 'PACKAGE BODY', 'PROCEDURE', 'FUNCTION', 'TRIGGER'";

const TABLE_SEGMENTS: &str = "'TABLE', 'TABLE PARTITION', 'TABLE SUBPARTITION'";

// ============================================================================
// Restricted family: principal-scoped catalog views
// ============================================================================

pub mod restricted {
    use super::{CODE_TYPES, EXCLUDED_TARGETS, TABLE_SEGMENTS};

    pub fn dependencies() -> String {
        format!(
            "SELECT d.owner, d.name, d.type, \
                    d.referenced_owner, d.referenced_name, d.referenced_type, \
                    d.referenced_link_name \
             FROM all_dependencies d \
             WHERE (d.owner = :principal OR d.referenced_owner = :principal) \
               AND d.owner <> d.referenced_owner \
               AND d.referenced_owner NOT IN ({EXCLUDED_TARGETS}) \
             ORDER BY d.owner, d.name"
        )
    }

    pub fn instance_links() -> String {
        "SELECT owner, db_link, username, host \
         FROM all_db_links \
         WHERE owner = :principal OR owner = 'PUBLIC' \
         ORDER BY owner, db_link"
            .to_string()
    }

    pub fn object_counts() -> String {
        "SELECT owner, object_type, COUNT(*) \
         FROM all_objects \
         WHERE owner = :principal \
           AND object_type NOT LIKE '%PARTITION%' \
         GROUP BY owner, object_type \
         ORDER BY owner, object_type"
            .to_string()
    }

    pub fn grants() -> String {
        format!(
            "SELECT DISTINCT p.grantor, p.grantee, p.table_schema, p.table_name, p.privilege \
             FROM all_tab_privs p \
             WHERE (p.grantor = :principal OR p.grantee = :principal) \
               AND p.grantee NOT IN ({EXCLUDED_TARGETS}) \
             ORDER BY p.grantee, p.table_schema, p.table_name, p.privilege"
        )
    }

    pub fn external_refs() -> String {
        format!(
            "SELECT DISTINCT s.owner, s.synonym_name, s.table_owner, s.table_name, s.db_link \
             FROM all_synonyms s \
             WHERE s.table_owner = :principal \
               AND s.owner <> :principal \
               AND s.owner NOT IN ({EXCLUDED_TARGETS}) \
             ORDER BY s.owner, s.synonym_name"
        )
    }

    pub fn database_size() -> String {
        "SELECT 'OWNED_SEGMENTS', 'USER_SCHEMA', SUM(bytes), COUNT(*) \
         FROM user_segments"
            .to_string()
    }

    /// Coarse per-tablespace aggregate of the principal's own segments.
    /// Allocated and free space are not visible on this tier.
    pub fn tablespace_size() -> String {
        "SELECT tablespace_name, SUM(bytes), COUNT(*) \
         FROM user_segments \
         GROUP BY tablespace_name \
         ORDER BY tablespace_name"
            .to_string()
    }

    pub fn schema_size() -> String {
        "SELECT USER, SUM(bytes), COUNT(*) \
         FROM user_segments \
         GROUP BY USER"
            .to_string()
    }

    pub fn table_size() -> String {
        format!(
            "SELECT USER, segment_name, segment_type, tablespace_name, bytes, blocks, extents \
             FROM user_segments \
             WHERE segment_type IN ({TABLE_SEGMENTS}) \
             ORDER BY bytes DESC"
        )
    }

    pub fn index_size() -> String {
        "SELECT USER, segment_name, segment_type, tablespace_name, bytes, blocks, extents \
         FROM user_segments \
         WHERE segment_type LIKE '%INDEX%' \
         ORDER BY bytes DESC"
            .to_string()
    }

    pub fn segment_size() -> String {
        "SELECT USER, segment_name, segment_type, tablespace_name, bytes, blocks, extents \
         FROM user_segments \
         ORDER BY bytes DESC"
            .to_string()
    }

    pub fn code_stats() -> String {
        format!(
            "SELECT USER, name, type, COUNT(*), SUM(LENGTH(text)), SUM(LENGTHB(text)) \
             FROM user_source \
             WHERE type IN ({CODE_TYPES}) \
             GROUP BY name, type \
             ORDER BY SUM(LENGTHB(text)) DESC"
        )
    }
}

// ============================================================================
// Elevated family: instance-wide catalog views, scope-filtered
// ============================================================================

pub mod elevated {
    use super::{in_list, CODE_TYPES, EXCLUDED_TARGETS, TABLE_SEGMENTS};

    pub fn dependencies(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT d.owner, d.name, d.type, \
                    d.referenced_owner, d.referenced_name, d.referenced_type, \
                    d.referenced_link_name \
             FROM all_dependencies d \
             WHERE (d.owner IN ({schemas}) OR d.referenced_owner IN ({schemas})) \
               AND d.owner <> d.referenced_owner \
               AND d.referenced_owner NOT IN ({EXCLUDED_TARGETS}) \
             ORDER BY d.owner, d.name"
        )
    }

    pub fn instance_links() -> String {
        "SELECT owner, db_link, username, host \
         FROM dba_db_links \
         ORDER BY owner, db_link"
            .to_string()
    }

    pub fn object_counts(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT owner, object_type, COUNT(*) \
             FROM dba_objects \
             WHERE owner IN ({schemas}) \
               AND object_type NOT LIKE '%PARTITION%' \
             GROUP BY owner, object_type \
             ORDER BY owner, object_type"
        )
    }

    pub fn grants(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT DISTINCT p.grantor, p.grantee, p.table_schema, p.table_name, p.privilege \
             FROM dba_tab_privs p \
             WHERE (p.grantor IN ({schemas}) OR p.grantee IN ({schemas})) \
               AND p.grantee NOT IN ({EXCLUDED_TARGETS}) \
             ORDER BY p.grantee, p.table_schema, p.table_name, p.privilege"
        )
    }

    pub fn external_refs(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT DISTINCT s.owner, s.synonym_name, s.table_owner, s.table_name, s.db_link \
             FROM dba_synonyms s \
             WHERE s.table_owner IN ({schemas}) \
               AND s.owner <> s.table_owner \
               AND s.owner NOT IN ({EXCLUDED_TARGETS}) \
             ORDER BY s.owner, s.synonym_name"
        )
    }

    pub fn database_size() -> String {
        "SELECT 'DATA_FILES', 'TOTAL', SUM(bytes), COUNT(*) FROM dba_data_files \
         UNION ALL \
         SELECT 'TEMP_FILES', 'TEMP', SUM(bytes), COUNT(*) FROM dba_temp_files"
            .to_string()
    }

    /// One row per tablespace joining allocated space (physical data
    /// files), used space (segment inventory) and free space (free-extent
    /// inventory). Percent fields are derived during normalization.
    pub fn tablespace_size() -> String {
        "SELECT df.tablespace_name, df.alloc_bytes, \
                NVL(sg.used_bytes, 0), NVL(fs.free_bytes, 0), \
                df.file_count, df.status \
         FROM (SELECT d.tablespace_name, SUM(d.bytes) alloc_bytes, \
                      COUNT(*) file_count, MAX(t.status) status \
               FROM dba_data_files d \
               JOIN dba_tablespaces t ON t.tablespace_name = d.tablespace_name \
               GROUP BY d.tablespace_name) df \
         LEFT JOIN (SELECT tablespace_name, SUM(bytes) used_bytes \
                    FROM dba_segments GROUP BY tablespace_name) sg \
                ON sg.tablespace_name = df.tablespace_name \
         LEFT JOIN (SELECT tablespace_name, SUM(bytes) free_bytes \
                    FROM dba_free_space GROUP BY tablespace_name) fs \
                ON fs.tablespace_name = df.tablespace_name \
         ORDER BY df.alloc_bytes DESC"
            .to_string()
    }

    pub fn schema_size(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT owner, SUM(bytes), COUNT(*) \
             FROM dba_segments \
             WHERE owner IN ({schemas}) \
             GROUP BY owner \
             ORDER BY SUM(bytes) DESC"
        )
    }

    pub fn table_size(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT owner, segment_name, segment_type, tablespace_name, bytes, blocks, extents \
             FROM dba_segments \
             WHERE owner IN ({schemas}) \
               AND segment_type IN ({TABLE_SEGMENTS}) \
             ORDER BY bytes DESC"
        )
    }

    pub fn index_size(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT owner, segment_name, segment_type, tablespace_name, bytes, blocks, extents \
             FROM dba_segments \
             WHERE owner IN ({schemas}) \
               AND segment_type LIKE '%INDEX%' \
             ORDER BY bytes DESC"
        )
    }

    pub fn segment_size(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT owner, segment_name, segment_type, tablespace_name, bytes, blocks, extents \
             FROM dba_segments \
             WHERE owner IN ({schemas}) \
             ORDER BY bytes DESC"
        )
    }

    pub fn code_stats(scope: &[String]) -> String {
        let schemas = in_list(scope);
        format!(
            "SELECT owner, name, type, COUNT(*), SUM(LENGTH(text)), SUM(LENGTHB(text)) \
             FROM all_source \
             WHERE owner IN ({schemas}) \
               AND type IN ({CODE_TYPES}) \
             GROUP BY owner, name, type \
             ORDER BY SUM(LENGTHB(text)) DESC"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_list_quotes_and_escapes() {
        let scope = vec!["BILLING".to_string(), "O'HARE".to_string()];
        assert_eq!(in_list(&scope), "'BILLING', 'O''HARE'");
    }

    #[test]
    fn test_restricted_family_binds_principal() {
        for sql in [
            restricted::dependencies(),
            restricted::object_counts(),
            restricted::grants(),
            restricted::external_refs(),
        ] {
            assert!(sql.contains(":principal"), "missing bind in: {sql}");
        }
    }

    #[test]
    fn test_elevated_family_inlines_scope() {
        let scope = vec!["A".to_string(), "B".to_string()];
        let sql = elevated::dependencies(&scope);
        assert!(sql.contains("IN ('A', 'B')"));
        assert!(!sql.contains(":principal"));
    }
}
