// Normalized records produced by the extraction dispatcher and the
// estimator report parser. One named type per entity; no positional rows
// survive past the source boundary.

use serde::Serialize;

/// Capability classification for one analysis run of one connection.
///
/// Computed once per run by the classifier and never mutated afterward.
/// Elevated grants instance-wide metadata visibility; Restricted is limited
/// to the authenticated principal's own schema and its explicit grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapabilityTier {
    Elevated,
    Restricted,
}

impl CapabilityTier {
    /// Table-family suffix used by the results store.
    pub fn family(&self) -> &'static str {
        match self {
            CapabilityTier::Elevated => "elevated",
            CapabilityTier::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityTier::Elevated => write!(f, "elevated"),
            CapabilityTier::Restricted => write!(f, "restricted"),
        }
    }
}

// ============================================================================
// Dependency bundle
// ============================================================================

/// Directed reference between objects owned by two distinct schemas.
///
/// Self-references (source owner == target owner) are filtered at the
/// source query and must never appear here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyEdge {
    pub source_owner: String,
    pub source_name: String,
    pub source_type: String,
    pub target_owner: String,
    pub target_name: String,
    pub target_type: String,
    /// Cross-instance link name, when the reference crosses a db link.
    pub link_name: Option<String>,
}

/// Cross-instance database link visible to the analyzed principal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceLink {
    pub owner: String,
    pub link_name: String,
    pub remote_user: Option<String>,
    pub remote_host: Option<String>,
}

/// Object count per (owner, object type).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectTypeCount {
    pub owner: String,
    pub object_type: String,
    pub count: i64,
}

/// Directed permission edge between two distinct principals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossSchemaGrant {
    pub grantor: String,
    pub grantee: String,
    pub object_owner: String,
    pub object_name: String,
    pub privilege: String,
}

/// Alias (synonym) in one owner resolving to an object owned by another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalReference {
    pub alias_owner: String,
    pub alias_name: String,
    pub referenced_owner: String,
    pub referenced_object: String,
    pub link_name: Option<String>,
}

/// Everything the dependency half of the dispatcher produced for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyBundle {
    pub dependencies: Vec<DependencyEdge>,
    pub instance_links: Vec<InstanceLink>,
    pub object_counts: Vec<ObjectTypeCount>,
    pub grants: Vec<CrossSchemaGrant>,
    pub external_refs: Vec<ExternalReference>,
}

impl DependencyBundle {
    pub fn total_rows(&self) -> usize {
        self.dependencies.len()
            + self.instance_links.len()
            + self.object_counts.len()
            + self.grants.len()
            + self.external_refs.len()
    }
}

// ============================================================================
// Size metrics
// ============================================================================

/// Instance- or schema-level aggregate (data files, temp files, or the
/// principal's owned segments on the restricted tier).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSize {
    pub metric: String,
    pub object_name: String,
    pub size_gb: f64,
    pub size_mb: f64,
    pub size_bytes: i64,
    pub file_count: i64,
}

/// Elevated-tier tablespace row: allocated space from the physical data
/// files joined with used space from the segment inventory and free space
/// from the free-extent inventory. Only the elevated query family can
/// produce this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablespaceElevated {
    pub tablespace_name: String,
    pub allocated_gb: f64,
    pub allocated_mb: f64,
    pub allocated_bytes: i64,
    pub used_gb: f64,
    pub used_bytes: i64,
    pub free_gb: f64,
    pub free_bytes: i64,
    pub pct_used: f64,
    pub pct_free: f64,
    pub file_count: i64,
    pub status: String,
}

/// Restricted-tier tablespace row: the principal can only aggregate its
/// own segments per tablespace; allocated and free space are not visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablespaceRestricted {
    pub tablespace_name: String,
    pub used_gb: f64,
    pub used_mb: f64,
    pub used_bytes: i64,
    pub segment_count: i64,
}

/// Tablespace rows for one run. The two shapes are not interchangeable;
/// storage and reporting branch on the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TablespaceSizes {
    Elevated(Vec<TablespaceElevated>),
    Restricted(Vec<TablespaceRestricted>),
}

impl Default for TablespaceSizes {
    fn default() -> Self {
        TablespaceSizes::Restricted(Vec::new())
    }
}

impl TablespaceSizes {
    pub fn len(&self) -> usize {
        match self {
            TablespaceSizes::Elevated(rows) => rows.len(),
            TablespaceSizes::Restricted(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Total owned bytes per schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSize {
    pub owner: String,
    pub size_gb: f64,
    pub size_mb: f64,
    pub size_bytes: i64,
    pub segment_count: i64,
}

/// Per-segment size row, used for tables, indexes and the generic segment
/// granularity. Per-object GB is rounded to 4 decimals, not 2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSize {
    pub owner: String,
    pub segment_name: String,
    pub segment_type: String,
    pub tablespace_name: Option<String>,
    pub size_gb: f64,
    pub size_mb: f64,
    pub size_bytes: i64,
    pub blocks: i64,
    pub extents: i64,
}

/// Aggregated stored-code statistics per (owner, object, type).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeObjectStats {
    pub owner: String,
    pub object_name: String,
    pub object_type: String,
    pub total_lines: i64,
    pub total_chars: i64,
    pub total_bytes: i64,
}

/// Everything the size half of the dispatcher produced for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SizeBundle {
    pub database: Vec<DatabaseSize>,
    pub tablespaces: TablespaceSizes,
    pub schemas: Vec<SchemaSize>,
    pub tables: Vec<SegmentSize>,
    pub indexes: Vec<SegmentSize>,
    pub segments: Vec<SegmentSize>,
    pub code_stats: Vec<CodeObjectStats>,
}

impl SizeBundle {
    pub fn total_rows(&self) -> usize {
        self.database.len()
            + self.tablespaces.len()
            + self.schemas.len()
            + self.tables.len()
            + self.indexes.len()
            + self.segments.len()
            + self.code_stats.len()
    }
}

// ============================================================================
// Migration estimate
// ============================================================================

/// Aggregate result of one estimator run for one connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationEstimate {
    pub total_cost: f64,
    pub migration_level: String,
    /// Object-type counts reported by the textual report, when present.
    pub object_counts: Vec<(String, i64)>,
    /// The scope label the estimate was produced for.
    pub schema_analyzed: String,
}

impl MigrationEstimate {
    /// Estimate used when the estimator failed or produced no report.
    pub fn unknown(schema_analyzed: &str) -> Self {
        MigrationEstimate {
            total_cost: 0.0,
            migration_level: "Unknown".to_string(),
            object_counts: Vec::new(),
            schema_analyzed: schema_analyzed.to_string(),
        }
    }
}

/// Whether a cost entry came straight from a summary-table row or was
/// extracted from a row's details blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CostEntryKind {
    Main,
    Procedure,
}

impl CostEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostEntryKind::Main => "MAIN",
            CostEntryKind::Procedure => "PROCEDURE",
        }
    }
}

/// One row of the estimator's object-level or procedure-level breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEntry {
    pub object_name: String,
    pub object_count: i64,
    pub invalid_count: i64,
    pub estimated_cost: f64,
    pub comments: String,
    pub details: String,
    pub kind: CostEntryKind,
    /// Qualified procedure/function name, Procedure entries only.
    pub procedure_name: Option<String>,
    pub procedure_cost: Option<f64>,
}

/// Qualified name + cost pair scanned out of a details blob.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCostDetail {
    pub name: String,
    pub cost: f64,
}

// ============================================================================
// Derived-size rounding
// ============================================================================

/// Fixed rounding for derived size fields. Aggregates round GB to 2
/// decimals, per-object sizes to 4, MB always to 2; golden-file
/// comparisons depend on these exact values.
pub mod units {
    const KB: f64 = 1024.0;

    fn round_to(value: f64, decimals: u32) -> f64 {
        let factor = 10f64.powi(decimals as i32);
        (value * factor).round() / factor
    }

    /// Aggregate gigabytes, 2 decimals.
    pub fn gb2(bytes: i64) -> f64 {
        round_to(bytes as f64 / (KB * KB * KB), 2)
    }

    /// Per-object gigabytes, 4 decimals.
    pub fn gb4(bytes: i64) -> f64 {
        round_to(bytes as f64 / (KB * KB * KB), 4)
    }

    /// Megabytes, 2 decimals.
    pub fn mb2(bytes: i64) -> f64 {
        round_to(bytes as f64 / (KB * KB), 2)
    }

    /// Percentage with 2 decimals; zero denominator yields 0.0.
    pub fn pct2(part: i64, whole: i64) -> f64 {
        if whole <= 0 {
            return 0.0;
        }
        round_to(part as f64 * 100.0 / whole as f64, 2)
    }

}
