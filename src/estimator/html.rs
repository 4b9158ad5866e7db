//! HTML report parsing: the object summary table and its nested
//! procedure-level details.
//!
//! The report is machine-generated and regular, so extraction works on
//! tag patterns directly. The first table whose first two header cells
//! name the object identity and object count is the summary table; any
//! later candidates are ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{CostEntry, CostEntryKind, ProcedureCostDetail};

static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b[^>]*>.*?</table>").unwrap());
static TR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>.*?</tr>").unwrap());
static TH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<th\b[^>]*>(.*?)</th>").unwrap());
static TD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Qualified identifier followed by a colon-separated numeric cost.
/// Calibrated against the estimator's detail blobs; preserve as-is.
static DETAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z_][a-zA-Z0-9_.]*)\s*:\s*(\d+(?:\.\d+)?)").unwrap());

/// Strip tags, decode the entities the report emits, collapse whitespace
/// at the edges.
fn cell_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

fn safe_int(text: &str) -> i64 {
    text.trim().parse().unwrap_or(0)
}

fn safe_float(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

/// Render a cost with at least one decimal (`3` prints as `3.0`), so
/// regenerated detail strings match the report files byte for byte.
fn fmt_cost(cost: f64) -> String {
    if cost.fract() == 0.0 {
        format!("{cost:.1}")
    } else {
        cost.to_string()
    }
}

/// Scan a details blob for per-procedure costs.
///
/// Malformed numeric tokens are skipped individually; the rest of the
/// match set survives.
pub fn parse_procedure_details(details: &str) -> Vec<ProcedureCostDetail> {
    DETAIL_RE
        .captures_iter(details)
        .filter_map(|caps| {
            let cost: f64 = caps[2].parse().ok()?;
            Some(ProcedureCostDetail {
                name: caps[1].to_string(),
                cost,
            })
        })
        .collect()
}

fn is_summary_table(headers: &[String]) -> bool {
    headers.len() >= 6
        && headers[0].to_lowercase().contains("object")
        && headers[1].to_lowercase().contains("number")
}

/// Parse the object summary table out of the HTML report.
///
/// Each qualifying body row yields one MAIN entry; a details blob that is
/// non-empty and not the placeholder dash additionally yields one
/// PROCEDURE entry per extracted detail.
pub fn parse_object_summary(html: &str) -> Vec<CostEntry> {
    let mut entries = Vec::new();

    for table in TABLE_RE.find_iter(html) {
        let table = table.as_str();
        let headers: Vec<String> = TH_RE
            .captures_iter(table)
            .map(|caps| cell_text(&caps[1]))
            .collect();
        if !is_summary_table(&headers) {
            continue;
        }

        for row in TR_RE.find_iter(table).skip(1) {
            let cells: Vec<String> = TD_RE
                .captures_iter(row.as_str())
                .map(|caps| cell_text(&caps[1]))
                .collect();
            if cells.len() < 6 {
                continue;
            }

            let object_name = cells[0].clone();
            let details = cells[5].clone();
            entries.push(CostEntry {
                object_name: object_name.clone(),
                object_count: safe_int(&cells[1]),
                invalid_count: safe_int(&cells[2]),
                estimated_cost: safe_float(&cells[3]),
                comments: cells[4].clone(),
                details: details.clone(),
                kind: CostEntryKind::Main,
                procedure_name: None,
                procedure_cost: None,
            });

            if !details.is_empty() && details != "-" {
                for detail in parse_procedure_details(&details) {
                    entries.push(CostEntry {
                        object_name: object_name.clone(),
                        object_count: 1,
                        invalid_count: 0,
                        estimated_cost: detail.cost,
                        comments: format!("Detail of {}", object_name),
                        details: format!("{}: {}", detail.name, fmt_cost(detail.cost)),
                        kind: CostEntryKind::Procedure,
                        procedure_name: Some(detail.name),
                        procedure_cost: Some(detail.cost),
                    });
                }
            }
        }

        // Only the first matching summary table counts.
        break;
    }

    entries
}
