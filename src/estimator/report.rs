//! Textual estimator report scan.
//!
//! The text report is optional; when present it carries the most precise
//! total cost and migration-level label. Candidate patterns are ordered
//! and the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

static COST_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Total\s+estimated\s+cost:\s*(\d+\.?\d*)",
        r"(?i)Total\s+cost:\s*(\d+\.?\d*)",
        r"(?i)Migration\s+cost:\s*(\d+\.?\d*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static LEVEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)Migration\s+level:\s*(\w+)", r"(?i)Level:\s*(\w+)"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static OBJECT_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s+\[(\d+)\]").unwrap());

/// Metrics scanned out of the textual report.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMetrics {
    pub total_cost: f64,
    pub migration_level: String,
    pub object_counts: Vec<(String, i64)>,
}

impl Default for TextMetrics {
    fn default() -> Self {
        TextMetrics {
            total_cost: 0.0,
            migration_level: "Unknown".to_string(),
            object_counts: Vec::new(),
        }
    }
}

/// Scan the textual report. Unmatched fields keep their defaults.
pub fn parse_text_report(content: &str) -> TextMetrics {
    let mut metrics = TextMetrics::default();

    for pattern in COST_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(content) {
            if let Ok(cost) = caps[1].parse::<f64>() {
                metrics.total_cost = cost;
            }
            break;
        }
    }

    for pattern in LEVEL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(content) {
            metrics.migration_level = caps[1].to_string();
            break;
        }
    }

    for caps in OBJECT_COUNT.captures_iter(content) {
        if let Ok(count) = caps[2].parse::<i64>() {
            metrics.object_counts.push((caps[1].to_string(), count));
        }
    }

    metrics
}
