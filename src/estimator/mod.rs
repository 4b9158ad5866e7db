//! External cost-estimator boundary.
//!
//! Drives the `ora2pg` executable: writes a per-profile configuration
//! file, invokes the estimator once per report format and parses the
//! artifacts it leaves behind. Every failure mode (spawn error, nonzero
//! exit, missing report) degrades to an Unknown estimate; the estimator
//! never aborts a run.

pub mod html;
pub mod report;

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{ConnectionProfile, EstimatorOutputMode};
use crate::model::{CapabilityTier, CostEntry, MigrationEstimate};

pub use html::parse_object_summary;
pub use report::{parse_text_report, TextMetrics};

/// Easy connect address: `host:port/service`.
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+):(\d+)/(.+)$").unwrap());

/// Estimator output for one profile: the headline estimate plus the
/// object-level and procedure-level breakdown rows.
#[derive(Debug, Clone)]
pub struct CostReport {
    pub estimate: MigrationEstimate,
    pub entries: Vec<CostEntry>,
}

impl CostReport {
    fn unknown(schema_analyzed: &str) -> Self {
        CostReport {
            estimate: MigrationEstimate::unknown(schema_analyzed),
            entries: Vec::new(),
        }
    }
}

/// Translate an easy connect address into the estimator's DSN form.
fn estimator_dsn(address: &str) -> Option<String> {
    ADDRESS_RE
        .captures(address)
        .map(|caps| format!("dbi:Oracle://{}:{}/{}", &caps[1], &caps[2], &caps[3]))
}

/// Render the estimator configuration file for one profile.
fn render_conf(
    profile: &ConnectionProfile,
    tier: CapabilityTier,
    scope: &[String],
    dsn: &str,
) -> String {
    let mut conf = String::new();
    conf.push_str(&format!("ORACLE_DSN\t{dsn}\n"));
    conf.push_str(&format!("ORACLE_USER\t{}\n", profile.username));
    conf.push_str(&format!("ORACLE_PWD\t{}\n", profile.password));
    conf.push_str(&format!("SCHEMA\t{}\n", scope.join(" ")));
    // Restricted sessions cannot read the DBA catalog.
    if tier == CapabilityTier::Restricted {
        conf.push_str("USER_GRANTS\t1\n");
    }
    conf.push_str("DATA_LIMIT\t10000\n");
    conf.push_str("TRANSACTION\treadonly\n");
    conf
}

fn run_report(conf_path: &Path, report_path: &Path, as_html: bool) -> Result<()> {
    let out_file = fs::File::create(report_path)
        .with_context(|| format!("creating report file {}", report_path.display()))?;

    let mut cmd = Command::new("ora2pg");
    cmd.arg("-c")
        .arg(conf_path)
        .arg("--type=SHOW_REPORT")
        .arg("--estimate_cost");
    if as_html {
        cmd.arg("--dump_as_html");
    }
    let status = cmd
        .stdout(Stdio::from(out_file))
        .stderr(Stdio::null())
        .status()
        .context("spawning ora2pg")?;

    if !status.success() {
        anyhow::bail!("ora2pg exited with {status}");
    }
    Ok(())
}

/// Produce the cost estimate for one profile.
///
/// Artifacts land in `output_dir`: the rendered configuration file, the
/// HTML report and, depending on `mode`, the textual report. The
/// returned report is never an error; failures are logged and collapsed
/// into [`MigrationEstimate::unknown`].
pub fn estimate_migration(
    profile: &ConnectionProfile,
    tier: CapabilityTier,
    scope: &[String],
    output_dir: &Path,
    mode: EstimatorOutputMode,
) -> CostReport {
    let schema_analyzed = scope.join(",");

    let address = match profile.address.as_deref() {
        Some(a) => a,
        None => {
            warn!(profile = %profile.name, "no address, skipping cost estimation");
            return CostReport::unknown(&schema_analyzed);
        }
    };
    let dsn = match estimator_dsn(address) {
        Some(dsn) => dsn,
        None => {
            warn!(profile = %profile.name, address, "unparsable address, skipping cost estimation");
            return CostReport::unknown(&schema_analyzed);
        }
    };

    let conf_path = output_dir.join(format!("{}_ora2pg_{}.conf", profile.name, profile.username));
    let html_path = output_dir.join(format!(
        "{}_migration_report_{}.html",
        profile.name, profile.username
    ));
    let text_path = output_dir.join(format!(
        "{}_migration_report_{}.txt",
        profile.name, profile.username
    ));

    if let Err(err) = fs::create_dir_all(output_dir)
        .map_err(anyhow::Error::from)
        .and_then(|_| {
            fs::write(&conf_path, render_conf(profile, tier, scope, &dsn))
                .context("writing estimator configuration")
        })
    {
        warn!(profile = %profile.name, %err, "could not prepare estimator configuration");
        return CostReport::unknown(&schema_analyzed);
    }

    info!(profile = %profile.name, schemas = %schema_analyzed, "running cost estimator");

    if let Err(err) = run_report(&conf_path, &html_path, true) {
        warn!(profile = %profile.name, %err, "HTML cost report failed");
        return CostReport::unknown(&schema_analyzed);
    }

    let entries = match fs::read_to_string(&html_path) {
        Ok(html) => parse_object_summary(&html),
        Err(err) => {
            warn!(profile = %profile.name, %err, "HTML cost report unreadable");
            Vec::new()
        }
    };

    let mut estimate = MigrationEstimate::unknown(&schema_analyzed);
    if mode == EstimatorOutputMode::HtmlAndText {
        match run_report(&conf_path, &text_path, false).and_then(|_| {
            fs::read_to_string(&text_path).context("reading textual cost report")
        }) {
            Ok(text) => {
                let metrics = parse_text_report(&text);
                estimate.total_cost = metrics.total_cost;
                estimate.migration_level = metrics.migration_level;
                estimate.object_counts = metrics.object_counts;
            }
            Err(err) => {
                warn!(profile = %profile.name, %err, "textual cost report failed");
            }
        }
    }

    debug!(
        profile = %profile.name,
        total_cost = estimate.total_cost,
        entries = entries.len(),
        "cost estimation finished"
    );
    CostReport { estimate, entries }
}

/// Parse a report file that already exists on disk, HTML or text chosen
/// by extension.
pub fn parse_report_file(path: &Path) -> Result<CostReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading report {}", path.display()))?;
    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let is_html = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html") | Some("htm")
    );
    if is_html {
        // Only the textual report carries the headline total; an
        // HTML-only parse keeps the zero-cost / Unknown defaults.
        Ok(CostReport {
            estimate: MigrationEstimate::unknown(&label),
            entries: parse_object_summary(&content),
        })
    } else {
        let metrics = parse_text_report(&content);
        Ok(CostReport {
            estimate: MigrationEstimate {
                total_cost: metrics.total_cost,
                migration_level: metrics.migration_level,
                object_counts: metrics.object_counts,
                schema_analyzed: label,
            },
            entries: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapabilityOverride;

    fn profile(address: Option<&str>) -> ConnectionProfile {
        ConnectionProfile {
            name: "BILLING".to_string(),
            address: address.map(str::to_string),
            username: "APP".to_string(),
            password: "secret".to_string(),
            description: None,
            target_schema: None,
            elevated: CapabilityOverride::Auto,
            whole_instance: false,
        }
    }

    #[test]
    fn test_dsn_translation() {
        assert_eq!(
            estimator_dsn("db1.example.com:1521/BILLING").as_deref(),
            Some("dbi:Oracle://db1.example.com:1521/BILLING")
        );
        assert_eq!(estimator_dsn("not-an-address"), None);
    }

    #[test]
    fn test_conf_binds_scope_and_tier() {
        let p = profile(Some("db1:1521/SVC"));
        let scope = vec!["APP".to_string(), "HR".to_string()];
        let conf = render_conf(
            &p,
            CapabilityTier::Restricted,
            &scope,
            "dbi:Oracle://db1:1521/SVC",
        );
        assert!(conf.contains("SCHEMA\tAPP HR\n"));
        assert!(conf.contains("USER_GRANTS\t1\n"));

        let elevated = render_conf(
            &p,
            CapabilityTier::Elevated,
            &scope,
            "dbi:Oracle://db1:1521/SVC",
        );
        assert!(!elevated.contains("USER_GRANTS"));
    }

    #[test]
    fn test_missing_address_degrades_to_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let report = estimate_migration(
            &profile(None),
            CapabilityTier::Restricted,
            &["APP".to_string()],
            dir.path(),
            EstimatorOutputMode::HtmlAndText,
        );
        assert_eq!(report.estimate.migration_level, "Unknown");
        assert_eq!(report.estimate.schema_analyzed, "APP");
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_html_only_report_keeps_zero_cost_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.html");
        std::fs::write(
            &path,
            r#"<table>
                 <tr><th>Object</th><th>Number</th><th>a</th><th>b</th><th>c</th><th>d</th></tr>
                 <tr><td>TABLE</td><td>3</td><td>0</td><td>4.2</td><td>x</td><td>-</td></tr>
                 <tr><td>VIEW</td><td>1</td><td>0</td><td>5.8</td><td>x</td><td>-</td></tr>
               </table>"#,
        )
        .unwrap();
        let report = parse_report_file(&path).unwrap();
        assert_eq!(report.entries.len(), 2);
        // The headline total comes only from the textual report; row
        // costs must never be summed into it.
        assert_eq!(report.estimate.total_cost, 0.0);
        assert_eq!(report.estimate.migration_level, "Unknown");
    }

    #[test]
    fn test_parse_report_file_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");
        std::fs::write(&path, "Total estimated cost: 12.5\nMigration level: B-5\n").unwrap();
        let report = parse_report_file(&path).unwrap();
        assert_eq!(report.estimate.total_cost, 12.5);
        assert_eq!(report.estimate.migration_level, "B");
        assert_eq!(report.estimate.schema_analyzed, "run");
    }
}
