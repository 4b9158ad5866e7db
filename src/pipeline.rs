//! Sequential analysis pipeline.
//!
//! Profiles are processed strictly in configuration order. Each profile
//! runs classify -> scope -> extract -> estimate -> persist; a failure
//! anywhere in that chain becomes an error outcome for that profile and
//! the pipeline moves on to the next one. Results are persisted per
//! profile, so a crash mid-fleet keeps everything already analyzed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::classify::classify;
use crate::config::{AnalyzerConfig, ConnectionProfile, OutputOptions};
use crate::estimator::{estimate_migration, CostReport};
use crate::extract::{extract_dependencies, extract_sizes};
use crate::model::CapabilityTier;
use crate::scope::resolve_scope;
use crate::source::SourceConnection;
use crate::store::ResultsStore;

/// Opens sessions against source instances. The pipeline is generic
/// over this seam; tests inject canned sources.
pub trait SourceFactory {
    fn connect(&self, profile: &ConnectionProfile, address: &str)
        -> Result<Box<dyn SourceConnection>>;
}

/// Production factory backed by the optional client feature.
pub struct ClientSourceFactory;

impl SourceFactory for ClientSourceFactory {
    #[cfg(feature = "oracle-client")]
    fn connect(
        &self,
        profile: &ConnectionProfile,
        address: &str,
    ) -> Result<Box<dyn SourceConnection>> {
        let source =
            crate::source::OracleSource::connect(address, &profile.username, &profile.password)?;
        Ok(Box::new(source))
    }

    #[cfg(not(feature = "oracle-client"))]
    fn connect(
        &self,
        profile: &ConnectionProfile,
        _address: &str,
    ) -> Result<Box<dyn SourceConnection>> {
        anyhow::bail!(
            "cannot connect to '{}': built without the oracle-client feature",
            profile.name
        )
    }
}

/// Result of one profile's run.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOutcome {
    pub name: String,
    pub tier: Option<CapabilityTier>,
    pub scope: Vec<String>,
    pub dependency_rows: usize,
    pub size_rows: usize,
    pub cost_entries: usize,
    pub total_cost: f64,
    pub error: Option<String>,
}

impl ProfileOutcome {
    fn failed(name: &str, error: String) -> Self {
        ProfileOutcome {
            name: name.to_string(),
            tier: None,
            scope: Vec::new(),
            dependency_rows: 0,
            size_rows: 0,
            cost_entries: 0,
            total_cost: 0.0,
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Whole-fleet run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub output_dir: String,
    pub outcomes: Vec<ProfileOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    fn render_text(&self) -> String {
        let total_deps: usize = self.outcomes.iter().map(|o| o.dependency_rows).sum();
        let total_cost: f64 = self.outcomes.iter().map(|o| o.total_cost).sum();
        let elevated = self
            .outcomes
            .iter()
            .filter(|o| o.tier == Some(CapabilityTier::Elevated))
            .count();
        let restricted = self
            .outcomes
            .iter()
            .filter(|o| o.tier == Some(CapabilityTier::Restricted))
            .count();

        let mut text = String::new();
        text.push_str(&format!("Analysis run started {}\n", self.started_at));
        text.push_str(&format!(
            "Profiles: {} analyzed, {} failed ({} elevated, {} restricted)\n",
            self.succeeded(),
            self.failed(),
            elevated,
            restricted
        ));
        text.push_str(&format!(
            "Dependency rows: {}, total estimated cost: {:.1}\n\n",
            total_deps, total_cost
        ));
        for o in &self.outcomes {
            match &o.error {
                None => {
                    let tier = o
                        .tier
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    text.push_str(&format!(
                        "[ok]   {} tier={} scope={} deps={} sizes={} cost={:.1} ({} entries)\n",
                        o.name,
                        tier,
                        o.scope.join(","),
                        o.dependency_rows,
                        o.size_rows,
                        o.total_cost,
                        o.cost_entries
                    ));
                }
                Some(err) => {
                    text.push_str(&format!("[fail] {}: {}\n", o.name, err));
                }
            }
        }
        text
    }
}

fn resolve_output_dir(config: &AnalyzerConfig) -> PathBuf {
    match &config.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(format!(
            "migration_analysis_{}",
            Local::now().format("%Y%m%d_%H%M%S")
        )),
    }
}

/// Analyze every profile in the configuration, persisting per profile.
pub fn run_analysis(
    config: &AnalyzerConfig,
    options: &OutputOptions,
    factory: &dyn SourceFactory,
) -> Result<RunSummary> {
    let output_dir = resolve_output_dir(config);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let mut store = ResultsStore::open(Path::new(&config.store_path))?;

    let mut summary = RunSummary {
        started_at: Local::now().to_rfc3339(),
        output_dir: output_dir.display().to_string(),
        outcomes: Vec::with_capacity(config.profiles.len()),
    };

    for profile in &config.profiles {
        info!(profile = %profile.name, "analyzing profile");
        let outcome = match analyze_profile(profile, options, factory, &mut store, &output_dir) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(profile = %profile.name, %err, "profile analysis failed");
                ProfileOutcome::failed(&profile.name, format!("{err:#}"))
            }
        };
        summary.outcomes.push(outcome);
    }

    let summary_path = output_dir.join("analysis_summary.txt");
    if let Err(err) = fs::write(&summary_path, summary.render_text()) {
        warn!(%err, path = %summary_path.display(), "could not write run summary");
    }

    info!(
        analyzed = summary.succeeded(),
        failed = summary.failed(),
        "fleet analysis finished"
    );
    Ok(summary)
}

fn analyze_profile(
    profile: &ConnectionProfile,
    options: &OutputOptions,
    factory: &dyn SourceFactory,
    store: &mut ResultsStore,
    output_dir: &Path,
) -> Result<ProfileOutcome> {
    let address = profile
        .address
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing address"))?;

    let conn = factory.connect(profile, address)?;
    let tier = classify(conn.as_ref(), profile);
    let scope = resolve_scope(conn.as_ref(), tier, profile)?;

    let dependencies = extract_dependencies(conn.as_ref(), tier, &scope);
    let sizes = options
        .analyze_sizes
        .then(|| extract_sizes(conn.as_ref(), tier, &scope));

    let CostReport { estimate, entries } =
        estimate_migration(profile, tier, &scope, output_dir, options.estimator_mode);

    let connection_id = store.upsert_connection(profile, tier, &scope)?;
    store.replace_run(
        connection_id,
        tier,
        &dependencies,
        sizes.as_ref(),
        &estimate,
        &entries,
    )?;

    Ok(ProfileOutcome {
        name: profile.name.clone(),
        tier: Some(tier),
        scope,
        dependency_rows: dependencies.total_rows(),
        size_rows: sizes.map(|s| s.total_rows()).unwrap_or(0),
        cost_entries: entries.len(),
        total_cost: estimate.total_cost,
        error: None,
    })
}
