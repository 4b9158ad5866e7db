// CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};

/// Migrascope - Oracle fleet migration analyzer
///
/// Classifies each configured connection by catalog capability, extracts
/// cross-schema dependencies and size metrics, runs the external cost
/// estimator and persists everything into a local results store.
#[derive(Parser, Debug, Clone)]
#[command(name = "migrascope")]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the results store
    #[arg(global = true, long, env = "MIGRASCOPE_DB")]
    pub store: Option<String>,

    /// Output format
    #[arg(global = true, long, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Human,
    /// Compact JSON for programmatic consumption
    Json,
    /// Formatted JSON with indentation
    Pretty,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Analyze every profile in the configuration
    Analyze(AnalyzeArgs),

    /// Create (or verify) the results-store schema
    InitStore(InitStoreArgs),

    /// Show results-store row counts
    Status(StatusArgs),

    /// Parse an existing estimator report file
    ParseReport(ParseReportArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "migrascope.json")]
    pub config: String,

    /// Skip size-metric extraction
    #[arg(long)]
    pub no_sizes: bool,

    /// Estimator report artifacts to produce
    #[arg(long, value_enum)]
    pub estimator_mode: Option<EstimatorModeArg>,

    /// Also emit tabular exports alongside the reports
    #[arg(long)]
    pub tabular: bool,

    /// Directory for estimator artifacts and the run summary
    #[arg(long)]
    pub output_dir: Option<String>,
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct InitStoreArgs {}

#[derive(Parser, Debug, Clone, Copy)]
pub struct StatusArgs {}

#[derive(Parser, Debug, Clone)]
pub struct ParseReportArgs {
    /// Report file to parse (.html/.htm or text)
    #[arg(long)]
    pub report: String,
}

/// Estimator artifact selection, mirroring the configuration values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorModeArg {
    /// HTML report only
    HtmlOnly,
    /// HTML plus textual report
    HtmlAndText,
}

impl From<EstimatorModeArg> for crate::config::EstimatorOutputMode {
    fn from(mode: EstimatorModeArg) -> Self {
        match mode {
            EstimatorModeArg::HtmlOnly => crate::config::EstimatorOutputMode::HtmlOnly,
            EstimatorModeArg::HtmlAndText => crate::config::EstimatorOutputMode::HtmlAndText,
        }
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Resolve the results-store path from multiple sources
///
/// Priority: CLI arg > MIGRASCOPE_DB env var > default "migration_inventory.db"
pub fn resolve_store_path(cli_store: Option<String>) -> String {
    cli_store
        .or_else(|| std::env::var("MIGRASCOPE_DB").ok())
        .unwrap_or_else(|| "migration_inventory.db".to_string())
}

// ============================================================================
// Command Handlers
// ============================================================================

pub mod cmds {
    use std::path::Path;

    use super::*;
    use crate::config::{self, AnalyzerConfig, ConfigError, OutputOptions};
    use crate::estimator;
    use crate::output;
    use crate::pipeline::{run_analysis, ClientSourceFactory};
    use crate::store::ResultsStore;
    use anyhow::Result;

    /// Emit an error in the selected output format, then exit.
    fn exit_with(cli: &Cli, err: output::JsonError, code: i32) -> ! {
        match cli.output {
            OutputFormat::Human => {
                output::error(&err.message);
                if let Some(hint) = &err.remediation {
                    output::info(hint);
                }
            }
            OutputFormat::Json => println!("{}", err.to_json()),
            OutputFormat::Pretty => println!("{}", err.to_pretty_json()),
        }
        std::process::exit(code);
    }

    pub fn analyze(args: AnalyzeArgs, cli: &Cli) -> Result<()> {
        let config_path = Path::new(&args.config);
        let mut config = match AnalyzerConfig::load(config_path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(path)) => {
                let err = match config::write_sample(config_path) {
                    Ok(()) => output::JsonError::config_not_found(&path),
                    Err(e) => output::JsonError::config_not_found(&path).with_remediation(
                        &format!("Sample configuration could not be written: {}", e),
                    ),
                };
                exit_with(cli, err, output::EXIT_FILE_NOT_FOUND);
            }
            Err(e) => {
                exit_with(
                    cli,
                    output::JsonError::config_invalid(&e.to_string()),
                    output::EXIT_VALIDATION,
                );
            }
        };

        if let Some(store) = &cli.store {
            config.store_path = store.clone();
        }
        if let Some(dir) = &args.output_dir {
            config.output_dir = Some(dir.clone());
        }

        let mut options = OutputOptions::from_config(&config);
        if args.no_sizes {
            options.analyze_sizes = false;
        }
        if let Some(mode) = args.estimator_mode {
            options.estimator_mode = mode.into();
        }
        options.tabular = args.tabular;

        let summary = run_analysis(&config, &options, &ClientSourceFactory)?;

        match cli.output {
            OutputFormat::Human => {
                output::header(&format!(
                    "Fleet analysis: {} analyzed, {} failed",
                    summary.succeeded(),
                    summary.failed()
                ));
                for outcome in &summary.outcomes {
                    match &outcome.error {
                        None => output::success(&format!(
                            "{}: tier={} scope={} deps={} sizes={} cost={:.1}",
                            outcome.name,
                            outcome
                                .tier
                                .map(|t| t.to_string())
                                .unwrap_or_else(|| "?".to_string()),
                            outcome.scope.join(","),
                            outcome.dependency_rows,
                            outcome.size_rows,
                            outcome.total_cost
                        )),
                        Some(err) => output::error(&format!("{}: {}", outcome.name, err)),
                    }
                }
                output::info(&format!("Artifacts written to {}", summary.output_dir));
            }
            OutputFormat::Json => {
                println!("{}", output::JsonResponse::new(&summary).to_json());
            }
            OutputFormat::Pretty => {
                println!("{}", output::JsonResponse::new(&summary).to_pretty_json());
            }
        }

        if summary.succeeded() == 0 && !summary.outcomes.is_empty() {
            std::process::exit(output::EXIT_ERROR);
        }
        Ok(())
    }

    pub fn init_store(_args: InitStoreArgs, cli: &Cli) -> Result<()> {
        let store_path = resolve_store_path(cli.store.clone());
        match ResultsStore::open(Path::new(&store_path)) {
            Ok(_) => {
                output::success(&format!("Results store ready at {}", store_path));
                Ok(())
            }
            Err(e) => {
                exit_with(
                    cli,
                    output::JsonError::store_error(&format!("{:#}", e)),
                    output::EXIT_DATABASE,
                );
            }
        }
    }

    pub fn status(_args: StatusArgs, cli: &Cli) -> Result<()> {
        let store_path = resolve_store_path(cli.store.clone());
        let store = match ResultsStore::open(Path::new(&store_path)) {
            Ok(store) => store,
            Err(e) => {
                exit_with(
                    cli,
                    output::JsonError::store_error(&format!("{:#}", e)),
                    output::EXIT_DATABASE,
                );
            }
        };

        let status = store.status()?;

        match cli.output {
            OutputFormat::Human => {
                println!("Results store status ({}):", store_path);
                println!("  connections: {}", status.connections);
                println!("  elevated rows: {}", status.elevated_rows);
                println!("  restricted rows: {}", status.restricted_rows);
                println!("  cost estimates: {}", status.cost_estimates);
                println!("  cost entries: {}", status.cost_entries);
            }
            OutputFormat::Json => {
                println!("{}", output::JsonResponse::new(status).to_json());
            }
            OutputFormat::Pretty => {
                println!("{}", output::JsonResponse::new(status).to_pretty_json());
            }
        }

        Ok(())
    }

    pub fn parse_report(args: ParseReportArgs, cli: &Cli) -> Result<()> {
        let path = Path::new(&args.report);
        if !path.exists() {
            exit_with(
                cli,
                output::JsonError::report_not_found(&args.report),
                output::EXIT_FILE_NOT_FOUND,
            );
        }

        let report = match estimator::parse_report_file(path) {
            Ok(report) => report,
            Err(e) => {
                exit_with(
                    cli,
                    output::JsonError::invalid_input(&format!(
                        "Failed to parse report {}: {:#}",
                        args.report, e
                    )),
                    output::EXIT_ERROR,
                );
            }
        };

        match cli.output {
            OutputFormat::Human => {
                output::header(&format!("Report: {}", args.report));
                println!(
                    "Total cost: {:.1} (level {})",
                    report.estimate.total_cost, report.estimate.migration_level
                );
                for (object_type, count) in &report.estimate.object_counts {
                    println!("  {}: {}", object_type, count);
                }
                for entry in &report.entries {
                    println!(
                        "  [{}] {} count={} invalid={} cost={:.1}",
                        entry.kind.as_str(),
                        entry.object_name,
                        entry.object_count,
                        entry.invalid_count,
                        entry.estimated_cost
                    );
                }
            }
            OutputFormat::Json => {
                println!("{}", output::JsonResponse::new(&report.entries).to_json());
            }
            OutputFormat::Pretty => {
                println!(
                    "{}",
                    output::JsonResponse::new(&report.entries).to_pretty_json()
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure tests don't interfere with each other by clearing env var
    fn clear_env() {
        std::env::remove_var("MIGRASCOPE_DB");
    }

    #[test]
    fn test_resolve_store_path_default() {
        clear_env();
        assert_eq!(resolve_store_path(None), "migration_inventory.db");
    }

    #[test]
    fn test_resolve_store_path_with_cli_arg() {
        clear_env();
        assert_eq!(
            resolve_store_path(Some("/custom/fleet.db".to_string())),
            "/custom/fleet.db"
        );
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "migrascope",
            "analyze",
            "--config",
            "fleet.json",
            "--no-sizes",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.config, "fleet.json");
                assert!(args.no_sizes);
                assert!(!args.tabular);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_estimator_mode() {
        let cli = Cli::try_parse_from([
            "migrascope",
            "analyze",
            "--estimator-mode",
            "html-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.estimator_mode, Some(EstimatorModeArg::HtmlOnly));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
