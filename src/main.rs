// Migrascope: Oracle fleet migration analyzer
//
// Classifies each configured connection by catalog capability, extracts
// cross-schema dependencies and size metrics, runs the external cost
// estimator and persists everything into a local results store.

use anyhow::Result;
use clap::Parser;

use migrascope::cli::{cmds, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    run_command(cli)?;

    Ok(())
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command.clone() {
        Commands::Analyze(args) => cmds::analyze(args, &cli)?,
        Commands::InitStore(args) => cmds::init_store(args, &cli)?,
        Commands::Status(args) => cmds::status(args, &cli)?,
        Commands::ParseReport(args) => cmds::parse_report(args, &cli)?,
    }
    Ok(())
}
