//! Traceability agent binary

use anyhow::Context;
use clap::Parser;

use mulesoft_agent::cli::{self, AgentKind, TraceabilityCli, TraceabilityCommands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = TraceabilityCli::parse();
    let agent = AgentKind::Traceability;

    match cli.command.unwrap_or(TraceabilityCommands::Run) {
        TraceabilityCommands::Run => cli::run::traceability(&cli.global)
            .await
            .context("traceability agent failed")?,
        TraceabilityCommands::Status => cli::status::run(&cli.global, agent).await?,
        TraceabilityCommands::Service => cli::service::run(&cli.global, agent)?,
        TraceabilityCommands::Version => cli::print_version(agent),
    }
    Ok(())
}
