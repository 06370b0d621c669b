//! Discovery agent binary

use anyhow::Context;
use clap::Parser;

use mulesoft_agent::cli::{self, AgentKind, DiscoveryCli, DiscoveryCommands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = DiscoveryCli::parse();
    let agent = AgentKind::Discovery;

    match cli.command.unwrap_or(DiscoveryCommands::Run) {
        DiscoveryCommands::Run => cli::run::discovery(&cli.global)
            .await
            .context("discovery agent failed")?,
        DiscoveryCommands::Status => cli::status::run(&cli.global, agent).await?,
        DiscoveryCommands::Service => cli::service::run(&cli.global, agent)?,
        DiscoveryCommands::Version => cli::print_version(agent),
        DiscoveryCommands::Preview { format } => cli::preview::run(&cli.global, format)
            .await
            .context("preview failed")?,
    }
    Ok(())
}
