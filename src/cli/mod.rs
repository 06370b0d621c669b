//! CLI command definitions for the two agent binaries

use clap::{Parser, Subcommand};

pub mod args;
pub mod preview;
pub mod run;
pub mod service;
pub mod status;

pub use args::{GlobalArgs, OutputFormat};

/// Which agent a binary runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Discovery,
    Traceability,
}

impl AgentKind {
    /// Binary and config file name
    pub fn name(self) -> &'static str {
        match self {
            AgentKind::Discovery => "discovery",
            AgentKind::Traceability => "traceability",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentKind::Discovery => "Mulesoft Anypoint discovery agent",
            AgentKind::Traceability => "Mulesoft Anypoint traceability agent",
        }
    }
}

/// Discovers Anypoint APIs and publishes them to Amplify Central
#[derive(Parser, Debug)]
#[command(name = "discovery")]
#[command(version, about, long_about = None)]
pub struct DiscoveryCli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<DiscoveryCommands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DiscoveryCommands {
    /// Run the discovery agent until interrupted
    Run,

    /// Show configuration and connectivity status
    Status,

    /// Print a systemd unit for this agent
    Service,

    /// Display version information
    Version,

    /// Run one discovery cycle and print the services without publishing
    Preview {
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Reports Anypoint API traffic to Amplify Central
#[derive(Parser, Debug)]
#[command(name = "traceability")]
#[command(version, about, long_about = None)]
pub struct TraceabilityCli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<TraceabilityCommands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TraceabilityCommands {
    /// Run the traceability agent until interrupted
    Run,

    /// Show configuration and connectivity status
    Status,

    /// Print a systemd unit for this agent
    Service,

    /// Display version information
    Version,
}

/// Print the version line for an agent.
pub fn print_version(agent: AgentKind) {
    println!("{} version {}", agent.name(), env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_clis_are_well_formed() {
        DiscoveryCli::command().debug_assert();
        TraceabilityCli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = DiscoveryCli::try_parse_from(["discovery"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_preview_format() {
        let cli =
            DiscoveryCli::try_parse_from(["discovery", "preview", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(DiscoveryCommands::Preview {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = TraceabilityCli::try_parse_from([
            "traceability",
            "status",
            "--config",
            "/tmp/t.yaml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.global.config_ref(), Some(std::path::Path::new("/tmp/t.yaml")));
        assert_eq!(cli.global.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_traceability_has_no_preview() {
        assert!(TraceabilityCli::try_parse_from(["traceability", "preview"]).is_err());
    }
}
