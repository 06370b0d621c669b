//! Global CLI options shared by both agents
//!
//! Configuration precedence is: CLI flag > environment variable > config
//! file > default. These flags are the first layer; the rest is resolved
//! by [`AgentConfig::load`].

use std::path::{Path, PathBuf};

use clap::Args;

use crate::cli::AgentKind;
use crate::config::AgentConfig;
use crate::error::Result;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Global flags accepted by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Override config file location
    #[arg(long, global = true, env = "MULESOFT_AGENT_CONFIG", hide_env = true)]
    pub config: Option<PathBuf>,

    /// Log level or env_logger filter (overrides RUST_LOG and log.level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    /// Get config path as `Option<&Path>`.
    pub fn config_ref(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Load and validate the agent's configuration.
    pub fn load_config(&self, agent: AgentKind) -> Result<AgentConfig> {
        AgentConfig::load(agent.name(), self.config_ref())
    }

    /// Filter for the logger given the `RUST_LOG` value and the configured
    /// level.
    pub fn log_filter(&self, rust_log: Option<String>, config_level: &str) -> String {
        if let Some(level) = self.log_level.as_deref().filter(|l| !l.is_empty()) {
            return level.to_string();
        }
        if let Some(filter) = rust_log.filter(|f| !f.is_empty()) {
            return filter;
        }
        if !config_level.is_empty() {
            return config_level.to_string();
        }
        DEFAULT_LOG_LEVEL.to_string()
    }

    /// Install the logger. Later calls are ignored.
    pub fn init_logging(&self, config_level: &str) {
        let filter = self.log_filter(std::env::var("RUST_LOG").ok(), config_level);
        let _ = env_logger::Builder::new()
            .parse_filters(&filter)
            .format_timestamp_millis()
            .try_init();
    }
}
