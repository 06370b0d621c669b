//! Common CLI types shared across commands

/// Output format for listing commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table format - one row per service (default)
    #[default]
    Table,
    /// JSON format - structured for scripts
    Json,
}
