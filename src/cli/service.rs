//! systemd unit generation

use std::path::Path;

use super::{AgentKind, GlobalArgs};
use crate::config::AgentConfig;
use crate::error::Result;

/// Render a unit that runs `exe` with the given config file.
pub fn unit_file(agent: AgentKind, exe: &Path, config: &Path) -> String {
    format!(
        "[Unit]\n\
         Description={description}\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={exe} run --config {config}\n\
         ExecReload=/bin/kill -HUP $MAINPID\n\
         Restart=on-failure\n\
         RestartSec=10\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        description = agent.description(),
        exe = exe.display(),
        config = config.display(),
    )
}

/// Print the unit for the running binary.
pub fn run(global: &GlobalArgs, agent: AgentKind) -> Result<()> {
    let exe = std::env::current_exe()?;
    let config = match global.config_ref() {
        Some(path) => path.to_path_buf(),
        None => AgentConfig::default_path(agent.name())?,
    };
    print!("{}", unit_file(agent, &exe, &config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_file() {
        let unit = unit_file(
            AgentKind::Traceability,
            Path::new("/opt/agent/traceability"),
            Path::new("/etc/agent/traceability.yaml"),
        );
        assert!(unit.starts_with("[Unit]\nDescription=Mulesoft Anypoint traceability agent\n"));
        assert!(unit.contains(
            "ExecStart=/opt/agent/traceability run --config /etc/agent/traceability.yaml\n"
        ));
        assert!(unit.contains("ExecReload=/bin/kill -HUP $MAINPID"));
        assert!(unit.ends_with("WantedBy=multi-user.target\n"));
    }
}
