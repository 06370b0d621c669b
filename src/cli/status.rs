//! Status command implementation

use colored::Colorize;

use super::run::connect;
use super::{AgentKind, GlobalArgs};
use crate::config::{AgentConfig, duration};
use crate::error::{Error, Result};
use crate::health::{HealthCheck, HealthStatus, run_checks};

fn mark(ok: bool) -> colored::ColoredString {
    if ok { "✓".green() } else { "✗".red() }
}

fn print_config(agent: AgentKind, config: &AgentConfig) {
    let m = &config.mulesoft;
    println!("Anypoint: {}", m.anypoint_exchange_url.cyan());
    println!("Business group: {}", m.org_name.bold());
    println!("Environment: {}", m.environment.bold());
    println!("Poll interval: {}", duration::format(m.poll_interval));

    match agent {
        AgentKind::Discovery => {
            let tags = m.discovery_tags();
            let ignored = m.discovery_ignore_tags();
            if !tags.is_empty() {
                println!("Discovery tags: {}", tags.join(", "));
            }
            if !ignored.is_empty() {
                println!("Ignored tags: {}", ignored.join(", ").dimmed());
            }
            if m.discover_original_raml {
                println!("{} RAML specs published as-is", "○".dimmed());
            }
        }
        AgentKind::Traceability => {
            let t = &config.traceability;
            println!("{} Analytics events", mark(t.collect_events));
            println!("{} Metrics ({})", mark(t.collect_metrics), if m.use_monitoring_api {
                "monitoring archive"
            } else {
                "live query"
            });
            println!("Watermarks: {}", m.cache_file().display());
        }
    }

    if config.central.url.is_empty() {
        println!("{} Central URL not configured", "⚠".yellow());
    } else {
        println!("Central: {}", config.central.url.cyan());
    }
}

/// Show configuration and check connectivity to Anypoint.
pub async fn run(global: &GlobalArgs, agent: AgentKind) -> Result<()> {
    println!("{}\n", format!("{} status", agent.description()).bold());

    let config = match global.load_config(agent) {
        Ok(config) => config,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            println!();
            println!(
                "Create {} or pass {}.",
                AgentConfig::default_path(agent.name())?.display().to_string().cyan(),
                "--config".cyan()
            );
            return Err(e);
        }
    };
    global.init_logging(&config.log.level);

    if let Some(path) = global.config_ref() {
        println!("Config file: {}", path.display().to_string().cyan());
    }
    print_config(agent, &config);
    println!();

    let client = match connect(&config).await {
        Ok(client) => client,
        Err(e) => {
            println!("{} mulesoft: {}", "✗".red(), e);
            return Err(e);
        }
    };
    let results = run_checks(&[client.as_ref() as &dyn HealthCheck]).await;
    client.stop().await;

    let mut healthy = true;
    for result in &results {
        match &result.status {
            HealthStatus::Ok => println!("{} {}", "✓".green(), result.name),
            HealthStatus::Fail(details) => {
                healthy = false;
                println!("{} {}: {}", "✗".red(), result.name, details);
            }
        }
    }
    println!();

    if healthy {
        Ok(())
    } else {
        Err(Error::Other("health check failed".into()))
    }
}
