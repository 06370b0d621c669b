//! Long-running agent entry points
//!
//! Both agents stop on Ctrl-C or SIGTERM. SIGHUP reloads the configuration
//! and restarts the agent's loops with a freshly connected client and
//! freshly built Central clients.

use std::sync::Arc;

use log::{error, info};

use super::{AgentKind, GlobalArgs};
use crate::central::{CentralClient, HttpEventSink};
use crate::client::AnypointClient;
use crate::config::AgentConfig;
use crate::discovery::DiscoveryAgent;
use crate::error::{Error, Result};
use crate::traceability::TraceabilityAgent;

enum Signal {
    Shutdown,
    Reload,
}

#[cfg(unix)]
async fn next_signal() -> Signal {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut term), Ok(mut hup)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) else {
        let _ = tokio::signal::ctrl_c().await;
        return Signal::Shutdown;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => Signal::Shutdown,
        _ = term.recv() => Signal::Shutdown,
        _ = hup.recv() => Signal::Reload,
    }
}

#[cfg(not(unix))]
async fn next_signal() -> Signal {
    let _ = tokio::signal::ctrl_c().await;
    Signal::Shutdown
}

/// Log in and resolve the environment. Authentication failures are fatal.
pub async fn connect(config: &AgentConfig) -> Result<Arc<AnypointClient>> {
    let client = Arc::new(AnypointClient::new(&config.mulesoft)?);
    client.connect().await?;
    Ok(client)
}

fn catalog(config: &AgentConfig) -> Result<Arc<CentralClient>> {
    Ok(Arc::new(CentralClient::new(&config.central, config.mulesoft.timeout)?))
}

fn sink(config: &AgentConfig) -> Result<Arc<HttpEventSink>> {
    Ok(Arc::new(HttpEventSink::new(&config.central, config.mulesoft.timeout)?))
}

pub async fn discovery(global: &GlobalArgs) -> Result<()> {
    let config = global.load_config(AgentKind::Discovery)?;
    global.init_logging(&config.log.level);

    let mut client = connect(&config).await?;
    let mut agent = DiscoveryAgent::new(config.clone(), client.clone(), catalog(&config)?);
    agent.start();

    while let Signal::Reload = next_signal().await {
        info!("Reloading configuration");
        let reloaded = async {
            let config = global.load_config(AgentKind::Discovery)?;
            let central = catalog(&config)?;
            let fresh = connect(&config).await?;
            Ok::<_, Error>((config, fresh, central))
        };
        match reloaded.await {
            Ok((config, fresh, central)) => {
                agent.on_config_change(config, fresh.clone(), central).await;
                client.stop().await;
                client = fresh;
            }
            Err(e) => error!("Keeping previous configuration: {}", e),
        }
    }

    info!("Shutting down");
    agent.stop().await;
    client.stop().await;
    Ok(())
}

pub async fn traceability(global: &GlobalArgs) -> Result<()> {
    let config = global.load_config(AgentKind::Traceability)?;
    global.init_logging(&config.log.level);

    let mut client = connect(&config).await?;
    let mut agent = TraceabilityAgent::new(
        config.clone(),
        client.clone(),
        catalog(&config)?,
        sink(&config)?,
    );
    agent.start();

    while let Signal::Reload = next_signal().await {
        info!("Reloading configuration");
        let reloaded = async {
            let config = global.load_config(AgentKind::Traceability)?;
            let (central, events) = (catalog(&config)?, sink(&config)?);
            let fresh = connect(&config).await?;
            Ok::<_, Error>((config, fresh, central, events))
        };
        match reloaded.await {
            Ok((config, fresh, central, events)) => {
                agent
                    .on_config_change(config, fresh.clone(), central, events)
                    .await;
                client.stop().await;
                client = fresh;
            }
            Err(e) => error!("Keeping previous configuration: {}", e),
        }
    }

    info!("Shutting down");
    agent.stop().await;
    client.stop().await;
    Ok(())
}
