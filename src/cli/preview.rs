//! Preview command: one discovery cycle printed instead of published

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use super::run::connect;
use super::{AgentKind, GlobalArgs, OutputFormat};
use crate::central::{Catalog, InstanceRef, ServiceBody, SubscriptionRequest};
use crate::discovery::{DiscoveryAgent, ServiceDetail};
use crate::error::{Error, Result};
use crate::subscription::SubscriptionState;

/// Catalog that has nothing published, so every discoverable API shows up
struct OfflineCatalog;

#[async_trait]
impl Catalog for OfflineCatalog {
    async fn published_checksum(&self, _external_api_id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn publish(&self, body: &ServiceBody) -> Result<()> {
        Err(Error::Other(format!("preview does not publish {}", body.name)))
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRef>> {
        Ok(Vec::new())
    }

    async fn pending_subscriptions(&self) -> Result<Vec<SubscriptionRequest>> {
        Ok(Vec::new())
    }

    async fn update_subscription(
        &self,
        _id: &str,
        _state: SubscriptionState,
        _message: &str,
        _properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Tabled)]
struct PreviewRow {
    #[tabled(rename = "API ID")]
    id: String,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "SPEC")]
    resource_type: String,
    #[tabled(rename = "AUTH")]
    auth_policy: String,
    #[tabled(rename = "ENDPOINTS")]
    endpoints: String,
}

impl From<&ServiceDetail> for PreviewRow {
    fn from(detail: &ServiceDetail) -> Self {
        let endpoints = detail
            .endpoints
            .iter()
            .map(|e| format!("{}://{}:{}{}", e.protocol, e.host, e.port, e.base_path))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            id: detail.id.clone(),
            title: detail.title.clone(),
            version: detail.version.clone(),
            resource_type: detail.resource_type.to_string(),
            auth_policy: detail.auth_policy.to_string(),
            endpoints,
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    data: &'a [ServiceDetail],
    meta: Metadata,
}

#[derive(Serialize)]
struct Metadata {
    timestamp: String,
    version: &'static str,
}

pub fn render(details: &[ServiceDetail], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let output = JsonOutput {
                data: details,
                meta: Metadata {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    version: env!("CARGO_PKG_VERSION"),
                },
            };
            Ok(serde_json::to_string_pretty(&output)?)
        }
        OutputFormat::Table => {
            if details.is_empty() {
                return Ok("No services discovered.".to_string());
            }
            let rows: Vec<PreviewRow> = details.iter().map(PreviewRow::from).collect();
            let mut table = Table::new(rows);
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));
            Ok(table.to_string())
        }
    }
}

pub async fn run(global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let config = global.load_config(AgentKind::Discovery)?;
    global.init_logging(&config.log.level);

    let client = connect(&config).await?;
    let agent = DiscoveryAgent::new(config, client.clone(), Arc::new(OfflineCatalog));
    let details = agent.preview().await;
    client.stop().await;

    println!("{}", render(&details?, format)?);
    Ok(())
}
