//! Telemetry ingestion

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::Serialize;

use super::events::{MetricEvent, TransportEvent};
use crate::config::CentralConfig;
use crate::error::{ApiError, ConfigError, Result};

/// Destination for traceability output
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send_events(&self, events: Vec<TransportEvent>) -> Result<()>;

    async fn send_metrics(&self, metrics: Vec<MetricEvent>) -> Result<()>;
}

/// Posts JSON arrays to the ingestion endpoint
pub struct HttpEventSink {
    http: HttpClient,
    base_url: String,
    tenant_id: String,
    token: Option<String>,
}

impl HttpEventSink {
    pub fn new(config: &CentralConfig, timeout: Duration) -> Result<Self> {
        if config.ingestion_url.is_empty() {
            return Err(ConfigError::MissingField("central.ingestionUrl").into());
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            http,
            base_url: config.ingestion_url.trim_end_matches('/').to_string(),
            tenant_id: config.tenant_id.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self
            .http
            .post(&url)
            .header("X-Axway-Tenant-Id", &self.tenant_id)
            .json(items);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        debug!("Sent {} records to {}", items.len(), path);
        Ok(())
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn send_events(&self, events: Vec<TransportEvent>) -> Result<()> {
        self.post("events", &events).await
    }

    async fn send_metrics(&self, metrics: Vec<MetricEvent>) -> Result<()> {
        self.post("metrics", &metrics).await
    }
}
