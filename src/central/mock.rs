//! In-memory catalog and sink for tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::catalog::{Catalog, InstanceRef, SubscriptionRequest};
use super::events::{MetricEvent, TransportEvent};
use super::service::ServiceBody;
use super::sink::EventSink;
use crate::error::{Error, Result};
use crate::subscription::state::SubscriptionState;

/// A state change written back to the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub id: String,
    pub state: SubscriptionState,
    pub message: String,
    pub properties: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct MockCatalog {
    checksums: Mutex<HashMap<String, String>>,
    published: Mutex<Vec<ServiceBody>>,
    instances: Mutex<Vec<InstanceRef>>,
    pending: Mutex<Vec<SubscriptionRequest>>,
    updates: Mutex<Vec<StateUpdate>>,
    fail_publish: Mutex<bool>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_checksum(self, api_id: &str, checksum: &str) -> Self {
        self.checksums
            .lock()
            .await
            .insert(api_id.to_string(), checksum.to_string());
        self
    }

    pub async fn with_instances(self, instances: Vec<InstanceRef>) -> Self {
        *self.instances.lock().await = instances;
        self
    }

    pub async fn with_pending(self, requests: Vec<SubscriptionRequest>) -> Self {
        *self.pending.lock().await = requests;
        self
    }

    /// Queue a request for the next `pending_subscriptions` call.
    pub async fn push_pending(&self, request: SubscriptionRequest) {
        self.pending.lock().await.push(request);
    }

    pub async fn failing_publish(self) -> Self {
        *self.fail_publish.lock().await = true;
        self
    }

    pub async fn published(&self) -> Vec<ServiceBody> {
        self.published.lock().await.clone()
    }

    pub async fn updates(&self) -> Vec<StateUpdate> {
        self.updates.lock().await.clone()
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn published_checksum(&self, external_api_id: &str) -> Result<Option<String>> {
        Ok(self.checksums.lock().await.get(external_api_id).cloned())
    }

    async fn publish(&self, body: &ServiceBody) -> Result<()> {
        if *self.fail_publish.lock().await {
            return Err(Error::Other("publish rejected".into()));
        }
        if let Some(checksum) = body.checksum() {
            self.checksums
                .lock()
                .await
                .insert(body.external_api_id.clone(), checksum.to_string());
        }
        self.published.lock().await.push(body.clone());
        Ok(())
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRef>> {
        Ok(self.instances.lock().await.clone())
    }

    async fn pending_subscriptions(&self) -> Result<Vec<SubscriptionRequest>> {
        Ok(std::mem::take(&mut *self.pending.lock().await))
    }

    async fn update_subscription(
        &self,
        id: &str,
        state: SubscriptionState,
        message: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.updates.lock().await.push(StateUpdate {
            id: id.to_string(),
            state,
            message: message.to_string(),
            properties: properties.clone(),
        });
        Ok(())
    }
}

/// Sink that keeps everything it receives
#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TransportEvent>>>,
    metrics: Arc<Mutex<Vec<MetricEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().await.clone()
    }

    pub async fn metrics(&self) -> Vec<MetricEvent> {
        self.metrics.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send_events(&self, events: Vec<TransportEvent>) -> Result<()> {
        self.events.lock().await.extend(events);
        Ok(())
    }

    async fn send_metrics(&self, metrics: Vec<MetricEvent>) -> Result<()> {
        self.metrics.lock().await.extend(metrics);
        Ok(())
    }
}
