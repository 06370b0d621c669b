//! Discovery agent: periodic asset enumeration feeding the publisher

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::cache::DiscoveryCache;
use super::handler::ServiceHandler;
use super::publisher::Publisher;
use super::service::ServiceDetail;
use crate::central::Catalog;
use crate::client::{AnypointApi, PageParams, for_each_page};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::job::{Job, JobHandle, JobStatus, spawn_periodic};
use crate::subscription::guard::DuplicateGuard;
use crate::subscription::handler::AppCache;
use crate::subscription::{HandlerRegistry, Provisioner, SubscriptionManager};

/// One discovery cycle per tick
pub struct DiscoveryJob {
    client: Arc<dyn AnypointApi>,
    handler: ServiceHandler,
    cache: Arc<DiscoveryCache>,
    subscriptions: Option<Arc<SubscriptionManager>>,
    page_size: usize,
    tx: mpsc::Sender<ServiceDetail>,
}

impl DiscoveryJob {
    /// Page through every asset and send the resulting services on `tx`.
    ///
    /// The cache snapshot is replaced only when paging completes.
    pub async fn discover(&self) -> Result<usize> {
        self.cache.begin_cycle();

        let client = &self.client;
        let handler = &self.handler;
        let tx = &self.tx;
        let seen = for_each_page(
            PageParams::new(self.page_size),
            |page| async move { client.list_assets(&page).await.map(|p| p.assets) },
            |assets| async move {
                for asset in assets {
                    for detail in handler.process_asset(&asset).await {
                        if tx.send(detail).await.is_err() {
                            warn!("Service channel closed, dropping discovered api");
                        }
                    }
                }
            },
        )
        .await?;

        self.cache.commit();
        debug!("Discovery cycle saw {} assets", seen);
        Ok(seen)
    }
}

#[async_trait]
impl Job for DiscoveryJob {
    fn name(&self) -> &str {
        "discovery"
    }

    async fn execute(&self) -> Result<()> {
        self.discover().await?;
        if let Some(subscriptions) = &self.subscriptions
            && let Err(e) = subscriptions.poll().await
        {
            warn!("Could not poll subscriptions: {}", e);
        }
        Ok(())
    }
}

struct Running {
    job: JobHandle,
    publisher: Publisher,
}

/// Owns the discovery loop and the publisher loop
pub struct DiscoveryAgent {
    config: AgentConfig,
    client: Arc<dyn AnypointApi>,
    catalog: Arc<dyn Catalog>,
    cache: Arc<DiscoveryCache>,
    registry: Arc<HandlerRegistry>,
    apps: Arc<AppCache>,
    guard: Arc<DuplicateGuard>,
    running: Option<Running>,
}

impl DiscoveryAgent {
    pub fn new(config: AgentConfig, client: Arc<dyn AnypointApi>, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            config,
            client,
            catalog,
            cache: Arc::new(DiscoveryCache::new()),
            registry: Arc::new(HandlerRegistry::default()),
            apps: Arc::new(AppCache::new()),
            guard: DuplicateGuard::new(),
            running: None,
        }
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    pub fn apps(&self) -> &Arc<AppCache> {
        &self.apps
    }

    /// Provisioning operations over the same client and discovery cache.
    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(
            self.client.clone(),
            self.cache.clone(),
            self.config.mulesoft.environment.clone(),
        )
    }

    fn handler(&self) -> ServiceHandler {
        ServiceHandler::new(
            self.client.clone(),
            self.catalog.clone(),
            self.cache.clone(),
            self.registry.clone(),
            &self.config.mulesoft,
        )
    }

    fn job(&self, tx: mpsc::Sender<ServiceDetail>, subscriptions: bool) -> DiscoveryJob {
        let subscriptions = subscriptions.then(|| {
            Arc::new(SubscriptionManager::new(
                self.client.clone(),
                self.catalog.clone(),
                self.cache.clone(),
                self.registry.clone(),
                self.config.mulesoft.environment.clone(),
            )
            .with_shared(self.apps.clone(), self.guard.clone()))
        });
        DiscoveryJob {
            client: self.client.clone(),
            handler: self.handler(),
            cache: self.cache.clone(),
            subscriptions,
            page_size: self.config.mulesoft.page_size,
            tx,
        }
    }

    /// Start the discovery and publisher loops. No-op when already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel(self.config.mulesoft.channel_capacity);
        let publisher = Publisher::spawn(self.catalog.clone(), rx);
        let job = spawn_periodic(
            Arc::new(self.job(tx, true)),
            self.config.mulesoft.poll_interval,
        );
        info!(
            "Discovery started for environment {}",
            self.config.mulesoft.environment
        );
        self.running = Some(Running { job, publisher });
    }

    /// Stop both loops and wait for in-flight publishes.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.job.stop().await;
            let published = running.publisher.join().await;
            info!("Discovery stopped after publishing {} services", published);
        }
    }

    /// Restart with new configuration, client and catalog. The discovery
    /// cache and subscription bookkeeping carry over.
    pub async fn on_config_change(
        &mut self,
        config: AgentConfig,
        client: Arc<dyn AnypointApi>,
        catalog: Arc<dyn Catalog>,
    ) {
        let was_running = self.running.is_some();
        self.stop().await;
        self.config = config;
        self.client = client;
        self.catalog = catalog;
        if was_running {
            self.start();
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.running.as_ref().map(|r| r.job.status())
    }

    /// Run a single discovery cycle and collect the services instead of
    /// publishing them.
    pub async fn preview(&self) -> Result<Vec<ServiceDetail>> {
        let (tx, mut rx) = mpsc::channel(self.config.mulesoft.channel_capacity);
        let job = self.job(tx, false);
        let collector = tokio::spawn(async move {
            let mut details = Vec::new();
            while let Some(detail) = rx.recv().await {
                details.push(detail);
            }
            details
        });

        let result = job.discover().await;
        drop(job);
        let details = collector.await.unwrap_or_default();
        result.map(|_| details)
    }
}
