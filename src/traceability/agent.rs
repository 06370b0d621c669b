//! Traceability agent: analytics events and metrics on a shared interval

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::emitter::{MetricBatcher, MetricEmitter, MetricSource};
use super::mapper::EventMapper;
use super::processor::EventProcessor;
use super::watermark::Watermarks;
use crate::central::{Catalog, EventSink};
use crate::client::AnypointApi;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::job::{Job, JobHandle, JobStatus, spawn_periodic};

const TARGET_FLOW: (&str, &str) = ("axway-target-flow", "api-central-v8");

/// Pulls the analytics window `[LAST_RUN, now)` and ships it as transport
/// events
pub struct EventsJob {
    client: Arc<dyn AnypointApi>,
    processor: EventProcessor,
    sink: Arc<dyn EventSink>,
    watermarks: Arc<Watermarks>,
}

impl EventsJob {
    pub fn new(
        client: Arc<dyn AnypointApi>,
        processor: EventProcessor,
        sink: Arc<dyn EventSink>,
        watermarks: Arc<Watermarks>,
    ) -> Self {
        Self {
            client,
            processor,
            sink,
            watermarks,
        }
    }

    /// Collect the window ending at `now`. Returns the number of transport
    /// events sent.
    pub async fn collect(&self, now: DateTime<Utc>) -> Result<usize> {
        let Some(start) = self.watermarks.global() else {
            self.watermarks.advance_global(now);
            self.watermarks.persist()?;
            debug!("Analytics collection starts at {}", now);
            return Ok(0);
        };
        if start >= now {
            return Ok(0);
        }

        let events = self.client.get_analytics_window(start, now).await?;
        let mut transport = Vec::with_capacity(events.len() * 3);
        for event in &events {
            transport.extend(self.processor.process_event(event).await);
        }
        let sent = transport.len();
        self.sink.send_events(transport).await?;

        self.watermarks.advance_global(now);
        if let Err(e) = self.watermarks.persist() {
            warn!("Could not persist watermarks: {}", e);
        }
        if sent > 0 {
            info!("Sent {} transport events for {} requests", sent, events.len());
        }
        Ok(sent)
    }
}

#[async_trait]
impl Job for EventsJob {
    fn name(&self) -> &str {
        "traceability-events"
    }

    async fn execute(&self) -> Result<()> {
        self.collect(Utc::now()).await.map(|_| ())
    }
}

pub struct MetricsJob {
    emitter: MetricEmitter,
}

#[async_trait]
impl Job for MetricsJob {
    fn name(&self) -> &str {
        "traceability-metrics"
    }

    async fn execute(&self) -> Result<()> {
        self.emitter.emit(Utc::now()).await.map(|_| ())
    }
}

struct Running {
    events: Option<JobHandle>,
    metrics: Option<JobHandle>,
    batcher: Option<JoinHandle<usize>>,
}

pub struct TraceabilityAgent {
    config: AgentConfig,
    client: Arc<dyn AnypointApi>,
    catalog: Arc<dyn Catalog>,
    sink: Arc<dyn EventSink>,
    watermarks: Arc<Watermarks>,
    running: Option<Running>,
}

impl TraceabilityAgent {
    pub fn new(
        config: AgentConfig,
        client: Arc<dyn AnypointApi>,
        catalog: Arc<dyn Catalog>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let watermarks = Arc::new(Watermarks::load(config.mulesoft.cache_file()));
        Self {
            config,
            client,
            catalog,
            sink,
            watermarks,
            running: None,
        }
    }

    pub fn watermarks(&self) -> &Arc<Watermarks> {
        &self.watermarks
    }

    fn events_job(&self) -> EventsJob {
        let mapper = EventMapper::new(
            self.client.clone(),
            self.config.central.environment.clone(),
            self.config.mulesoft.environment.clone(),
            self.config.central.team_id.clone(),
        );
        let fields = BTreeMap::from([(TARGET_FLOW.0.to_string(), TARGET_FLOW.1.to_string())]);
        EventsJob::new(
            self.client.clone(),
            EventProcessor::new(mapper, fields),
            self.sink.clone(),
            self.watermarks.clone(),
        )
    }

    /// Start the enabled collectors. No-op when already running.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let period = self.config.mulesoft.poll_interval;
        let traceability = &self.config.traceability;

        let events = traceability
            .collect_events
            .then(|| spawn_periodic(Arc::new(self.events_job()), period));

        let (metrics, batcher) = if traceability.collect_metrics {
            let (tx, rx) = mpsc::channel(self.config.mulesoft.channel_capacity);
            let batcher = MetricBatcher::spawn(self.sink.clone(), rx);
            let emitter = MetricEmitter::new(
                self.client.clone(),
                self.catalog.clone(),
                self.watermarks.clone(),
                MetricSource::from_config(self.config.mulesoft.use_monitoring_api),
                tx,
            );
            (
                Some(spawn_periodic(Arc::new(MetricsJob { emitter }), period)),
                Some(batcher),
            )
        } else {
            (None, None)
        };

        info!(
            "Traceability started (events: {}, metrics: {})",
            events.is_some(),
            metrics.is_some()
        );
        self.running = Some(Running {
            events,
            metrics,
            batcher,
        });
    }

    /// Stop the collectors and wait for the last metric batch.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        if let Some(job) = running.events {
            job.stop().await;
        }
        if let Some(job) = running.metrics {
            job.stop().await;
        }
        if let Some(batcher) = running.batcher {
            match batcher.await {
                Ok(flushed) => debug!("Metric batcher flushed {} metrics", flushed),
                Err(e) => warn!("Metric batcher ended abnormally: {}", e),
            }
        }
        info!("Traceability stopped");
    }

    /// Restart with new configuration and collaborators. Watermarks are
    /// reloaded when the cache file moved.
    pub async fn on_config_change(
        &mut self,
        config: AgentConfig,
        client: Arc<dyn AnypointApi>,
        catalog: Arc<dyn Catalog>,
        sink: Arc<dyn EventSink>,
    ) {
        let was_running = self.running.is_some();
        self.stop().await;
        if config.mulesoft.cache_file() != self.config.mulesoft.cache_file() {
            info!("Loading watermarks from {}", config.mulesoft.cache_file().display());
            self.watermarks = Arc::new(Watermarks::load(config.mulesoft.cache_file()));
        }
        self.config = config;
        self.client = client;
        self.catalog = catalog;
        self.sink = sink;
        if was_running {
            self.start();
        }
    }

    /// Worst status across the running collectors
    pub fn status(&self) -> Option<JobStatus> {
        let running = self.running.as_ref()?;
        let statuses: Vec<JobStatus> = [&running.events, &running.metrics]
            .into_iter()
            .flatten()
            .map(JobHandle::status)
            .collect();
        if statuses.contains(&JobStatus::Failed) {
            Some(JobStatus::Failed)
        } else if statuses.is_empty() {
            Some(JobStatus::Stopped)
        } else {
            Some(JobStatus::Running)
        }
    }
}
