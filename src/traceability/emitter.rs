//! Per-API metric collection
//!
//! Each cycle is framed on the metric channel as `Initialize`, any number of
//! `Metric` messages, then `Completed`. The batcher on the other end flushes
//! a cycle to the sink only once it is complete.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::watermark::Watermarks;
use crate::central::events::MetricEvent;
use crate::central::{Catalog, EventSink, InstanceRef};
use crate::client::AnypointApi;
use crate::client::models::{InfluxDataSource, MonitoringMetric};
use crate::error::{ApiError, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum MetricMessage {
    Initialize,
    Metric(MetricEvent),
    Completed,
}

/// Where buckets are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// Archived daily summary files
    Archive,
    /// Live metric query
    Live,
}

impl MetricSource {
    pub fn from_config(use_monitoring_api: bool) -> Self {
        if use_monitoring_api {
            MetricSource::Archive
        } else {
            MetricSource::Live
        }
    }
}

/// Collects buckets newer than each API's watermark
pub struct MetricEmitter {
    client: Arc<dyn AnypointApi>,
    catalog: Arc<dyn Catalog>,
    watermarks: Arc<Watermarks>,
    source: MetricSource,
    tx: mpsc::Sender<MetricMessage>,
}

impl MetricEmitter {
    pub fn new(
        client: Arc<dyn AnypointApi>,
        catalog: Arc<dyn Catalog>,
        watermarks: Arc<Watermarks>,
        source: MetricSource,
        tx: mpsc::Sender<MetricMessage>,
    ) -> Self {
        Self {
            client,
            catalog,
            watermarks,
            source,
            tx,
        }
    }

    async fn send(&self, message: MetricMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| Error::Other("metric channel closed".into()))
    }

    /// Run one collection cycle ending at `now`. Returns the number of
    /// metric events sent.
    pub async fn emit(&self, now: DateTime<Utc>) -> Result<usize> {
        let instances = self.catalog.list_instances().await?;
        let influx = match self.source {
            MetricSource::Live => Some(self.client.get_monitoring_boot_data().await?),
            MetricSource::Archive => None,
        };

        self.send(MetricMessage::Initialize).await?;
        let mut sent = 0;
        for instance in &instances {
            let Some(api_id) = instance.api_id() else {
                debug!("Instance {} has no api id, skipping", instance.name);
                continue;
            };
            match self.emit_instance(instance, api_id, influx.as_ref(), now).await {
                Ok(count) => sent += count,
                Err(e) => warn!("Could not collect metrics for api {}: {}", api_id, e),
            }
        }
        self.send(MetricMessage::Completed).await?;

        if let Err(e) = self.watermarks.persist() {
            warn!("Could not persist watermarks: {}", e);
        }
        if sent > 0 {
            info!("Emitted {} metric events for {} instances", sent, instances.len());
        }
        Ok(sent)
    }

    async fn emit_instance(
        &self,
        instance: &InstanceRef,
        api_id: &str,
        influx: Option<&InfluxDataSource>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let Some(last_run) = self.watermarks.last_run(api_id) else {
            // first sight of this api: collect from now on
            self.watermarks.advance_api(api_id, now);
            return Ok(0);
        };

        let buckets = match influx {
            Some(source) => {
                self.client
                    .query_metrics(source, api_id, api_id, last_run, now)
                    .await?
            }
            None => self.archived(api_id, last_run.date_naive(), now.date_naive()).await?,
        };

        let mut latest = last_run;
        let mut sent = 0;
        for bucket in buckets.into_iter().filter(|b| b.time > last_run) {
            latest = latest.max(bucket.time);
            self.send(MetricMessage::Metric(metric_event(
                &bucket, api_id, instance, last_run, now,
            )))
            .await?;
            sent += 1;
        }
        self.watermarks.advance_api(api_id, latest);
        Ok(sent)
    }

    /// Buckets from every archived file between `first` and `last`.
    async fn archived(
        &self,
        api_id: &str,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<MonitoringMetric>> {
        let mut buckets = Vec::new();
        for day in first.iter_days().take_while(|d| *d <= last) {
            let descriptor = match self.client.list_archive(api_id, day).await {
                Ok(descriptor) => descriptor,
                Err(Error::Api(ApiError::NotFound(e))) => {
                    warn!("No archive for api {} on {}: {}", api_id, day, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            for file in &descriptor.resources {
                match self.client.get_archive_metrics(api_id, day, &file.id).await {
                    Ok(metrics) => buckets.extend(metrics),
                    Err(e) => warn!("Skipping archive file {} of api {}: {}", file.id, api_id, e),
                }
            }
        }
        Ok(buckets)
    }
}

fn metric_event(
    bucket: &MonitoringMetric,
    api_id: &str,
    instance: &InstanceRef,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> MetricEvent {
    MetricEvent {
        start_time: start,
        end_time: end,
        api_id: api_id.to_string(),
        instance: instance.name.clone(),
        status_code: bucket.status_code,
        count: bucket.count,
        max: bucket.response_time_max,
        min: bucket.response_time_min,
    }
}

/// Receiving end of the metric channel
pub struct MetricBatcher {
    sink: Arc<dyn EventSink>,
    pending: Vec<MetricEvent>,
    open: bool,
}

impl MetricBatcher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            pending: Vec::new(),
            open: false,
        }
    }

    /// Handle one message. Returns the number of metrics flushed.
    pub async fn receive(&mut self, message: MetricMessage) -> usize {
        match message {
            MetricMessage::Initialize => {
                if self.open && !self.pending.is_empty() {
                    warn!("Discarding {} metrics of an unfinished cycle", self.pending.len());
                }
                self.pending.clear();
                self.open = true;
                0
            }
            MetricMessage::Metric(metric) => {
                if self.open {
                    self.pending.push(metric);
                } else {
                    warn!("Metric for api {} outside a cycle, dropping", metric.api_id);
                }
                0
            }
            MetricMessage::Completed => {
                self.open = false;
                let batch = std::mem::take(&mut self.pending);
                let count = batch.len();
                if count == 0 {
                    return 0;
                }
                match self.sink.send_metrics(batch).await {
                    Ok(()) => count,
                    Err(e) => {
                        warn!("Could not send {} metrics: {}", count, e);
                        0
                    }
                }
            }
        }
    }

    /// Drain `rx` until every sender is gone.
    pub fn spawn(sink: Arc<dyn EventSink>, mut rx: mpsc::Receiver<MetricMessage>) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut batcher = MetricBatcher::new(sink);
            let mut flushed = 0;
            while let Some(message) = rx.recv().await {
                flushed += batcher.receive(message).await;
            }
            flushed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::central::mock::{MockCatalog, RecordingSink};
    use crate::client::MockAnypointClient;
    use crate::client::fixtures::metric;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn instance(api_id: &str) -> InstanceRef {
        InstanceRef {
            name: format!("petstore-{}", api_id),
            title: "Petstore".into(),
            agent_details: BTreeMap::from([("apiID".to_string(), api_id.to_string())]),
        }
    }

    struct Harness {
        emitter: MetricEmitter,
        rx: mpsc::Receiver<MetricMessage>,
        watermarks: Arc<Watermarks>,
        _dir: TempDir,
    }

    async fn harness(client: MockAnypointClient, source: MetricSource) -> Harness {
        let dir = TempDir::new().unwrap();
        let watermarks = Arc::new(Watermarks::load(dir.path().join("anypoint.cache")));
        let catalog = MockCatalog::new()
            .with_instances(vec![instance("111"), InstanceRef::default()])
            .await;
        let (tx, rx) = mpsc::channel(64);
        Harness {
            emitter: MetricEmitter::new(
                Arc::new(client),
                Arc::new(catalog),
                watermarks.clone(),
                source,
                tx,
            ),
            rx,
            watermarks,
            _dir: dir,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<MetricMessage>) -> Vec<MetricMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_first_cycle_seeds_watermark() {
        let client = MockAnypointClient::new()
            .with_live_metrics("111", vec![metric(at(1_000), 200, 5)])
            .await;
        let mut h = harness(client, MetricSource::Live).await;

        assert_eq!(h.emitter.emit(at(10_000)).await.unwrap(), 0);
        assert_eq!(h.watermarks.last_run("111"), Some(at(10_000)));
        assert_eq!(
            drain(&mut h.rx),
            vec![MetricMessage::Initialize, MetricMessage::Completed]
        );
    }

    #[tokio::test]
    async fn test_live_buckets_after_watermark() {
        let client = MockAnypointClient::new()
            .with_live_metrics(
                "111",
                vec![
                    metric(at(5_000), 200, 5),
                    metric(at(6_000), 200, 7),
                    metric(at(7_000), 500, 1),
                ],
            )
            .await;
        let mut h = harness(client, MetricSource::Live).await;
        h.watermarks.advance_api("111", at(5_000));

        assert_eq!(h.emitter.emit(at(10_000)).await.unwrap(), 2);
        let messages = drain(&mut h.rx);
        assert_eq!(messages.len(), 4);
        let MetricMessage::Metric(first) = &messages[1] else {
            panic!("expected a metric, got {:?}", messages[1]);
        };
        assert_eq!(first.api_id, "111");
        assert_eq!(first.instance, "petstore-111");
        assert_eq!(first.count, 7);
        assert_eq!(first.start_time, at(5_000));
        assert_eq!(first.end_time, at(10_000));
        assert_eq!(h.watermarks.last_run("111"), Some(at(7_000)));
    }

    #[tokio::test]
    async fn test_second_cycle_without_new_buckets_is_quiet() {
        let client = MockAnypointClient::new()
            .with_live_metrics("111", vec![metric(at(6_000), 200, 3)])
            .await;
        let mut h = harness(client, MetricSource::Live).await;
        h.watermarks.advance_api("111", at(1_000));

        assert_eq!(h.emitter.emit(at(10_000)).await.unwrap(), 1);
        assert_eq!(h.watermarks.last_run("111"), Some(at(6_000)));
        drain(&mut h.rx);

        assert_eq!(h.emitter.emit(at(20_000)).await.unwrap(), 0);
        assert_eq!(h.watermarks.last_run("111"), Some(at(6_000)));
        assert_eq!(
            drain(&mut h.rx),
            vec![MetricMessage::Initialize, MetricMessage::Completed]
        );
    }

    #[tokio::test]
    async fn test_archive_mode_reads_each_day() {
        let day1 = NaiveDate::from_ymd_opt(2021, 5, 18).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2021, 5, 19).unwrap();
        let t1 = day1.and_hms_opt(23, 0, 0).unwrap().and_utc();
        let t2 = day2.and_hms_opt(1, 0, 0).unwrap().and_utc();
        let client = MockAnypointClient::new()
            .with_archive_file("111", day1, "f1", vec![metric(t1, 200, 4)])
            .await
            .with_archive_file("111", day2, "f2", vec![metric(t2, 404, 2)])
            .await;
        let mut h = harness(client, MetricSource::Archive).await;
        h.watermarks.advance_api("111", t1 - chrono::Duration::minutes(30));

        let now = day2.and_hms_opt(2, 0, 0).unwrap().and_utc();
        assert_eq!(h.emitter.emit(now).await.unwrap(), 2);
        assert_eq!(h.watermarks.last_run("111"), Some(t2));
        assert_eq!(drain(&mut h.rx).len(), 4);
    }

    #[tokio::test]
    async fn test_archive_missing_day_is_skipped() {
        let day1 = NaiveDate::from_ymd_opt(2021, 5, 18).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2021, 5, 19).unwrap();
        let t2 = day2.and_hms_opt(1, 0, 0).unwrap().and_utc();
        let client = MockAnypointClient::new()
            .with_missing_archive("111", day1)
            .await
            .with_archive_file("111", day2, "f2", vec![metric(t2, 200, 3)])
            .await;
        let mut h = harness(client, MetricSource::Archive).await;
        h.watermarks
            .advance_api("111", day1.and_hms_opt(12, 0, 0).unwrap().and_utc());

        let now = day2.and_hms_opt(2, 0, 0).unwrap().and_utc();
        assert_eq!(h.emitter.emit(now).await.unwrap(), 1);
        assert_eq!(h.watermarks.last_run("111"), Some(t2));
        assert_eq!(drain(&mut h.rx).len(), 3);
    }

    #[tokio::test]
    async fn test_watermark_persisted_after_cycle() {
        let mut h = harness(MockAnypointClient::new(), MetricSource::Live).await;
        h.emitter.emit(at(10_000)).await.unwrap();
        drain(&mut h.rx);

        let reloaded = Watermarks::load(h.watermarks.path());
        assert_eq!(reloaded.last_run("111"), Some(at(10_000)));
    }

    #[tokio::test]
    async fn test_batcher_flushes_on_completed() {
        let sink = RecordingSink::new();
        let mut batcher = MetricBatcher::new(Arc::new(sink.clone()));
        let event = metric_event(&metric(at(1), 200, 1), "111", &instance("111"), at(0), at(2));

        assert_eq!(batcher.receive(MetricMessage::Metric(event.clone())).await, 0);
        batcher.receive(MetricMessage::Initialize).await;
        batcher.receive(MetricMessage::Metric(event.clone())).await;
        batcher.receive(MetricMessage::Metric(event.clone())).await;
        assert!(sink.metrics().await.is_empty());

        assert_eq!(batcher.receive(MetricMessage::Completed).await, 2);
        assert_eq!(sink.metrics().await, vec![event.clone(), event]);
    }

    #[tokio::test]
    async fn test_spawned_batcher_ends_with_channel() {
        let sink = RecordingSink::new();
        let (tx, rx) = mpsc::channel(8);
        let handle = MetricBatcher::spawn(Arc::new(sink.clone()), rx);
        let event = metric_event(&metric(at(1), 200, 1), "111", &instance("111"), at(0), at(2));

        tx.send(MetricMessage::Initialize).await.unwrap();
        tx.send(MetricMessage::Metric(event)).await.unwrap();
        tx.send(MetricMessage::Completed).await.unwrap();
        tx.send(MetricMessage::Initialize).await.unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(sink.metrics().await.len(), 1);
    }
}
