//! Analytics and monitoring trait

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::client::models::{
    AnalyticsEvent, ArchiveDescriptor, InfluxDataSource, MonitoringMetric,
};
use crate::error::Result;

/// Traffic telemetry operations
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// Raw analytics events in `[start, end)`
    async fn get_analytics_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsEvent>>;

    /// Archived summary files for one API and day
    async fn list_archive(&self, api_id: &str, day: NaiveDate) -> Result<ArchiveDescriptor>;

    /// Parsed metrics of one archived summary file
    async fn get_archive_metrics(
        &self,
        api_id: &str,
        day: NaiveDate,
        file_id: &str,
    ) -> Result<Vec<MonitoringMetric>>;

    /// Data source used by the live metric query
    async fn get_monitoring_boot_data(&self) -> Result<InfluxDataSource>;

    /// Live metric buckets in `[start, end)`
    async fn query_metrics(
        &self,
        source: &InfluxDataSource,
        api_id: &str,
        api_version_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonitoringMetric>>;
}
