//! Mock Anypoint client for testing
//!
//! Provides an in-memory implementation of the API traits for unit testing
//! without making real API calls.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use super::api::{AccountApi, AnalyticsApi, ApiManagerApi, ExchangeApi, Icon};
use super::models::{
    AnalyticsEvent, AppRequestBody, Application, ArchiveDescriptor, ArchiveFile, Asset, AssetPage,
    Contract, ContractRequest, Environment, ExchangeAsset, InfluxDataSource, MonitoringMetric,
    Policy, Tier, User,
};
use super::pagination::PageParams;
use crate::error::{ApiError, Result};

/// Mock API client for testing.
///
/// Configure responses via builder methods, then use in tests.
///
/// # Example
/// ```ignore
/// let mock = MockAnypointClient::new()
///     .with_assets(vec![AssetBuilder::new(1, "petstore").build()])
///     .await;
///
/// let page = mock.list_assets(&PageParams::new(50)).await?;
/// assert_eq!(page.assets.len(), 1);
/// ```
#[derive(Default)]
pub struct MockAnypointClient {
    assets: Arc<Mutex<Vec<Asset>>>,
    policies: Arc<Mutex<HashMap<i64, Vec<Policy>>>>,
    tiers: Arc<Mutex<HashMap<i64, Vec<Tier>>>>,
    /// Keyed by `group/asset/version`
    exchange_assets: Arc<Mutex<HashMap<String, ExchangeAsset>>>,
    /// File bytes keyed by link
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    icons: Arc<Mutex<HashMap<String, Icon>>>,
    applications: Arc<Mutex<HashMap<i64, Application>>>,
    next_id: Arc<Mutex<i64>>,
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
    /// Archive descriptors keyed by `(api_id, day)`
    archives: Arc<Mutex<HashMap<(String, NaiveDate), ArchiveDescriptor>>>,
    archive_files: Arc<Mutex<HashMap<String, Vec<MonitoringMetric>>>>,
    /// Days whose archive listing answers 404
    missing_archives: Arc<Mutex<HashSet<(String, NaiveDate)>>>,
    /// Live metrics keyed by API ID
    live_metrics: Arc<Mutex<HashMap<String, Vec<MonitoringMetric>>>>,
    /// Error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Methods that always fail
    failing: Arc<Mutex<HashSet<&'static str>>>,
    call_count: Arc<Mutex<CallCounts>>,
    captured_requests: Arc<Mutex<Vec<CapturedRequest>>>,
    /// Delay applied to every call
    latency: Option<Duration>,
}

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub current_user: usize,
    pub list_assets: usize,
    pub get_policies: usize,
    pub get_tiers: usize,
    pub delete_contract: usize,
    pub get_exchange_asset: usize,
    pub get_file: usize,
    pub get_icon: usize,
    pub create_application: usize,
    pub get_application: usize,
    pub delete_application: usize,
    pub create_contract: usize,
    pub get_events: usize,
    pub list_archive: usize,
    pub get_archive_metrics: usize,
    pub boot_data: usize,
    pub query_metrics: usize,
}

impl CallCounts {
    /// Get total number of API calls made.
    pub fn total(&self) -> usize {
        self.current_user
            + self.list_assets
            + self.get_policies
            + self.get_tiers
            + self.delete_contract
            + self.get_exchange_asset
            + self.get_file
            + self.get_icon
            + self.create_application
            + self.get_application
            + self.delete_application
            + self.create_contract
            + self.get_events
            + self.list_archive
            + self.get_archive_metrics
            + self.boot_data
            + self.query_metrics
    }
}

/// A captured write request for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedRequest {
    CreateApplication { api_id: String, name: String },
    DeleteApplication { app_id: i64 },
    CreateContract { app_id: i64, contract: ContractRequest },
    DeleteContract { api_id: i64, contract_id: i64 },
    Events { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl MockAnypointClient {
    /// Create a new mock client with default (empty) responses.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_assets(self, assets: Vec<Asset>) -> Self {
        *self.assets.lock().await = assets;
        self
    }

    pub async fn with_policies(self, api_id: i64, policies: Vec<Policy>) -> Self {
        self.policies.lock().await.insert(api_id, policies);
        self
    }

    pub async fn with_tiers(self, api_id: i64, tiers: Vec<Tier>) -> Self {
        self.tiers.lock().await.insert(api_id, tiers);
        self
    }

    pub async fn with_exchange_asset(self, asset: ExchangeAsset) -> Self {
        let key = format!("{}/{}/{}", asset.group_id, asset.asset_id, asset.version);
        self.exchange_assets.lock().await.insert(key, asset);
        self
    }

    pub async fn with_file(self, link: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.lock().await.insert(link.into(), contents.into());
        self
    }

    pub async fn with_icon(self, url: impl Into<String>, icon: Icon) -> Self {
        self.icons.lock().await.insert(url.into(), icon);
        self
    }

    pub async fn with_application(self, app: Application) -> Self {
        self.applications.lock().await.insert(app.id, app);
        self
    }

    pub async fn with_events(self, events: Vec<AnalyticsEvent>) -> Self {
        *self.events.lock().await = events;
        self
    }

    /// Register one archived file for an API and day.
    pub async fn with_archive_file(
        self,
        api_id: &str,
        day: NaiveDate,
        file_id: &str,
        metrics: Vec<MonitoringMetric>,
    ) -> Self {
        self.archives
            .lock()
            .await
            .entry((api_id.to_string(), day))
            .or_default()
            .resources
            .push(ArchiveFile {
                id: file_id.to_string(),
                time: None,
                size: None,
            });
        self.archive_files
            .lock()
            .await
            .insert(file_id.to_string(), metrics);
        self
    }

    /// Make the archive listing for an API and day answer 404.
    pub async fn with_missing_archive(self, api_id: &str, day: NaiveDate) -> Self {
        self.missing_archives
            .lock()
            .await
            .insert((api_id.to_string(), day));
        self
    }

    pub async fn with_live_metrics(self, api_id: &str, metrics: Vec<MonitoringMetric>) -> Self {
        self.live_metrics
            .lock()
            .await
            .insert(api_id.to_string(), metrics);
        self
    }

    /// Configure an error to return on the next API call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Make every call to `method` fail with an unexpected response.
    pub async fn failing(self, method: &'static str) -> Self {
        self.failing.lock().await.insert(method);
        self
    }

    /// Delay every call, so concurrent callers interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get the call counts for verification in tests.
    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    /// Get all captured write requests.
    pub async fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.captured_requests.lock().await.clone()
    }

    /// Applications currently known to the mock.
    pub async fn applications(&self) -> Vec<Application> {
        self.applications.lock().await.values().cloned().collect()
    }

    /// Check if there's a pending error and consume it.
    async fn check_error(&self, method: &'static str) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }
        if self.failing.lock().await.contains(method) {
            return Err(ApiError::UnexpectedResponse {
                status: 500,
                body: format!("{} failed", method),
            }
            .into());
        }
        Ok(())
    }

    async fn capture(&self, request: CapturedRequest) {
        self.captured_requests.lock().await.push(request);
    }

    async fn next_id(&self) -> i64 {
        let mut next = self.next_id.lock().await;
        *next += 1;
        1000 + *next
    }
}

// ============================================================================
// AccountApi Implementation
// ============================================================================

#[async_trait]
impl AccountApi for MockAnypointClient {
    async fn current_user(&self) -> Result<User> {
        self.call_count.lock().await.current_user += 1;
        self.check_error("current_user").await?;
        Ok(User {
            id: "mock-user".into(),
            username: "mock".into(),
            ..User::default()
        })
    }

    async fn find_environment(&self, name: &str) -> Result<Environment> {
        self.check_error("find_environment").await?;
        Ok(Environment {
            id: format!("env-{}", name.to_lowercase()),
            name: name.to_string(),
            organization_id: "mock-org".into(),
            is_production: false,
            env_type: None,
        })
    }
}

// ============================================================================
// ApiManagerApi Implementation
// ============================================================================

#[async_trait]
impl ApiManagerApi for MockAnypointClient {
    async fn list_assets(&self, page: &PageParams) -> Result<AssetPage> {
        self.call_count.lock().await.list_assets += 1;
        self.check_error("list_assets").await?;

        let assets = self.assets.lock().await;
        let slice: Vec<Asset> = assets
            .iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();
        Ok(AssetPage {
            total: assets.len() as i64,
            assets: slice,
        })
    }

    async fn get_policies(&self, api_id: i64) -> Result<Vec<Policy>> {
        self.call_count.lock().await.get_policies += 1;
        self.check_error("get_policies").await?;
        Ok(self
            .policies
            .lock()
            .await
            .get(&api_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_tiers(&self, api_id: i64) -> Result<Vec<Tier>> {
        self.call_count.lock().await.get_tiers += 1;
        self.check_error("get_tiers").await?;
        Ok(self
            .tiers
            .lock()
            .await
            .get(&api_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_contract(&self, api_id: i64, contract_id: i64) -> Result<()> {
        self.call_count.lock().await.delete_contract += 1;
        self.capture(CapturedRequest::DeleteContract {
            api_id,
            contract_id,
        })
        .await;
        self.check_error("delete_contract").await
    }
}

// ============================================================================
// ExchangeApi Implementation
// ============================================================================

#[async_trait]
impl ExchangeApi for MockAnypointClient {
    async fn get_exchange_asset(
        &self,
        group_id: &str,
        asset_id: &str,
        asset_version: &str,
    ) -> Result<ExchangeAsset> {
        self.call_count.lock().await.get_exchange_asset += 1;
        self.check_error("get_exchange_asset").await?;

        let key = format!("{}/{}/{}", group_id, asset_id, asset_version);
        self.exchange_assets
            .lock()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(key).into())
    }

    async fn get_exchange_file_content(
        &self,
        link: &str,
        _packaging: &str,
        _main_file: &str,
    ) -> Result<Vec<u8>> {
        self.call_count.lock().await.get_file += 1;
        self.check_error("get_exchange_file_content").await?;
        self.files
            .lock()
            .await
            .get(link)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(link.to_string()).into())
    }

    async fn get_exchange_asset_icon(&self, icon_url: &str) -> Result<Option<Icon>> {
        self.call_count.lock().await.get_icon += 1;
        self.check_error("get_exchange_asset_icon").await?;
        if icon_url.is_empty() {
            return Ok(None);
        }
        Ok(self.icons.lock().await.get(icon_url).cloned())
    }

    async fn create_client_application(
        &self,
        api_id: &str,
        body: &AppRequestBody,
    ) -> Result<Application> {
        self.call_count.lock().await.create_application += 1;
        self.capture(CapturedRequest::CreateApplication {
            api_id: api_id.to_string(),
            name: body.name.clone(),
        })
        .await;
        self.check_error("create_client_application").await?;

        let id = self.next_id().await;
        let app = Application {
            id,
            name: body.name.clone(),
            description: Some(body.description.clone()),
            client_id: format!("client-{}", id),
            client_secret: format!("secret-{}", id),
        };
        self.applications.lock().await.insert(id, app.clone());
        Ok(app)
    }

    async fn get_client_application(&self, app_id: &str) -> Result<Application> {
        self.call_count.lock().await.get_application += 1;
        self.check_error("get_client_application").await?;

        let id: i64 = app_id
            .parse()
            .map_err(|_| ApiError::NotFound(app_id.to_string()))?;
        self.applications
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(app_id.to_string()).into())
    }

    async fn delete_client_application(&self, app_id: i64) -> Result<()> {
        self.call_count.lock().await.delete_application += 1;
        self.capture(CapturedRequest::DeleteApplication { app_id })
            .await;
        self.check_error("delete_client_application").await?;
        self.applications.lock().await.remove(&app_id);
        Ok(())
    }

    async fn create_contract(&self, app_id: i64, contract: &ContractRequest) -> Result<Contract> {
        self.call_count.lock().await.create_contract += 1;
        self.capture(CapturedRequest::CreateContract {
            app_id,
            contract: contract.clone(),
        })
        .await;
        self.check_error("create_contract").await?;

        Ok(Contract {
            id: self.next_id().await,
            status: Some("APPROVED".into()),
            application_id: Some(app_id),
            api_id: Some(contract.api_id),
        })
    }
}

// ============================================================================
// AnalyticsApi Implementation
// ============================================================================

#[async_trait]
impl AnalyticsApi for MockAnypointClient {
    async fn get_analytics_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsEvent>> {
        self.call_count.lock().await.get_events += 1;
        self.capture(CapturedRequest::Events { start, end }).await;
        self.check_error("get_analytics_window").await?;

        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect())
    }

    async fn list_archive(&self, api_id: &str, day: NaiveDate) -> Result<ArchiveDescriptor> {
        self.call_count.lock().await.list_archive += 1;
        self.check_error("list_archive").await?;
        let key = (api_id.to_string(), day);
        if self.missing_archives.lock().await.contains(&key) {
            return Err(ApiError::NotFound(format!("archive {} {}", api_id, day)).into());
        }
        Ok(self
            .archives
            .lock()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_archive_metrics(
        &self,
        _api_id: &str,
        _day: NaiveDate,
        file_id: &str,
    ) -> Result<Vec<MonitoringMetric>> {
        self.call_count.lock().await.get_archive_metrics += 1;
        self.check_error("get_archive_metrics").await?;
        Ok(self
            .archive_files
            .lock()
            .await
            .get(file_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_monitoring_boot_data(&self) -> Result<InfluxDataSource> {
        self.call_count.lock().await.boot_data += 1;
        self.check_error("get_monitoring_boot_data").await?;
        Ok(InfluxDataSource {
            id: "1".into(),
            database: "dias".into(),
        })
    }

    async fn query_metrics(
        &self,
        _source: &InfluxDataSource,
        api_id: &str,
        _api_version_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonitoringMetric>> {
        self.call_count.lock().await.query_metrics += 1;
        self.check_error("query_metrics").await?;
        Ok(self
            .live_metrics
            .lock()
            .await
            .get(api_id)
            .map(|metrics| {
                metrics
                    .iter()
                    .filter(|m| m.time >= start && m.time < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fixtures::AssetBuilder;

    #[tokio::test]
    async fn test_list_assets_pages() {
        let mock = MockAnypointClient::new()
            .with_assets(
                (1..=3)
                    .map(|i| AssetBuilder::new(i, format!("asset-{}", i)).build())
                    .collect(),
            )
            .await;

        let first = mock.list_assets(&PageParams::new(2)).await.unwrap();
        assert_eq!(first.assets.len(), 2);
        let second = mock
            .list_assets(&PageParams::new(2).offset(2))
            .await
            .unwrap();
        assert_eq!(second.assets.len(), 1);
        assert_eq!(mock.call_counts().await.list_assets, 2);
    }

    #[tokio::test]
    async fn test_error_is_consumed() {
        let mock = MockAnypointClient::new()
            .with_error(ApiError::Transport("boom".into()))
            .await;

        assert!(mock.current_user().await.is_err());
        assert!(mock.current_user().await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_method_keeps_failing() {
        let mock = MockAnypointClient::new()
            .failing("delete_client_application")
            .await;

        assert!(mock.delete_client_application(1).await.is_err());
        assert!(mock.delete_client_application(1).await.is_err());
        assert_eq!(mock.captured_requests().await.len(), 2);
    }
}
