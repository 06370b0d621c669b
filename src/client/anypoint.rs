//! Anypoint platform client implementation

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::archive::extract_main_file;
use super::auth::{Authenticator, Login, TokenRefresher, TokenStore};
use super::models::{
    ANALYTICS_FIELDS, AnalyticsEvent, AppRequestBody, Application, ArchiveDescriptor, AssetPage,
    BootData, Contract, ContractRequest, Environment, ExchangeAsset, InfluxDataSource,
    InfluxResponse, MonitoringMetric, Policy, Tier, User, parse_summary_file,
};
use super::pagination::PageParams;
use super::rate_limit::{EndpointCategory, RateLimiterSet};
use super::{AccountApi, AnalyticsApi, ApiManagerApi, ExchangeApi, Icon};
use crate::config::MulesoftConfig;
use crate::error::{ApiError, Result};
use crate::health::{HealthCheck, HealthStatus};

/// Anypoint platform client
pub struct AnypointClient {
    http: HttpClient,
    base_url: String,
    environment_name: String,
    login: Arc<Login>,
    tokens: Arc<TokenStore>,
    environment: ArcSwapOption<Environment>,
    limiters: RateLimiterSet,
    refresher: Mutex<Option<TokenRefresher>>,
}

impl AnypointClient {
    /// Build the HTTP stack from configuration. No request is made.
    pub fn new(config: &MulesoftConfig) -> Result<Self> {
        let mut builder = HttpClient::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.ssl.insecure_skip_verify);

        if let Some(version) = config.ssl.min_version.as_deref() {
            builder = builder.min_tls_version(match version {
                "1.3" => reqwest::tls::Version::TLS_1_3,
                _ => reqwest::tls::Version::TLS_1_2,
            });
        }
        if let Some(proxy) = config.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ApiError::Transport(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let http = builder.build().map_err(ApiError::from)?;
        let base_url = config.anypoint_exchange_url.trim_end_matches('/').to_string();
        let login = Login::new(
            http.clone(),
            base_url.clone(),
            config.auth.credentials()?,
            config.org_name.clone(),
            config.auth.lifetime,
        );

        Ok(Self {
            http,
            base_url,
            environment_name: config.environment.clone(),
            login: Arc::new(login),
            tokens: Arc::new(TokenStore::new()),
            environment: ArcSwapOption::empty(),
            limiters: RateLimiterSet::new(),
            refresher: Mutex::new(None),
        })
    }

    /// Log in, resolve the configured environment and start the token refresher.
    pub async fn connect(&self) -> Result<()> {
        let snapshot = self.login.login().await?;
        let lifetime = snapshot.lifetime;
        info!(
            "Logged in to Anypoint as {} (org {})",
            snapshot.user.username, snapshot.org_id
        );
        self.tokens.publish(snapshot);

        let environment = self.find_environment(&self.environment_name).await?;
        debug!("Using environment {} ({})", environment.name, environment.id);
        self.environment.store(Some(Arc::new(environment)));

        let mut refresher = self.refresher.lock().await;
        if refresher.is_none() {
            *refresher = Some(TokenRefresher::spawn(
                self.login.clone(),
                self.tokens.clone(),
                lifetime,
            ));
        }
        Ok(())
    }

    /// Stop the token refresher
    pub async fn stop(&self) {
        if let Some(refresher) = self.refresher.lock().await.take() {
            refresher.stop().await;
        }
    }

    /// Current bearer token
    pub fn token(&self) -> Result<String> {
        self.tokens.token()
    }

    /// Business group the agent operates in
    pub fn org_id(&self) -> Result<String> {
        self.tokens.org_id()
    }

    /// Environment resolved during [`connect`](Self::connect)
    pub fn environment(&self) -> Result<Arc<Environment>> {
        self.environment
            .load_full()
            .ok_or_else(|| ApiError::Auth("environment not resolved".to_string()).into())
    }

    fn env_id(&self) -> Result<String> {
        Ok(self.environment()?.id.clone())
    }

    fn api_manager_path(&self) -> Result<String> {
        Ok(format!(
            "/apimanager/api/v1/organizations/{}/environments/{}/apis",
            self.org_id()?,
            self.env_id()?
        ))
    }

    fn category_of(&self, url: &str) -> EndpointCategory {
        url.strip_prefix(&self.base_url)
            .map(EndpointCategory::from_path)
            .unwrap_or(EndpointCategory::Default)
    }

    /// Send a request, re-authenticating once on 401.
    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<Response> {
        let category = self.category_of(url);
        let mut reauthenticated = false;

        loop {
            self.limiters.wait_for(category).await;

            let mut request = self.http.request(method.clone(), url).query(query);
            if authenticated {
                request = request.bearer_auth(self.tokens.token()?);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(ApiError::from)?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            match status {
                StatusCode::UNAUTHORIZED if authenticated && !reauthenticated => {
                    debug!("Got 401 from {}, re-authenticating", url);
                    let snapshot = self.login.login().await?;
                    self.tokens.publish(snapshot);
                    reauthenticated = true;
                }
                StatusCode::UNAUTHORIZED => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::Auth(body).into());
                }
                StatusCode::NOT_FOUND => {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Resource not found".to_string());
                    return Err(ApiError::NotFound(body).into());
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    self.limiters.activate(category);
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    warn!("Rate limited on {:?}, retry after {}s", category, retry_after);
                    return Err(
                        ApiError::RateLimit(std::time::Duration::from_secs(retry_after)).into(),
                    );
                }
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::UnexpectedResponse {
                        status: status.as_u16(),
                        body,
                    }
                    .into());
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send(Method::GET, &url, query, None, true).await?;
        parse_body(response).await
    }

    async fn post_json<B, T>(&self, path: &str, query: &[(&str, String)], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Marshal(e.to_string()))?;
        let url = format!("{}{}", self.base_url, path);
        let response = self.send(Method::POST, &url, query, Some(&body), true).await?;
        parse_body(response).await
    }

    async fn send_empty(&self, method: Method, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        self.send(method, &url, &[], None, true).await?;
        Ok(())
    }

    /// GET an absolute URL. Only links on the platform carry the bearer token.
    async fn get_link(&self, link: &str) -> Result<Response> {
        let authenticated = link.starts_with(&self.base_url);
        self.send(Method::GET, link, &[], None, authenticated).await
    }
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await.map_err(ApiError::from)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()).into())
}

/// Influx statement selecting one API version's buckets in `[start, end)`
pub fn metric_query(
    org_id: &str,
    env_id: &str,
    api_id: &str,
    api_version_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "SELECT sum(\"request_size.count\") as request_count, \
         max(\"response_time.max\") as response_max, \
         min(\"response_time.min\") as response_min \
         FROM \"rp_14d\".\"api_summary_metric\" \
         WHERE (\"org_id\" = '{}' AND \"env_id\" = '{}' AND \"api_id\" = '{}' AND \"api_version_id\" = '{}') \
         AND time >= {}ms AND time < {}ms \
         GROUP BY time(1m), \"response_code\" fill(none)",
        org_id,
        env_id,
        api_id,
        api_version_id,
        start.timestamp_millis(),
        end.timestamp_millis()
    )
}

#[async_trait]
impl AccountApi for AnypointClient {
    async fn current_user(&self) -> Result<User> {
        #[derive(Deserialize)]
        struct MeResponse {
            user: User,
        }
        let me: MeResponse = self.get_json("/accounts/api/me", &[]).await?;
        Ok(me.user)
    }

    async fn find_environment(&self, name: &str) -> Result<Environment> {
        #[derive(Deserialize)]
        struct EnvironmentList {
            #[serde(default)]
            data: Vec<Environment>,
        }

        let path = format!("/accounts/api/organizations/{}/environments", self.org_id()?);
        let list: EnvironmentList = self.get_json(&path, &[("name", name.to_string())]).await?;
        list.data
            .into_iter()
            .find(|env| env.name == name)
            .ok_or_else(|| ApiError::NotFound(format!("environment '{}'", name)).into())
    }
}

#[async_trait]
impl ApiManagerApi for AnypointClient {
    async fn list_assets(&self, page: &PageParams) -> Result<AssetPage> {
        let mut query = page.to_query_params();
        query.push(("ascending", "false".to_string()));

        let mut result: AssetPage = self.get_json(&self.api_manager_path()?, &query).await?;
        result.assets.truncate(page.limit);
        Ok(result)
    }

    async fn get_policies(&self, api_id: i64) -> Result<Vec<Policy>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PolicyResponse {
            List(Vec<Policy>),
            Wrapped { policies: Vec<Policy> },
        }

        let path = format!("{}/{}/policies", self.api_manager_path()?, api_id);
        let response: PolicyResponse = self.get_json(&path, &[]).await?;
        Ok(match response {
            PolicyResponse::List(policies) | PolicyResponse::Wrapped { policies } => policies,
        })
    }

    async fn get_tiers(&self, api_id: i64) -> Result<Vec<Tier>> {
        #[derive(Deserialize)]
        struct TierList {
            #[serde(default)]
            tiers: Vec<Tier>,
        }

        let path = format!("{}/{}/tiers", self.api_manager_path()?, api_id);
        let list: TierList = self.get_json(&path, &[]).await?;
        Ok(list.tiers)
    }

    async fn delete_contract(&self, api_id: i64, contract_id: i64) -> Result<()> {
        let path = format!(
            "{}/{}/contracts/{}",
            self.api_manager_path()?,
            api_id,
            contract_id
        );
        self.send_empty(Method::POST, &format!("{}/revoke", path)).await?;
        self.send_empty(Method::DELETE, &path).await
    }
}

#[async_trait]
impl ExchangeApi for AnypointClient {
    async fn get_exchange_asset(
        &self,
        group_id: &str,
        asset_id: &str,
        asset_version: &str,
    ) -> Result<ExchangeAsset> {
        let path = format!(
            "/exchange/api/v2/assets/{}/{}/{}",
            group_id, asset_id, asset_version
        );
        self.get_json(&path, &[]).await
    }

    async fn get_exchange_file_content(
        &self,
        link: &str,
        packaging: &str,
        main_file: &str,
    ) -> Result<Vec<u8>> {
        let response = self.get_link(link).await?;
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        if packaging == "zip" && !main_file.is_empty() {
            return extract_main_file(&bytes, main_file);
        }
        Ok(bytes.to_vec())
    }

    async fn get_exchange_asset_icon(&self, icon_url: &str) -> Result<Option<Icon>> {
        if icon_url.is_empty() {
            return Ok(None);
        }

        let response = self.get_link(icon_url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        Ok(Some(Icon {
            data: general_purpose::STANDARD.encode(&bytes),
            content_type,
        }))
    }

    async fn create_client_application(
        &self,
        api_id: &str,
        body: &AppRequestBody,
    ) -> Result<Application> {
        let path = format!("/exchange/api/v1/organizations/{}/applications", self.org_id()?);
        self.post_json(&path, &[("apiInstanceId", api_id.to_string())], body)
            .await
    }

    async fn get_client_application(&self, app_id: &str) -> Result<Application> {
        let path = format!(
            "/exchange/api/v2/organizations/{}/applications/{}",
            self.org_id()?,
            app_id
        );
        self.get_json(&path, &[]).await
    }

    async fn delete_client_application(&self, app_id: i64) -> Result<()> {
        let path = format!(
            "/exchange/api/v2/organizations/{}/applications/{}",
            self.org_id()?,
            app_id
        );
        self.send_empty(Method::DELETE, &path).await
    }

    async fn create_contract(&self, app_id: i64, contract: &ContractRequest) -> Result<Contract> {
        let path = format!(
            "/exchange/api/v1/organizations/{}/applications/{}/contracts",
            self.org_id()?,
            app_id
        );
        self.post_json(&path, &[], contract).await
    }
}

#[async_trait]
impl AnalyticsApi for AnypointClient {
    async fn get_analytics_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AnalyticsEvent>> {
        let path = format!(
            "/analytics/1.0/{}/environments/{}/events",
            self.org_id()?,
            self.env_id()?
        );
        let query = [
            ("format", "json".to_string()),
            ("startDate", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("endDate", end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("fields", ANALYTICS_FIELDS.to_string()),
        ];

        let url = format!("{}{}", self.base_url, path);
        let response = self.send(Method::GET, &url, &query, None, true).await?;
        let text = response.text().await.map_err(ApiError::from)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()).into())
    }

    async fn list_archive(&self, api_id: &str, day: NaiveDate) -> Result<ArchiveDescriptor> {
        let path = format!(
            "/monitoring/archive/api/v1/organizations/{}/environments/{}/apis/{}/summary/{}",
            self.org_id()?,
            self.env_id()?,
            api_id,
            day.format("%Y/%m/%d")
        );
        self.get_json(&path, &[]).await
    }

    async fn get_archive_metrics(
        &self,
        api_id: &str,
        day: NaiveDate,
        file_id: &str,
    ) -> Result<Vec<MonitoringMetric>> {
        let url = format!(
            "{}/monitoring/archive/api/v1/organizations/{}/environments/{}/apis/{}/summary/{}/{}",
            self.base_url,
            self.org_id()?,
            self.env_id()?,
            api_id,
            day.format("%Y/%m/%d"),
            file_id
        );
        let response = self.send(Method::GET, &url, &[], None, true).await?;
        let text = response.text().await.map_err(ApiError::from)?;
        Ok(parse_summary_file(&text))
    }

    async fn get_monitoring_boot_data(&self) -> Result<InfluxDataSource> {
        let boot: BootData = self
            .get_json("/monitoring/api/visualizer/api/bootdata", &[])
            .await?;
        Ok(boot.settings.datasources.influxdb)
    }

    async fn query_metrics(
        &self,
        source: &InfluxDataSource,
        api_id: &str,
        api_version_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MonitoringMetric>> {
        let path = format!(
            "/monitoring/api/visualizer/api/datasources/proxy/{}/query",
            source.id
        );
        let statement = metric_query(
            &self.org_id()?,
            &self.env_id()?,
            api_id,
            api_version_id,
            start,
            end,
        );
        let query = [
            ("db", source.database.clone()),
            ("q", statement),
            ("epoch", "ms".to_string()),
        ];
        let response: InfluxResponse = self.get_json(&path, &query).await?;
        Ok(response.into_metrics())
    }
}

#[async_trait]
impl HealthCheck for AnypointClient {
    fn name(&self) -> &str {
        "mulesoft"
    }

    async fn check(&self) -> HealthStatus {
        match self.current_user().await {
            Ok(_) => HealthStatus::Ok,
            Err(e) => HealthStatus::Fail(format!("failed to reach Anypoint: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use chrono::TimeZone;
    use mockito::{Matcher, Server, ServerGuard};

    fn config_for(server: &ServerGuard) -> MulesoftConfig {
        MulesoftConfig {
            anypoint_exchange_url: server.url(),
            environment: "Sandbox".into(),
            org_name: "Axway".into(),
            auth: AuthConfig {
                username: Some("agent".into()),
                password: Some("pw".into()),
                ..AuthConfig::default()
            },
            ..MulesoftConfig::default()
        }
    }

    async fn mock_login(server: &mut ServerGuard) {
        server
            .mock("POST", "/accounts/login")
            .with_status(200)
            .with_body(r#"{"access_token":"tok"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/accounts/api/me")
            .with_status(200)
            .with_body(r#"{"user":{"username":"agent","organization":{"id":"org-1","name":"Axway"}}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/accounts/api/organizations/org-1/environments")
            .match_query(Matcher::UrlEncoded("name".into(), "Sandbox".into()))
            .with_status(200)
            .with_body(r#"{"data":[{"id":"env-1","name":"Sandbox"}],"total":1}"#)
            .create_async()
            .await;
    }

    async fn connected(server: &mut ServerGuard) -> AnypointClient {
        mock_login(server).await;
        let client = AnypointClient::new(&config_for(server)).unwrap();
        client.connect().await.unwrap();
        client
    }

    #[test]
    fn test_client_requires_credentials() {
        let config = MulesoftConfig::default();
        assert!(AnypointClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_connect_resolves_environment() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        assert_eq!(client.org_id().unwrap(), "org-1");
        assert_eq!(client.environment().unwrap().id, "env-1");
        client.stop().await;
    }

    #[tokio::test]
    async fn test_list_assets_truncates_to_page() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let _assets = server
            .mock("GET", "/apimanager/api/v1/organizations/org-1/environments/env-1/apis")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("offset".into(), "0".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"total":2,"assets":[
                    {"id":1,"assetId":"a","groupId":"g","exchangeAssetName":"A","apis":[]},
                    {"id":2,"assetId":"b","groupId":"g","exchangeAssetName":"B","apis":[]}
                ]}"#,
            )
            .create_async()
            .await;

        let page = client.list_assets(&PageParams::new(1)).await.unwrap();
        assert_eq!(page.assets.len(), 1);
        assert_eq!(page.assets[0].asset_id, "a");
        client.stop().await;
    }

    #[tokio::test]
    async fn test_policies_accept_both_shapes() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let base = "/apimanager/api/v1/organizations/org-1/environments/env-1/apis";
        let _wrapped = server
            .mock("GET", format!("{}/10/policies", base).as_str())
            .with_status(200)
            .with_body(r#"{"policies":[{"id":1,"policyTemplateId":"client-id-enforcement"}]}"#)
            .create_async()
            .await;
        let _bare = server
            .mock("GET", format!("{}/11/policies", base).as_str())
            .with_status(200)
            .with_body(r#"[{"id":2,"template":{"assetId":"oauth2-access-token-enforcement"}}]"#)
            .create_async()
            .await;

        let wrapped = client.get_policies(10).await.unwrap();
        assert_eq!(wrapped[0].template_id(), "client-id-enforcement");
        let bare = client.get_policies(11).await.unwrap();
        assert_eq!(bare[0].template_id(), "oauth2-access-token-enforcement");
        client.stop().await;
    }

    #[tokio::test]
    async fn test_reauthenticates_once_on_401() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;

        let base = "/apimanager/api/v1/organizations/org-1/environments/env-1/apis/5/tiers";
        let unauthorized = server
            .mock("GET", base)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let tiers = server
            .mock("GET", base)
            .with_status(200)
            .with_body(r#"{"total":1,"tiers":[{"id":7,"name":"Gold"}]}"#)
            .create_async()
            .await;

        let result = client.get_tiers(5).await.unwrap();
        assert_eq!(result[0].name, "Gold");
        unauthorized.assert_async().await;
        tiers.assert_async().await;
        client.stop().await;
    }

    #[tokio::test]
    async fn test_not_found_maps_to_error() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let _missing = server
            .mock("GET", "/exchange/api/v2/assets/g/a/1.0.0")
            .with_status(404)
            .with_body("no such asset")
            .create_async()
            .await;

        let err = client.get_exchange_asset("g", "a", "1.0.0").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Api(ApiError::NotFound(_))));
        client.stop().await;
    }

    #[tokio::test]
    async fn test_rate_limit_activates_limiter() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let _limited = server
            .mock("GET", "/exchange/api/v2/assets/g/a/1.0.0")
            .with_status(429)
            .with_header("retry-after", "5")
            .create_async()
            .await;

        let err = client.get_exchange_asset("g", "a", "1.0.0").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Api(ApiError::RateLimit(_))));
        assert!(client.limiters.is_active(EndpointCategory::Exchange));
        client.stop().await;
    }

    #[tokio::test]
    async fn test_zipped_file_content() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let archive = crate::client::archive::tests::zip_of(&[("api.raml", "#%RAML 1.0")]);
        let _file = server
            .mock("GET", "/files/api.zip")
            .with_status(200)
            .with_body(archive)
            .create_async()
            .await;

        let link = format!("{}/files/api.zip", server.url());
        let bytes = client
            .get_exchange_file_content(&link, "zip", "api.raml")
            .await
            .unwrap();
        assert_eq!(bytes, b"#%RAML 1.0");
        client.stop().await;
    }

    #[tokio::test]
    async fn test_icon_is_base64_encoded() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let _icon = server
            .mock("GET", "/icons/a.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([1u8, 2, 3])
            .create_async()
            .await;

        assert!(client.get_exchange_asset_icon("").await.unwrap().is_none());
        let icon = client
            .get_exchange_asset_icon(&format!("{}/icons/a.png", server.url()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(icon.data, "AQID");
        assert_eq!(icon.content_type, "image/png");
        client.stop().await;
    }

    #[tokio::test]
    async fn test_delete_contract_revokes_first() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let base = "/apimanager/api/v1/organizations/org-1/environments/env-1/apis/3/contracts/9";
        let revoke = server
            .mock("POST", format!("{}/revoke", base).as_str())
            .with_status(201)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", base)
            .with_status(204)
            .create_async()
            .await;

        client.delete_contract(3, 9).await.unwrap();
        revoke.assert_async().await;
        delete.assert_async().await;
        client.stop().await;
    }

    #[tokio::test]
    async fn test_archive_metrics_are_parsed() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let _file = server
            .mock(
                "GET",
                "/monitoring/archive/api/v1/organizations/org-1/environments/env-1/apis/42/summary/2021/06/30/file-1",
            )
            .with_status(200)
            .with_body(
                r#"{"time":1625081400000,"events":[{"response_code":200,"request_size.count":3}]}"#,
            )
            .create_async()
            .await;

        let day = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
        let metrics = client.get_archive_metrics("42", day, "file-1").await.unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].count, 3);
        client.stop().await;
    }

    #[tokio::test]
    async fn test_empty_analytics_window() {
        let mut server = Server::new_async().await;
        let client = connected(&mut server).await;
        let _events = server
            .mock("GET", "/analytics/1.0/org-1/environments/env-1/events")
            .match_query(Matcher::UrlEncoded("format".into(), "json".into()))
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let start = Utc.timestamp_millis_opt(0).unwrap();
        let events = client.get_analytics_window(start, Utc::now()).await.unwrap();
        assert!(events.is_empty());
        client.stop().await;
    }

    #[test]
    fn test_metric_query_window() {
        let start = Utc.timestamp_millis_opt(1_000).unwrap();
        let end = Utc.timestamp_millis_opt(61_000).unwrap();
        let q = metric_query("o", "e", "a", "v", start, end);
        assert!(q.contains("\"api_id\" = 'a'"));
        assert!(q.contains("time >= 1000ms AND time < 61000ms"));
        assert!(q.contains("GROUP BY time(1m), \"response_code\""));
    }
}
