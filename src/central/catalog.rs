//! Amplify Central catalog client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::service::ServiceBody;
use crate::config::CentralConfig;
use crate::error::{ApiError, ConfigError, Result};
use crate::subscription::state::SubscriptionState;

const TENANT_HEADER: &str = "X-Axway-Tenant-Id";

/// A published service instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceRef {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "x-agent-details", default)]
    pub agent_details: BTreeMap<String, String>,
}

impl InstanceRef {
    /// Anypoint API ID the instance was discovered from
    pub fn api_id(&self) -> Option<&str> {
        self.agent_details
            .get("apiID")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Subscription waiting for the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub id: String,
    /// Anypoint API ID of the subscribed service
    #[serde(rename = "apiID")]
    pub api_id: String,
    pub state: Option<SubscriptionState>,
    /// Subscription handler registered for the service
    #[serde(default)]
    pub subscription_name: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_description: String,
    pub tier: Option<String>,
}

/// Operations the agents need from the catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Checksum of the service published for an Anypoint API, if any
    async fn published_checksum(&self, external_api_id: &str) -> Result<Option<String>>;

    async fn publish(&self, body: &ServiceBody) -> Result<()>;

    async fn list_instances(&self) -> Result<Vec<InstanceRef>>;

    async fn pending_subscriptions(&self) -> Result<Vec<SubscriptionRequest>>;

    async fn update_subscription(
        &self,
        id: &str,
        state: SubscriptionState,
        message: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct PublishedService {
    #[serde(rename = "x-agent-details", default)]
    agent_details: BTreeMap<String, String>,
}

/// HTTP adapter for the catalog management API
pub struct CentralClient {
    http: HttpClient,
    base_url: String,
    tenant_id: String,
    environment: String,
    token: Option<String>,
}

impl CentralClient {
    pub fn new(config: &CentralConfig, timeout: Duration) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ConfigError::MissingField("central.url").into());
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            tenant_id: config.tenant_id.clone(),
            environment: config.environment.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn services_path(&self) -> String {
        format!(
            "{}/apis/management/v1alpha1/environments/{}/apiservices",
            self.base_url, self.environment
        )
    }

    fn instances_path(&self) -> String {
        format!(
            "{}/apis/management/v1alpha1/environments/{}/apiserviceinstances",
            self.base_url, self.environment
        )
    }

    fn subscriptions_path(&self) -> String {
        format!("{}/apis/unifiedCatalog/v1/subscriptions", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, url)
            .header(TENANT_HEADER, &self.tenant_id);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.request(Method::GET, url).query(query).send().await;
        let response = check(response.map_err(ApiError::from)?).await?;
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()).into())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth(body),
        StatusCode::NOT_FOUND => ApiError::NotFound(body),
        _ => ApiError::UnexpectedResponse {
            status: status.as_u16(),
            body,
        },
    }
    .into())
}

#[async_trait]
impl Catalog for CentralClient {
    async fn published_checksum(&self, external_api_id: &str) -> Result<Option<String>> {
        let services: Vec<PublishedService> = self
            .get_json(
                &self.services_path(),
                &[("externalAPIID", external_api_id.to_string())],
            )
            .await?;
        Ok(services
            .into_iter()
            .next()
            .and_then(|mut s| s.agent_details.remove("checksum")))
    }

    async fn publish(&self, body: &ServiceBody) -> Result<()> {
        let url = self.services_path();
        let response = self
            .request(Method::POST, &url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::CONFLICT {
            debug!("Service {} exists, replacing", body.name);
            let url = format!("{}/{}", url, body.name);
            let response = self
                .request(Method::PUT, &url)
                .json(body)
                .send()
                .await
                .map_err(ApiError::from)?;
            check(response).await?;
        } else {
            check(response).await?;
        }

        info!("Published service {} ({})", body.name, body.external_api_id);
        Ok(())
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRef>> {
        self.get_json(&self.instances_path(), &[]).await
    }

    async fn pending_subscriptions(&self) -> Result<Vec<SubscriptionRequest>> {
        let query = format!(
            "state=={},state=={}",
            SubscriptionState::Approved,
            SubscriptionState::UnsubscribeInitiated
        );
        let requests: Vec<SubscriptionRequest> = self
            .get_json(&self.subscriptions_path(), &[("query", query)])
            .await?;
        Ok(requests
            .into_iter()
            .filter(|r| r.state.is_some_and(|s| s.is_actionable()))
            .collect())
    }

    async fn update_subscription(
        &self,
        id: &str,
        state: SubscriptionState,
        message: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let url = format!("{}/{}/states", self.subscriptions_path(), id);
        let body = json!({
            "state": state,
            "description": message,
            "properties": properties,
        });
        let response = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from)?;
        check(response).await?;
        debug!("Subscription {} moved to {}", id, state);
        Ok(())
    }
}
