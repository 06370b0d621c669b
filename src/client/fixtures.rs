//! Test fixtures and builders for API model types
//!
//! Provides builder patterns for creating test data with sensible defaults.
//! Import via `use crate::client::fixtures::*` in test modules.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value, json};

use super::models::{
    AnalyticsEvent, Api, Asset, ExchangeAsset, ExchangeFile, MonitoringMetric, Policy, Tier,
};

/// Fixed instant used across fixtures: 2021-05-18T16:44:15.813Z
pub fn fixed_time() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_621_356_255_813).unwrap()
}

// ============================================================================
// AssetBuilder
// ============================================================================

/// Builder for an [`Asset`] with a single API version.
///
/// # Example
/// ```ignore
/// let asset = AssetBuilder::new(10, "petstore")
///     .version("1.0.0")
///     .tags(&["public"])
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct AssetBuilder {
    asset: Asset,
    api: Api,
}

impl AssetBuilder {
    /// Create an asset whose only API has ID `api_id`.
    pub fn new(api_id: i64, asset_id: impl Into<String>) -> Self {
        let asset_id = asset_id.into();
        Self {
            asset: Asset {
                id: api_id * 10,
                asset_id: asset_id.clone(),
                group_id: "group-1".into(),
                exchange_asset_name: format!("{} API", asset_id),
                apis: Vec::new(),
            },
            api: Api {
                id: api_id,
                asset_id,
                asset_version: "1.0.0".into(),
                product_version: "v1".into(),
                environment_id: "env-sandbox".into(),
                organization_id: "org-1".into(),
                group_id: "group-1".into(),
                endpoint_uri: "https://petstore.example.com/api".into(),
                ..Api::default()
            },
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.api.asset_version = version.into();
        self
    }

    pub fn product_version(mut self, version: impl Into<String>) -> Self {
        self.api.product_version = version.into();
        self
    }

    pub fn endpoint(mut self, uri: impl Into<String>) -> Self {
        self.api.endpoint_uri = uri.into();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.api.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.api.instance_label = Some(label.into());
        self
    }

    /// The API of this asset without wrapping it.
    pub fn api(&self) -> Api {
        self.api.clone()
    }

    pub fn build(mut self) -> Asset {
        self.asset.apis.push(self.api);
        self.asset
    }
}

// ============================================================================
// ExchangeAssetBuilder
// ============================================================================

/// Builder for [`ExchangeAsset`] metadata.
#[derive(Debug, Clone)]
pub struct ExchangeAssetBuilder {
    asset: ExchangeAsset,
}

impl ExchangeAssetBuilder {
    /// Start from the coordinates of an API.
    pub fn for_api(api: &Api) -> Self {
        Self {
            asset: ExchangeAsset {
                group_id: api.group_id.clone(),
                asset_id: api.asset_id.clone(),
                version: api.asset_version.clone(),
                version_group: api.product_version.clone(),
                name: format!("{} API", api.asset_id),
                description: Some("Exchange description".into()),
                icon: None,
                asset_type: Some("rest-api".into()),
                files: Vec::new(),
            },
        }
    }

    pub fn file(mut self, classifier: &str, packaging: &str, link: &str) -> Self {
        self.asset.files.push(ExchangeFile {
            classifier: classifier.into(),
            packaging: packaging.into(),
            external_link: link.into(),
            main_file: String::new(),
            md5: None,
        });
        self
    }

    pub fn icon(mut self, url: impl Into<String>) -> Self {
        self.asset.icon = Some(url.into());
        self
    }

    pub fn build(self) -> ExchangeAsset {
        self.asset
    }
}

// ============================================================================
// Policies and tiers
// ============================================================================

/// A policy with the given template and configuration object.
pub fn policy(template_id: &str, configuration: Value) -> Policy {
    let configuration: Map<String, Value> = configuration.as_object().cloned().unwrap_or_default();
    Policy {
        id: 1,
        policy_template_id: template_id.into(),
        template: None,
        configuration,
        order: 1,
    }
}

pub fn client_id_policy() -> Policy {
    policy(
        "client-id-enforcement",
        json!({"credentialsOriginHasHttpBasicAuthenticationHeader": "customExpression"}),
    )
}

pub fn oauth_policy(token_url: &str) -> Policy {
    policy(
        "external-oauth2-access-token-enforcement",
        json!({"tokenUrl": token_url, "scopes": "read write"}),
    )
}

pub fn tier(id: i64, name: &str) -> Tier {
    Tier {
        id,
        name: name.into(),
        ..Tier::default()
    }
}

// ============================================================================
// Telemetry
// ============================================================================

/// Builder for [`AnalyticsEvent`] records.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: AnalyticsEvent,
}

impl EventBuilder {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            event: AnalyticsEvent {
                api_id: "211".into(),
                api_version_id: "16810512".into(),
                api_version_name: "v1:16810512".into(),
                api_name: "petstore".into(),
                message_id: message_id.into(),
                client_ip: "10.0.0.1".into(),
                resource_path: "/pets".into(),
                verb: "GET".into(),
                status_code: 200,
                request_size: 12,
                response_size: 256,
                response_time: 45,
                user_agent_name: "curl".into(),
                user_agent_version: "7.64".into(),
                request_outcome: "OK".into(),
                timestamp: fixed_time(),
                ..AnalyticsEvent::default()
            },
        }
    }

    pub fn status(mut self, status: i64) -> Self {
        self.event.status_code = status;
        self
    }

    pub fn application(mut self, id: &str, name: &str) -> Self {
        self.event.application = id.into();
        self.event.application_name = name.into();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    pub fn build(self) -> AnalyticsEvent {
        self.event
    }
}

/// A metric bucket at `time` with `count` requests.
pub fn metric(time: DateTime<Utc>, status_code: i64, count: i64) -> MonitoringMetric {
    MonitoringMetric {
        time,
        status_code,
        count,
        response_time_min: 1,
        response_time_max: 20,
        response_time_sum: count * 10,
        response_time_sos: count * 100,
    }
}
