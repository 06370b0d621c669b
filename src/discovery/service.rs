//! Canonical service record emitted by discovery

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::policy::AuthPolicy;
use super::spec::ResourceType;
use crate::error::{Result, SpecError};

pub const DETAIL_CHECKSUM: &str = "checksum";
pub const DETAIL_API_ID: &str = "apiID";
pub const DETAIL_ASSET_ID: &str = "assetID";
pub const DETAIL_ASSET_VERSION: &str = "assetVersion";
pub const DETAIL_PRODUCT_VERSION: &str = "productVersion";

/// Network endpoint a service is reachable on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub base_path: String,
}

impl Endpoint {
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).map_err(|e| SpecError::Rewrite(format!("{}: {}", uri, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| SpecError::Rewrite(format!("{}: missing host", uri)))?;
        Ok(Self {
            host: host.to_string(),
            port: url.port_or_known_default().unwrap_or(443),
            protocol: url.scheme().to_string(),
            base_path: url.path().to_string(),
        })
    }
}

/// Everything the catalog needs to publish one API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetail {
    pub api_name: String,
    pub title: String,
    pub description: String,
    pub id: String,
    pub stage: String,
    pub version: String,
    #[serde(skip)]
    pub api_spec: Vec<u8>,
    pub resource_type: ResourceType,
    pub auth_policy: AuthPolicy,
    pub image: Option<String>,
    pub image_content_type: Option<String>,
    pub endpoints: Vec<Endpoint>,
    pub tags: Vec<String>,
    pub agent_details: BTreeMap<String, String>,
    pub access_request_definition: Option<Value>,
    pub subscription_name: Option<String>,
}

impl ServiceDetail {
    pub fn checksum(&self) -> Option<&str> {
        self.agent_details.get(DETAIL_CHECKSUM).map(String::as_str)
    }

    pub fn api_id(&self) -> Option<&str> {
        self.agent_details.get(DETAIL_API_ID).map(String::as_str)
    }
}
