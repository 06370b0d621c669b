//! Catalog-side projection of a discovered service

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discovery::service::{Endpoint, ServiceDetail};

/// Payload published to the catalog for one API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBody {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "externalAPIID")]
    pub external_api_id: String,
    pub stage: String,
    pub version: String,
    /// Base64 of the normalized spec
    pub spec: String,
    pub resource_type: String,
    pub auth_policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_content_type: Option<String>,
    pub endpoints: Vec<Endpoint>,
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "x-agent-details")]
    pub agent_details: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_request_definition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
}

impl ServiceBody {
    pub fn checksum(&self) -> Option<&str> {
        self.agent_details.get("checksum").map(String::as_str)
    }
}

impl From<&ServiceDetail> for ServiceBody {
    fn from(detail: &ServiceDetail) -> Self {
        Self {
            name: sanitize_name(&format!("{}-{}", detail.api_name, detail.id)),
            title: detail.title.clone(),
            description: detail.description.clone(),
            external_api_id: detail.id.clone(),
            stage: detail.stage.clone(),
            version: detail.version.clone(),
            spec: general_purpose::STANDARD.encode(&detail.api_spec),
            resource_type: detail.resource_type.to_string(),
            auth_policy: detail.auth_policy.to_string(),
            image: detail.image.clone(),
            image_content_type: detail.image_content_type.clone(),
            endpoints: detail.endpoints.clone(),
            tags: detail
                .tags
                .iter()
                .map(|t| (t.clone(), String::new()))
                .collect(),
            agent_details: detail.agent_details.clone(),
            access_request_definition: detail.access_request_definition.clone(),
            subscription_name: detail.subscription_name.clone(),
        }
    }
}

/// Resource name accepted by the catalog: lowercase alphanumerics, `-` and `.`
pub fn sanitize_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '.' {
            name.push(c);
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }
    name.trim_matches(|c| c == '-' || c == '.').to_string()
}
