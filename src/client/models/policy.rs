//! Policy and SLA tier models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Security policy applied to an API instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub id: i64,

    /// Legacy template identifier, e.g. `client-id-enforcement`
    #[serde(default)]
    pub policy_template_id: String,

    #[serde(default)]
    pub template: Option<PolicyTemplate>,

    /// Opaque policy configuration
    #[serde(default, alias = "configurationData")]
    pub configuration: Map<String, Value>,

    #[serde(default)]
    pub order: i64,
}

/// Exchange coordinates of a policy template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTemplate {
    #[serde(default)]
    pub group_id: String,

    #[serde(default)]
    pub asset_id: String,

    #[serde(default)]
    pub asset_version: String,
}

impl Policy {
    /// Template identifier, falling back to the exchange asset ID
    pub fn template_id(&self) -> &str {
        if !self.policy_template_id.is_empty() {
            return &self.policy_template_id;
        }
        self.template
            .as_ref()
            .map(|t| t.asset_id.as_str())
            .unwrap_or("")
    }

    /// String view of a configuration value
    pub fn config_str(&self, key: &str) -> Option<String> {
        match self.configuration.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// SLA tier of an API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub auto_approve: bool,

    #[serde(default)]
    pub limits: Vec<TierLimit>,
}

/// Request ceiling of a tier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimit {
    #[serde(default)]
    pub visible: bool,

    #[serde(default)]
    pub maximum_requests: i64,

    #[serde(default)]
    pub time_period_in_milliseconds: i64,
}
