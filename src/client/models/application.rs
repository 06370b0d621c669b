//! Client application and contract models

use serde::{Deserialize, Serialize};

/// Body for creating a client application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRequestBody {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub redirect_uri: Vec<String>,

    #[serde(default)]
    pub grant_types: Vec<String>,

    #[serde(default)]
    pub api_endpoints: bool,
}

/// Exchange client application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,
}

/// Body for creating a contract between an application and an API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRequest {
    pub api_id: i64,

    pub environment_id: String,

    pub accepted_terms: bool,

    pub organization_id: String,

    pub group_id: String,

    pub asset_id: String,

    pub version: String,

    pub version_group: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_tier_id: Option<i64>,
}

/// Created contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: i64,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub application_id: Option<i64>,

    #[serde(default)]
    pub api_id: Option<i64>,
}
