//! API Manager asset models

use serde::{Deserialize, Serialize};

/// A managed API group with its deployed versions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub asset_id: String,

    #[serde(default)]
    pub group_id: String,

    #[serde(default)]
    pub exchange_asset_name: String,

    #[serde(default)]
    pub apis: Vec<Api>,
}

/// One deployed version of an asset in one environment.
///
/// Field order is part of the checksum input; append new fields at the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Api {
    pub id: i64,

    #[serde(default)]
    pub asset_id: String,

    #[serde(default)]
    pub asset_version: String,

    #[serde(default)]
    pub product_version: String,

    #[serde(default)]
    pub environment_id: String,

    #[serde(default)]
    pub organization_id: String,

    #[serde(default)]
    pub group_id: String,

    #[serde(default)]
    pub endpoint_uri: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub active_contracts_count: i64,

    #[serde(default)]
    pub instance_label: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// One page of `/apis`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetPage {
    #[serde(default)]
    pub total: i64,

    #[serde(default)]
    pub assets: Vec<Asset>,
}
