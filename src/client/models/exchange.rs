//! Exchange models

use serde::{Deserialize, Serialize};

/// Exchange metadata for one asset version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeAsset {
    #[serde(default)]
    pub group_id: String,

    #[serde(default)]
    pub asset_id: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub version_group: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Icon download URL, empty when the asset has none
    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,

    #[serde(default)]
    pub files: Vec<ExchangeFile>,
}

/// A file attached to an exchange asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeFile {
    #[serde(default)]
    pub classifier: String,

    #[serde(default)]
    pub packaging: String,

    #[serde(default)]
    pub external_link: String,

    #[serde(default)]
    pub main_file: String,

    #[serde(default)]
    pub md5: Option<String>,
}
