//! Exchange trait

use async_trait::async_trait;

use crate::client::models::{AppRequestBody, Application, Contract, ContractRequest, ExchangeAsset};
use crate::error::Result;

/// Downloaded asset icon
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Icon {
    /// Base64-encoded image bytes
    pub data: String,
    pub content_type: String,
}

/// Exchange operations: asset metadata, files and client applications
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Exchange metadata for one asset version
    async fn get_exchange_asset(
        &self,
        group_id: &str,
        asset_id: &str,
        asset_version: &str,
    ) -> Result<ExchangeAsset>;

    /// Download a file. Zipped files yield the bytes of `main_file`.
    async fn get_exchange_file_content(
        &self,
        link: &str,
        packaging: &str,
        main_file: &str,
    ) -> Result<Vec<u8>>;

    /// Download an icon. `None` when the asset has no icon.
    async fn get_exchange_asset_icon(&self, icon_url: &str) -> Result<Option<Icon>>;

    /// Create a client application requesting access to `api_id`
    async fn create_client_application(
        &self,
        api_id: &str,
        body: &AppRequestBody,
    ) -> Result<Application>;

    /// Fetch a client application including its credentials
    async fn get_client_application(&self, app_id: &str) -> Result<Application>;

    /// Delete a client application
    async fn delete_client_application(&self, app_id: i64) -> Result<()>;

    /// Create a contract for an application
    async fn create_contract(&self, app_id: i64, contract: &ContractRequest) -> Result<Contract>;
}
