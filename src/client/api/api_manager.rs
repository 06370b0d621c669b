//! API Manager trait

use async_trait::async_trait;

use crate::client::models::{AssetPage, Policy, Tier};
use crate::client::pagination::PageParams;
use crate::error::Result;

/// API Manager operations scoped to the configured environment
#[async_trait]
pub trait ApiManagerApi: Send + Sync {
    /// List managed assets. Returns at most `page.limit` assets.
    async fn list_assets(&self, page: &PageParams) -> Result<AssetPage>;

    /// Policies applied to an API instance, in platform order
    async fn get_policies(&self, api_id: i64) -> Result<Vec<Policy>>;

    /// SLA tiers defined on an API instance
    async fn get_tiers(&self, api_id: i64) -> Result<Vec<Tier>>;

    /// Revoke and delete a contract
    async fn delete_contract(&self, api_id: i64, contract_id: i64) -> Result<()>;
}
