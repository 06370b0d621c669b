//! Account API trait

use async_trait::async_trait;

use crate::client::models::{Environment, User};
use crate::error::Result;

/// Account operations for the Anypoint platform
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Fetch the authenticated user and their business groups
    async fn current_user(&self) -> Result<User>;

    /// Look up an environment by name in the configured business group
    async fn find_environment(&self, name: &str) -> Result<Environment>;
}
