//! Subscription handlers per auth policy kind

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, info};
use serde_json::{Value, json};

use crate::central::SubscriptionRequest;
use crate::client::AnypointApi;
use crate::client::models::{AppRequestBody, Contract, ContractRequest, Tier};
use crate::discovery::cache::DiscoveryCache;
use crate::discovery::policy::{AuthPolicy, PolicyDetail};
use crate::error::{Error, Result};

pub const API_KEY: &str = "apikey";
pub const SLA_TIER: &str = "sla-tier";

pub const PROP_CLIENT_ID: &str = "clientId";
pub const PROP_CLIENT_SECRET: &str = "clientSecret";

/// Application name to Anypoint application ID
#[derive(Debug, Default)]
pub struct AppCache {
    ids: Mutex<HashMap<String, i64>>,
}

impl AppCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, app_name: &str, app_id: i64) {
        self.ids().insert(app_name.to_string(), app_id);
    }

    pub fn get(&self, app_name: &str) -> Option<i64> {
        self.ids().get(app_name).copied()
    }

    pub fn remove(&self, app_name: &str) -> Option<i64> {
        self.ids().remove(app_name)
    }
}

/// Collaborators available while handling a subscription
pub struct SubscriptionContext<'a> {
    pub client: &'a dyn AnypointApi,
    pub cache: &'a DiscoveryCache,
    pub apps: &'a AppCache,
    pub stage: &'a str,
}

#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Schema of the subscription form offered in the catalog
    fn schema(&self, tiers: &[Tier]) -> Value;

    fn is_applicable(&self, policy: &PolicyDetail) -> bool;

    /// Provision access and return the properties handed to the subscriber.
    async fn subscribe(
        &self,
        ctx: &SubscriptionContext<'_>,
        request: &SubscriptionRequest,
    ) -> Result<BTreeMap<String, String>>;

    async fn unsubscribe(
        &self,
        ctx: &SubscriptionContext<'_>,
        request: &SubscriptionRequest,
    ) -> Result<()>;
}

/// Tier ID from a `"<id>-<name>"` label. Unparseable labels map to 0.
pub fn parse_tier_label(label: &str) -> i64 {
    let id = label.split('-').next().unwrap_or_default();
    id.trim().parse().unwrap_or(0)
}

fn app_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "appName": {
                "type": "string",
                "title": "Application name",
                "description": "Name of the Anypoint client application to create"
            },
            "appDescription": {
                "type": "string",
                "title": "Application description"
            }
        },
        "required": ["appName"]
    })
}

/// Create the client application and the contract on the subscribed API.
async fn provision(
    ctx: &SubscriptionContext<'_>,
    request: &SubscriptionRequest,
    requested_tier_id: Option<i64>,
) -> Result<BTreeMap<String, String>> {
    let body = AppRequestBody {
        name: request.app_name.clone(),
        description: request.app_description.clone(),
        ..AppRequestBody::default()
    };
    let app = ctx
        .client
        .create_client_application(&request.api_id, &body)
        .await?;
    ctx.apps.insert(&request.app_name, app.id);
    debug!("Created application {} ({})", app.name, app.id);

    contract_for_application(
        ctx.client,
        ctx.cache,
        ctx.stage,
        app.id,
        &request.api_id,
        requested_tier_id,
    )
    .await?;

    Ok(BTreeMap::from([
        (PROP_CLIENT_ID.to_string(), app.client_id),
        (PROP_CLIENT_SECRET.to_string(), app.client_secret),
    ]))
}

/// Attach application `app_id` to the discovered API `api_id`.
pub(crate) async fn contract_for_application(
    client: &dyn AnypointApi,
    cache: &DiscoveryCache,
    stage: &str,
    app_id: i64,
    api_id: &str,
    requested_tier_id: Option<i64>,
) -> Result<Contract> {
    let api = cache
        .get_api(api_id, stage)
        .ok_or_else(|| Error::CacheMiss(format!("unable to resolve api {}", api_id)))?;

    let exchange = client
        .get_exchange_asset(&api.group_id, &api.asset_id, &api.asset_version)
        .await?;

    let contract = ContractRequest {
        api_id: api.id,
        environment_id: api.environment_id.clone(),
        accepted_terms: true,
        organization_id: api.organization_id.clone(),
        group_id: api.group_id.clone(),
        asset_id: api.asset_id.clone(),
        version: api.asset_version.clone(),
        version_group: exchange.version_group,
        requested_tier_id,
    };
    let created = client.create_contract(app_id, &contract).await?;
    info!(
        "Created contract {} for application {} on api {}",
        created.id, app_id, api.id
    );
    Ok(created)
}

async fn deprovision(ctx: &SubscriptionContext<'_>, request: &SubscriptionRequest) -> Result<()> {
    let app_id = ctx.apps.get(&request.app_name).ok_or_else(|| {
        Error::CacheMiss(format!("unable to resolve application {}", request.app_name))
    })?;
    ctx.client
        .delete_client_application(app_id)
        .await
        .map_err(|e| {
            Error::Subscription(format!("failed to delete application {}: {}", app_id, e))
        })?;
    ctx.apps.remove(&request.app_name);
    info!("Deleted application {} ({})", request.app_name, app_id);
    Ok(())
}

/// Client-id enforced APIs without SLA tiers
#[derive(Debug, Default)]
pub struct ApiKeyHandler;

#[async_trait]
impl SubscriptionHandler for ApiKeyHandler {
    fn name(&self) -> &str {
        API_KEY
    }

    fn schema(&self, _tiers: &[Tier]) -> Value {
        app_schema()
    }

    fn is_applicable(&self, policy: &PolicyDetail) -> bool {
        policy.policy == AuthPolicy::ApiKey && !policy.is_sla_based
    }

    async fn subscribe(
        &self,
        ctx: &SubscriptionContext<'_>,
        request: &SubscriptionRequest,
    ) -> Result<BTreeMap<String, String>> {
        provision(ctx, request, None).await
    }

    async fn unsubscribe(
        &self,
        ctx: &SubscriptionContext<'_>,
        request: &SubscriptionRequest,
    ) -> Result<()> {
        deprovision(ctx, request).await
    }
}

/// Client-id enforced APIs with SLA-based rate limiting
#[derive(Debug, Default)]
pub struct SlaTierHandler;

impl SlaTierHandler {
    /// Subscription schema offering one choice per tier
    pub fn schema_for(tiers: &[Tier]) -> Value {
        let labels: Vec<String> = tiers
            .iter()
            .map(|t| format!("{}-{}", t.id, t.name))
            .collect();
        let mut schema = app_schema();
        schema["properties"]["tier"] = json!({
            "type": "string",
            "title": "SLA tier",
            "enum": labels,
        });
        schema["required"] = json!(["appName", "tier"]);
        schema
    }
}

#[async_trait]
impl SubscriptionHandler for SlaTierHandler {
    fn name(&self) -> &str {
        SLA_TIER
    }

    fn schema(&self, tiers: &[Tier]) -> Value {
        Self::schema_for(tiers)
    }

    fn is_applicable(&self, policy: &PolicyDetail) -> bool {
        policy.policy == AuthPolicy::ApiKey && policy.is_sla_based
    }

    async fn subscribe(
        &self,
        ctx: &SubscriptionContext<'_>,
        request: &SubscriptionRequest,
    ) -> Result<BTreeMap<String, String>> {
        let tier_id = request.tier.as_deref().map(parse_tier_label);
        provision(ctx, request, tier_id).await
    }

    async fn unsubscribe(
        &self,
        ctx: &SubscriptionContext<'_>,
        request: &SubscriptionRequest,
    ) -> Result<()> {
        deprovision(ctx, request).await
    }
}

/// Handlers keyed by name, in lookup order
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn SubscriptionHandler>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(vec![Arc::new(SlaTierHandler), Arc::new(ApiKeyHandler)])
    }
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn SubscriptionHandler>>) -> Self {
        Self { handlers }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SubscriptionHandler>> {
        self.handlers.iter().find(|h| h.name() == name).cloned()
    }

    /// First handler that applies to a derived policy
    pub fn for_policy(&self, policy: &PolicyDetail) -> Option<Arc<dyn SubscriptionHandler>> {
        self.handlers
            .iter()
            .find(|h| h.is_applicable(policy))
            .cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}
