//! Per-asset discovery pipeline

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};

use super::cache::DiscoveryCache;
use super::checksum::checksum;
use super::filter::TagFilter;
use super::policy::derive_auth_policy;
use super::service::{
    DETAIL_API_ID, DETAIL_ASSET_ID, DETAIL_ASSET_VERSION, DETAIL_CHECKSUM, DETAIL_PRODUCT_VERSION,
    Endpoint, ServiceDetail,
};
use super::spec::{normalize, select_spec_file};
use crate::central::Catalog;
use crate::client::AnypointApi;
use crate::client::models::{Api, Asset};
use crate::config::MulesoftConfig;
use crate::error::Result;
use crate::subscription::HandlerRegistry;

/// Turns assets into publishable service records
pub struct ServiceHandler {
    client: Arc<dyn AnypointApi>,
    catalog: Arc<dyn Catalog>,
    cache: Arc<DiscoveryCache>,
    registry: Arc<HandlerRegistry>,
    filter: TagFilter,
    stage: String,
    allow_raml: bool,
}

impl ServiceHandler {
    pub fn new(
        client: Arc<dyn AnypointApi>,
        catalog: Arc<dyn Catalog>,
        cache: Arc<DiscoveryCache>,
        registry: Arc<HandlerRegistry>,
        config: &MulesoftConfig,
    ) -> Self {
        Self {
            client,
            catalog,
            cache,
            registry,
            filter: TagFilter::from_config(config),
            stage: config.environment.clone(),
            allow_raml: config.discover_original_raml,
        }
    }

    /// Build service records for every changed API of an asset.
    ///
    /// Failures are logged per API and never stop the remaining APIs.
    pub async fn process_asset(&self, asset: &Asset) -> Vec<ServiceDetail> {
        let mut details = Vec::new();
        for api in &asset.apis {
            match self.process_api(asset, api).await {
                Ok(Some(detail)) => details.push(detail),
                Ok(None) => {}
                Err(e) => warn!(
                    "Skipping api {} of asset {}: {}",
                    api.id, asset.asset_id, e
                ),
            }
        }
        details
    }

    async fn process_api(&self, asset: &Asset, api: &Api) -> Result<Option<ServiceDetail>> {
        if !self.filter.should_discover(api) {
            return Ok(None);
        }

        let policies = self.client.get_policies(api.id).await?;
        let policy = derive_auth_policy(&policies);
        let checksum = checksum(api, policy.policy)?;
        self.cache.insert(&checksum, &self.stage, api);

        let external_id = api.id.to_string();
        let published = self.catalog.published_checksum(&external_id).await?;
        if published.as_deref() == Some(checksum.as_str()) {
            debug!("Api {} is unchanged", api.id);
            return Ok(None);
        }

        let exchange = self
            .client
            .get_exchange_asset(&api.group_id, &api.asset_id, &api.asset_version)
            .await?;
        let Some(file) = select_spec_file(&exchange.files, self.allow_raml) else {
            debug!("Api {} has no publishable spec file", api.id);
            return Ok(None);
        };

        let content = self
            .client
            .get_exchange_file_content(&file.external_link, &file.packaging, &file.main_file)
            .await?;
        let spec = normalize(&file.classifier, &content, &api.endpoint_uri, &policy)?;

        let icon = match exchange.icon.as_deref().filter(|i| !i.is_empty()) {
            Some(url) => self
                .client
                .get_exchange_asset_icon(url)
                .await
                .unwrap_or_else(|e| {
                    warn!("Could not fetch icon of api {}: {}", api.id, e);
                    None
                }),
            None => None,
        };

        let (access_request_definition, subscription_name) =
            match self.registry.for_policy(&policy) {
                Some(handler) => {
                    let tiers = if policy.is_sla_based {
                        self.client.get_tiers(api.id).await?
                    } else {
                        Vec::new()
                    };
                    (Some(handler.schema(&tiers)), Some(handler.name().to_string()))
                }
                None => (None, None),
            };

        let title = match api.instance_label.as_deref().filter(|l| !l.is_empty()) {
            Some(label) => format!("{} ({})", asset.exchange_asset_name, label),
            None => asset.exchange_asset_name.clone(),
        };
        let description = exchange
            .description
            .clone()
            .or_else(|| api.description.clone())
            .unwrap_or_default();

        let agent_details = BTreeMap::from([
            (DETAIL_CHECKSUM.to_string(), checksum),
            (DETAIL_API_ID.to_string(), external_id.clone()),
            (DETAIL_ASSET_ID.to_string(), api.asset_id.clone()),
            (DETAIL_ASSET_VERSION.to_string(), api.asset_version.clone()),
            (DETAIL_PRODUCT_VERSION.to_string(), api.product_version.clone()),
        ]);

        info!(
            "Discovered api {} ({}, {}, {})",
            api.id, title, spec.resource_type, policy.policy
        );
        Ok(Some(ServiceDetail {
            api_name: api.asset_id.clone(),
            title,
            description,
            id: external_id,
            stage: self.stage.clone(),
            version: api.asset_version.clone(),
            api_spec: spec.bytes,
            resource_type: spec.resource_type,
            auth_policy: policy.policy,
            image: icon.as_ref().map(|i| i.data.clone()),
            image_content_type: icon.map(|i| i.content_type),
            endpoints: vec![Endpoint::parse(&api.endpoint_uri)?],
            tags: api.tags.clone(),
            agent_details,
            access_request_definition,
            subscription_name,
        }))
    }
}
