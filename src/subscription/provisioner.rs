//! Request/response view of the same Anypoint operations
//!
//! Each operation reports a [`RequestStatus`] instead of an error, carrying
//! the identifiers and credentials produced on success.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use super::handler::{contract_for_application, parse_tier_label};
use crate::client::AnypointApi;
use crate::client::models::AppRequestBody;
use crate::discovery::cache::DiscoveryCache;
use crate::error::{Error, Result};

pub const PROP_APP_ID: &str = "appID";
pub const PROP_CONTRACT_ID: &str = "contractID";
pub const PROP_CLIENT_ID: &str = "clientID";
pub const PROP_CLIENT_SECRET: &str = "clientSecret";

/// Outcome of a provisioning request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatus {
    pub success: bool,
    pub message: String,
    pub properties: BTreeMap<String, String>,
}

impl RequestStatus {
    pub fn success(properties: BTreeMap<String, String>) -> Self {
        Self {
            success: true,
            message: String::new(),
            properties,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            properties: BTreeMap::new(),
        }
    }

    fn from_result(operation: &str, result: Result<BTreeMap<String, String>>) -> Self {
        match result {
            Ok(properties) => {
                info!("{} succeeded", operation);
                Self::success(properties)
            }
            Err(e) => {
                warn!("{} failed: {}", operation, e);
                Self::failed(e.to_string())
            }
        }
    }
}

/// Obtained from [`DiscoveryAgent::provisioner`](crate::discovery::DiscoveryAgent::provisioner)
/// so it resolves APIs against the live discovery cache.
pub struct Provisioner {
    client: Arc<dyn AnypointApi>,
    cache: Arc<DiscoveryCache>,
    stage: String,
}

impl Provisioner {
    pub fn new(
        client: Arc<dyn AnypointApi>,
        cache: Arc<DiscoveryCache>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            stage: stage.into(),
        }
    }

    /// Create a client application scoped to `api_id`.
    pub async fn application_request_provision(
        &self,
        api_id: &str,
        app_name: &str,
        description: &str,
    ) -> RequestStatus {
        let result = async {
            let body = AppRequestBody {
                name: app_name.to_string(),
                description: description.to_string(),
                ..AppRequestBody::default()
            };
            let app = self.client.create_client_application(api_id, &body).await?;
            Ok::<_, Error>(BTreeMap::from([(PROP_APP_ID.to_string(), app.id.to_string())]))
        }
        .await;
        RequestStatus::from_result("applicationRequestProvision", result)
    }

    pub async fn application_request_deprovision(&self, app_id: i64) -> RequestStatus {
        let result = async {
            self.client.delete_client_application(app_id).await?;
            Ok::<_, Error>(BTreeMap::new())
        }
        .await;
        RequestStatus::from_result("applicationRequestDeprovision", result)
    }

    /// Create a contract between an application and a discovered API.
    pub async fn access_request_provision(
        &self,
        app_id: i64,
        api_id: &str,
        tier: Option<&str>,
    ) -> RequestStatus {
        let result = async {
            let contract = contract_for_application(
                self.client.as_ref(),
                &self.cache,
                &self.stage,
                app_id,
                api_id,
                tier.map(parse_tier_label),
            )
            .await?;
            Ok::<_, Error>(BTreeMap::from([(
                PROP_CONTRACT_ID.to_string(),
                contract.id.to_string(),
            )]))
        }
        .await;
        RequestStatus::from_result("accessRequestProvision", result)
    }

    /// Revoke and delete a contract.
    pub async fn access_request_deprovision(&self, api_id: i64, contract_id: i64) -> RequestStatus {
        let result = async {
            self.client.delete_contract(api_id, contract_id).await?;
            Ok::<_, Error>(BTreeMap::new())
        }
        .await;
        RequestStatus::from_result("accessRequestDeprovision", result)
    }

    /// Credentials of an existing application.
    pub async fn credential_provision(&self, app_id: i64) -> RequestStatus {
        let result = async {
            let app = self
                .client
                .get_client_application(&app_id.to_string())
                .await?;
            Ok::<_, Error>(BTreeMap::from([
                (PROP_CLIENT_ID.to_string(), app.client_id),
                (PROP_CLIENT_SECRET.to_string(), app.client_secret),
            ]))
        }
        .await;
        RequestStatus::from_result("credentialProvision", result)
    }

    /// Anypoint credentials live as long as their application, so there is
    /// nothing to remove on their own.
    pub async fn credential_deprovision(&self, app_id: i64) -> RequestStatus {
        info!("Credentials of application {} are removed with the application", app_id);
        RequestStatus::success(BTreeMap::new())
    }
}
