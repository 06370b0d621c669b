//! Subscription state machine
//!
//! Approved subscriptions move through SUBSCRIBING to ACTIVE or
//! FAILED_TO_SUBSCRIBE. Unsubscribe requests move through UNSUBSCRIBING to
//! UNSUBSCRIBED or FAILED_TO_UNSUBSCRIBE. Each subscription ID is handled by
//! at most one task at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, error, info, warn};

use super::guard::DuplicateGuard;
use super::handler::{API_KEY, AppCache, HandlerRegistry, SubscriptionContext, SubscriptionHandler};
use super::state::SubscriptionState;
use crate::central::{Catalog, SubscriptionRequest};
use crate::client::AnypointApi;
use crate::discovery::cache::DiscoveryCache;
use crate::error::{Error, Result};

pub struct SubscriptionManager {
    client: Arc<dyn AnypointApi>,
    catalog: Arc<dyn Catalog>,
    cache: Arc<DiscoveryCache>,
    registry: Arc<HandlerRegistry>,
    apps: Arc<AppCache>,
    guard: Arc<DuplicateGuard>,
    stage: String,
}

impl SubscriptionManager {
    pub fn new(
        client: Arc<dyn AnypointApi>,
        catalog: Arc<dyn Catalog>,
        cache: Arc<DiscoveryCache>,
        registry: Arc<HandlerRegistry>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            client,
            catalog,
            cache,
            registry,
            apps: Arc::new(AppCache::new()),
            guard: DuplicateGuard::new(),
            stage: stage.into(),
        }
    }

    /// Use application IDs and in-flight subscriptions owned by the caller,
    /// which outlive this manager.
    pub fn with_shared(mut self, apps: Arc<AppCache>, guard: Arc<DuplicateGuard>) -> Self {
        self.apps = apps;
        self.guard = guard;
        self
    }

    pub fn guard(&self) -> &Arc<DuplicateGuard> {
        &self.guard
    }

    pub fn apps(&self) -> &AppCache {
        &self.apps
    }

    /// Fetch pending subscriptions from the catalog and handle them.
    pub async fn poll(&self) -> Result<usize> {
        let pending = self.catalog.pending_subscriptions().await?;
        if pending.is_empty() {
            return Ok(0);
        }
        debug!("Handling {} pending subscriptions", pending.len());
        let handled = join_all(pending.into_iter().map(|r| self.handle(r))).await;
        Ok(handled.into_iter().flatten().count())
    }

    /// Drive one subscription to its next terminal state.
    ///
    /// Returns `None` when the request was discarded.
    pub async fn handle(&self, request: SubscriptionRequest) -> Option<SubscriptionState> {
        let Some(_active) = self.guard.try_acquire(&request.id) else {
            info!("Subscription {} is already being handled", request.id);
            return None;
        };

        let state = request.state?;
        match state {
            SubscriptionState::Approved => Some(self.subscribe(&request).await),
            SubscriptionState::UnsubscribeInitiated => Some(self.unsubscribe(&request).await),
            other => {
                debug!("Ignoring subscription {} in state {}", request.id, other);
                None
            }
        }
    }

    fn context(&self) -> SubscriptionContext<'_> {
        SubscriptionContext {
            client: self.client.as_ref(),
            cache: &self.cache,
            apps: self.apps.as_ref(),
            stage: &self.stage,
        }
    }

    fn handler_for(&self, request: &SubscriptionRequest) -> Option<Arc<dyn SubscriptionHandler>> {
        let name = if request.subscription_name.is_empty() {
            API_KEY
        } else {
            request.subscription_name.as_str()
        };
        self.registry.get(name)
    }

    async fn subscribe(&self, request: &SubscriptionRequest) -> SubscriptionState {
        self.write_state(request, SubscriptionState::Subscribing, "", &BTreeMap::new())
            .await;

        let result = match self.handler_for(request) {
            Some(handler) => handler.subscribe(&self.context(), request).await,
            None => Err(Error::Subscription(format!(
                "no subscription handler named {}",
                request.subscription_name
            ))),
        };

        match result {
            Ok(properties) => {
                info!("Subscription {} is active", request.id);
                self.write_state(request, SubscriptionState::Active, "", &properties)
                    .await;
                SubscriptionState::Active
            }
            Err(e) => {
                error!("Subscription {} failed: {}", request.id, e);
                self.write_state(
                    request,
                    SubscriptionState::FailedToSubscribe,
                    &e.to_string(),
                    &BTreeMap::new(),
                )
                .await;
                SubscriptionState::FailedToSubscribe
            }
        }
    }

    async fn unsubscribe(&self, request: &SubscriptionRequest) -> SubscriptionState {
        self.write_state(request, SubscriptionState::Unsubscribing, "", &BTreeMap::new())
            .await;

        let result = match self.handler_for(request) {
            Some(handler) => handler.unsubscribe(&self.context(), request).await,
            None => Err(Error::Subscription(format!(
                "no subscription handler named {}",
                request.subscription_name
            ))),
        };

        match result {
            Ok(()) => {
                info!("Subscription {} removed", request.id);
                self.write_state(request, SubscriptionState::Unsubscribed, "", &BTreeMap::new())
                    .await;
                SubscriptionState::Unsubscribed
            }
            Err(e) => {
                error!("Unsubscribe of {} failed: {}", request.id, e);
                self.write_state(
                    request,
                    SubscriptionState::FailedToUnsubscribe,
                    &e.to_string(),
                    &BTreeMap::new(),
                )
                .await;
                SubscriptionState::FailedToUnsubscribe
            }
        }
    }

    async fn write_state(
        &self,
        request: &SubscriptionRequest,
        state: SubscriptionState,
        message: &str,
        properties: &BTreeMap<String, String>,
    ) {
        if let Err(e) = self
            .catalog
            .update_subscription(&request.id, state, message, properties)
            .await
        {
            warn!(
                "Could not record state {} for subscription {}: {}",
                state, request.id, e
            );
        }
    }
}
