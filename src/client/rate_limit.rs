//! Per-area rate limiting for the Anypoint platform
//!
//! Implements reactive rate limiting that only activates after receiving a 429.
//! Each platform area has its own budget.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

/// Platform areas with separate request budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
    /// /accounts/* - login, current user, environments
    Accounts,
    /// /apimanager/* - assets, policies, tiers, contracts
    ApiManager,
    /// /exchange/* - assets, applications
    Exchange,
    /// /analytics/* - raw events (600/min)
    Analytics,
    /// /monitoring/* - archive and metric query
    Monitoring,
    /// Anything else, including external file links
    Default,
}

impl EndpointCategory {
    /// All endpoint categories for initialization.
    pub const ALL: [EndpointCategory; 6] = [
        EndpointCategory::Accounts,
        EndpointCategory::ApiManager,
        EndpointCategory::Exchange,
        EndpointCategory::Analytics,
        EndpointCategory::Monitoring,
        EndpointCategory::Default,
    ];

    /// Categorize a request path relative to the platform base URL.
    pub fn from_path(path: &str) -> Self {
        let path = path.trim_start_matches('/');
        match path.split('/').next().unwrap_or("") {
            "accounts" => EndpointCategory::Accounts,
            "apimanager" => EndpointCategory::ApiManager,
            "exchange" => EndpointCategory::Exchange,
            "analytics" => EndpointCategory::Analytics,
            "monitoring" => EndpointCategory::Monitoring,
            _ => EndpointCategory::Default,
        }
    }

    /// Requests per second once limiting is active.
    pub fn rate_limit(&self) -> f64 {
        match self {
            EndpointCategory::Accounts => 5.0,
            EndpointCategory::ApiManager => 10.0,
            EndpointCategory::Exchange => 10.0,
            EndpointCategory::Analytics => 10.0,
            EndpointCategory::Monitoring => 0.5, // 30 per minute
            EndpointCategory::Default => 5.0,
        }
    }
}

/// Rate limiter state for a single endpoint category.
pub struct EndpointRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    active: AtomicBool,
    category: EndpointCategory,
}

impl EndpointRateLimiter {
    /// Create a new rate limiter for an endpoint category.
    pub fn new(category: EndpointCategory) -> Self {
        let rate = category.rate_limit();

        // Sub-1 rates are expressed per minute
        let quota = if rate >= 1.0 {
            Quota::per_second(NonZeroU32::new(rate as u32).unwrap_or(NonZeroU32::MIN))
        } else {
            let per_min = (rate * 60.0).round() as u32;
            Quota::per_minute(NonZeroU32::new(per_min).unwrap_or(NonZeroU32::MIN))
        };

        Self {
            limiter: RateLimiter::direct(quota),
            active: AtomicBool::new(false),
            category,
        }
    }

    /// Activate rate limiting for this category.
    pub fn activate(&self) {
        let was_active = self.active.swap(true, Ordering::SeqCst);
        if !was_active {
            debug!("Rate limiting activated for {:?}", self.category);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for permission if rate limiting is active.
    pub async fn wait_if_active(&self) {
        if self.is_active() {
            debug!("Waiting for rate limiter {:?}", self.category);
            self.limiter.until_ready().await;
        }
    }
}

/// Collection of rate limiters for all endpoint categories.
///
/// The map is fixed at construction so lookups need no lock.
pub struct RateLimiterSet {
    limiters: HashMap<EndpointCategory, EndpointRateLimiter>,
}

impl Default for RateLimiterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterSet {
    pub fn new() -> Self {
        let limiters = EndpointCategory::ALL
            .into_iter()
            .map(|category| (category, EndpointRateLimiter::new(category)))
            .collect();
        Self { limiters }
    }

    /// Wait for rate limit permission for a category (if active).
    pub async fn wait_for(&self, category: EndpointCategory) {
        if let Some(limiter) = self.limiters.get(&category) {
            limiter.wait_if_active().await;
        }
    }

    /// Activate rate limiting for a category (called on 429).
    pub fn activate(&self, category: EndpointCategory) {
        if let Some(limiter) = self.limiters.get(&category) {
            limiter.activate();
        }
    }

    pub fn is_active(&self, category: EndpointCategory) -> bool {
        self.limiters
            .get(&category)
            .map(EndpointRateLimiter::is_active)
            .unwrap_or(false)
    }
}
