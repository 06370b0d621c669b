//! Anypoint platform client
//!
//! The API surface is split into four sub-traits, one per platform area.
//! Consumers depend on [`AnypointApi`] so tests can substitute the mock.

pub mod anypoint;
mod archive;
pub mod auth;
#[cfg(test)]
pub mod fixtures;
#[cfg(test)]
pub mod mock;
pub mod api;
pub mod models;
pub mod pagination;
pub mod rate_limit;

pub use anypoint::AnypointClient;
pub use api::{AccountApi, AnalyticsApi, ApiManagerApi, ExchangeApi, Icon};
#[cfg(test)]
pub use mock::MockAnypointClient;
pub use pagination::{DEFAULT_PAGE_SIZE, PageParams, for_each_page};

/// Full Anypoint client surface.
///
/// Implemented automatically for any type implementing all four sub-traits.
pub trait AnypointApi: AccountApi + ApiManagerApi + ExchangeApi + AnalyticsApi {}

impl<T> AnypointApi for T where T: AccountApi + ApiManagerApi + ExchangeApi + AnalyticsApi {}
