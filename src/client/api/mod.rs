//! API trait definitions split by platform area
//!
//! This module organizes the Anypoint API surface into focused sub-traits:
//! - [`AccountApi`] - Current user and environment lookup
//! - [`ApiManagerApi`] - Asset listing, policies, tiers and contracts
//! - [`ExchangeApi`] - Exchange assets, files, icons and client applications
//! - [`AnalyticsApi`] - Analytics events and monitoring metrics
//!
//! The [`AnypointApi`](super::AnypointApi) super-trait combines all four.

mod accounts;
mod analytics;
mod api_manager;
mod exchange;

pub use accounts::AccountApi;
pub use analytics::AnalyticsApi;
pub use api_manager::ApiManagerApi;
pub use exchange::{ExchangeApi, Icon};
