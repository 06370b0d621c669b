//! Anypoint platform data models
//!
//! This module contains the domain types exchanged with the Anypoint REST
//! surface. Models are organized by platform area.

mod analytics;
mod application;
mod asset;
mod auth;
mod de;
mod exchange;
mod monitoring;
mod policy;

pub use analytics::{ANALYTICS_FIELDS, AnalyticsEvent};
pub use application::{AppRequestBody, Application, Contract, ContractRequest};
pub use asset::{Api, Asset, AssetPage};
pub use auth::{Environment, Organization, Token, User};
pub use exchange::{ExchangeAsset, ExchangeFile};
pub use monitoring::{
    ArchiveDescriptor, ArchiveFile, BootData, InfluxDataSource, InfluxResponse, InfluxSeries,
    MetricLine, MonitoringMetric, parse_summary_file,
};
pub use policy::{Policy, PolicyTemplate, Tier, TierLimit};
