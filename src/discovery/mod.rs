//! API discovery: Anypoint assets to catalog services
//!
//! Each cycle pages through the environment's assets, filters them by tag,
//! derives the auth policy, normalizes the spec and hands the result to the
//! publisher. Services whose checksum matches the published one are skipped.

pub mod agent;
pub mod cache;
pub mod checksum;
pub mod filter;
pub mod handler;
pub mod policy;
pub mod publisher;
pub mod service;
pub mod spec;

pub use agent::{DiscoveryAgent, DiscoveryJob};
pub use cache::DiscoveryCache;
pub use handler::ServiceHandler;
pub use publisher::Publisher;
pub use service::ServiceDetail;
