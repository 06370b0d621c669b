//! Amplify Central collaborators: catalog, service bodies and telemetry

pub mod catalog;
pub mod events;
#[cfg(test)]
pub mod mock;
pub mod service;
pub mod sink;

pub use catalog::{Catalog, CentralClient, InstanceRef, SubscriptionRequest};
pub use service::ServiceBody;
pub use sink::{EventSink, HttpEventSink};
