//! Subscription and credential provisioning

pub mod guard;
pub mod handler;
pub mod manager;
pub mod provisioner;
pub mod state;

pub use handler::{ApiKeyHandler, HandlerRegistry, SlaTierHandler, SubscriptionHandler};
pub use manager::SubscriptionManager;
pub use provisioner::{Provisioner, RequestStatus};
pub use state::SubscriptionState;
