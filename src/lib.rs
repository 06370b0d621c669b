//! Mulesoft Anypoint agents for Amplify Central
//!
//! The discovery agent publishes Anypoint APIs to the catalog and provisions
//! subscriptions against them. The traceability agent reports their traffic.

pub mod central;
pub mod cli;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod job;
pub mod subscription;
pub mod traceability;

pub use error::{Error, Result};
