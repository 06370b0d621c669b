//! Publishes discovered services to the catalog

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use super::service::ServiceDetail;
use crate::central::{Catalog, ServiceBody};

/// Background task draining the service channel
pub struct Publisher {
    handle: JoinHandle<usize>,
}

impl Publisher {
    /// Start draining `rx`. The loop ends once every sender is dropped.
    pub fn spawn(catalog: Arc<dyn Catalog>, rx: mpsc::Receiver<ServiceDetail>) -> Self {
        Self {
            handle: tokio::spawn(publish_loop(catalog, rx)),
        }
    }

    /// Wait for the loop and its in-flight publishes. Returns the number of
    /// services handed to the catalog.
    pub async fn join(self) -> usize {
        match self.handle.await {
            Ok(count) => count,
            Err(e) => {
                warn!("Publisher ended abnormally: {}", e);
                0
            }
        }
    }
}

async fn publish_loop(catalog: Arc<dyn Catalog>, mut rx: mpsc::Receiver<ServiceDetail>) -> usize {
    let mut in_flight = JoinSet::new();
    let mut count = 0;

    while let Some(detail) = rx.recv().await {
        count += 1;
        let catalog = catalog.clone();
        in_flight.spawn(async move { publish(catalog.as_ref(), &detail).await });

        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                error!("Publish task panicked: {}", e);
            }
        }
    }

    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            error!("Publish task panicked: {}", e);
        }
    }
    debug!("Publisher drained after {} services", count);
    count
}

async fn publish(catalog: &dyn Catalog, detail: &ServiceDetail) {
    let body = ServiceBody::from(detail);
    if let Err(e) = catalog.publish(&body).await {
        error!("Failed to publish api {} ({}): {}", detail.id, body.name, e);
    }
}
