//! In-flight subscription tracking

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of subscription IDs currently being handled
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    active: Mutex<HashSet<String>>,
}

/// Marks a subscription as in flight until dropped
#[derive(Debug)]
pub struct ActiveSubscription {
    guard: Arc<DuplicateGuard>,
    id: String,
}

impl DuplicateGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn active(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim `id`. Returns `None` when another handler already holds it.
    pub fn try_acquire(self: &Arc<Self>, id: &str) -> Option<ActiveSubscription> {
        if !self.active().insert(id.to_string()) {
            return None;
        }
        Some(ActiveSubscription {
            guard: Arc::clone(self),
            id: id.to_string(),
        })
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active().contains(id)
    }
}

impl ActiveSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.guard.active().remove(&self.id);
    }
}
