//! Per-cycle discovery cache
//!
//! Every discovery cycle builds a fresh snapshot and swaps it in when the
//! cycle completes. Readers always see a complete cycle, and APIs that
//! disappeared upstream drop out after the next commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use log::debug;

use crate::client::models::Api;

#[derive(Debug, Default)]
struct CacheSnapshot {
    by_checksum: HashMap<String, Api>,
    by_stage: HashMap<(String, String), Api>,
    by_version: HashMap<(String, String), Api>,
}

impl CacheSnapshot {
    fn insert(&mut self, checksum: &str, stage: &str, api: &Api) {
        let api_id = api.id.to_string();
        self.by_checksum.insert(checksum.to_string(), api.clone());
        self.by_stage
            .insert((api_id.clone(), stage.to_string()), api.clone());
        self.by_version
            .insert((api_id, api.product_version.clone()), api.clone());
    }
}

/// Discovered APIs keyed by checksum, `(apiID, stage)` and
/// `(apiID, productVersion)`
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    current: ArcSwap<CacheSnapshot>,
    building: Mutex<Option<CacheSnapshot>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn building(&self) -> MutexGuard<'_, Option<CacheSnapshot>> {
        self.building
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start collecting a new snapshot, discarding any unfinished one.
    pub fn begin_cycle(&self) {
        *self.building() = Some(CacheSnapshot::default());
    }

    /// Record an API seen in the running cycle.
    ///
    /// Outside a cycle the entry goes straight into the live snapshot.
    pub fn insert(&self, checksum: &str, stage: &str, api: &Api) {
        let mut building = self.building();
        match building.as_mut() {
            Some(snapshot) => snapshot.insert(checksum, stage, api),
            None => {
                drop(building);
                self.current.rcu(|current| {
                    let mut next = CacheSnapshot {
                        by_checksum: current.by_checksum.clone(),
                        by_stage: current.by_stage.clone(),
                        by_version: current.by_version.clone(),
                    };
                    next.insert(checksum, stage, api);
                    next
                });
            }
        }
    }

    /// Publish the snapshot built since [`begin_cycle`](Self::begin_cycle).
    pub fn commit(&self) {
        if let Some(snapshot) = self.building().take() {
            debug!("Discovery cache holds {} apis", snapshot.by_checksum.len());
            self.current.store(Arc::new(snapshot));
        }
    }

    pub fn get_by_checksum(&self, checksum: &str) -> Option<Api> {
        self.current.load().by_checksum.get(checksum).cloned()
    }

    pub fn get_api(&self, api_id: &str, stage: &str) -> Option<Api> {
        self.current
            .load()
            .by_stage
            .get(&(api_id.to_string(), stage.to_string()))
            .cloned()
    }

    /// Resolve an instance by product version (`v1`, `v2`) rather than stage.
    ///
    /// Library surface for embedders; the agents resolve by stage.
    pub fn get_by_version(&self, api_id: &str, product_version: &str) -> Option<Api> {
        self.current
            .load()
            .by_version
            .get(&(api_id.to_string(), product_version.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.current.load().by_checksum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fixtures::AssetBuilder;

    #[test]
    fn test_entries_visible_after_commit() {
        let cache = DiscoveryCache::new();
        let api = AssetBuilder::new(111, "petstore").api();

        cache.begin_cycle();
        cache.insert("abc", "Sandbox", &api);
        assert!(cache.get_api("111", "Sandbox").is_none());

        cache.commit();
        assert_eq!(cache.get_api("111", "Sandbox").unwrap().id, 111);
        assert_eq!(cache.get_by_version("111", "v1").unwrap().id, 111);
        assert_eq!(cache.get_by_checksum("abc").unwrap().id, 111);
    }

    #[test]
    fn test_new_cycle_drops_missing_apis() {
        let cache = DiscoveryCache::new();
        let kept = AssetBuilder::new(1, "kept").api();
        let removed = AssetBuilder::new(2, "removed").api();

        cache.begin_cycle();
        cache.insert("k", "Sandbox", &kept);
        cache.insert("r", "Sandbox", &removed);
        cache.commit();
        assert_eq!(cache.len(), 2);

        cache.begin_cycle();
        cache.insert("k", "Sandbox", &kept);
        // still serving the previous cycle
        assert!(cache.get_api("2", "Sandbox").is_some());
        cache.commit();

        assert_eq!(cache.len(), 1);
        assert!(cache.get_api("2", "Sandbox").is_none());
        assert!(cache.get_api("1", "Sandbox").is_some());
    }

    #[test]
    fn test_insert_outside_cycle() {
        let cache = DiscoveryCache::new();
        let api = AssetBuilder::new(5, "x").api();
        cache.insert("c", "Production", &api);

        assert!(cache.get_api("5", "Production").is_some());
        assert!(cache.get_api("5", "Sandbox").is_none());
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_commit_without_cycle_keeps_snapshot() {
        let cache = DiscoveryCache::new();
        cache.insert("c", "Sandbox", &AssetBuilder::new(5, "x").api());
        cache.commit();
        assert_eq!(cache.len(), 1);
    }
}
