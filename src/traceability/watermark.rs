//! Persisted collection watermarks
//!
//! A single JSON object at `<cachePath>/anypoint.cache` maps
//! `LAST_RUN-<apiID>` (metrics) and `LAST_RUN` (analytics events) to epoch
//! milliseconds stored as strings. Watermarks never move backwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::error::Result;

/// Key of the analytics event watermark
pub const LAST_RUN: &str = "LAST_RUN";

fn api_key(api_id: &str) -> String {
    format!("{}-{}", LAST_RUN, api_id)
}

pub struct Watermarks {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl Watermarks {
    /// Load from `path`. A missing or unreadable file yields no watermarks.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Ignoring corrupt watermark file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) => {
                debug!("No watermark file at {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries()
            .get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Move `key` forward to `time`. Returns whether it changed.
    fn advance(&self, key: String, time: DateTime<Utc>) -> bool {
        let millis = time.timestamp_millis();
        let mut entries = self.entries();
        let current = entries.get(&key).and_then(|v| v.parse::<i64>().ok());
        if current.is_some_and(|c| c >= millis) {
            return false;
        }
        entries.insert(key, millis.to_string());
        true
    }

    /// Last metric bucket emitted for an API
    pub fn last_run(&self, api_id: &str) -> Option<DateTime<Utc>> {
        self.get(&api_key(api_id))
    }

    pub fn advance_api(&self, api_id: &str, time: DateTime<Utc>) -> bool {
        self.advance(api_key(api_id), time)
    }

    /// End of the last collected analytics window
    pub fn global(&self) -> Option<DateTime<Utc>> {
        self.get(LAST_RUN)
    }

    pub fn advance_global(&self, time: DateTime<Utc>) -> bool {
        self.advance(LAST_RUN.to_string(), time)
    }

    /// Write every watermark to disk. The lock is held for the write.
    pub fn persist(&self) -> Result<()> {
        let entries = self.entries();
        let json = serde_json::to_string(&*entries)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        debug!("Watermarks written to {}", self.path.display());
        Ok(())
    }
}
