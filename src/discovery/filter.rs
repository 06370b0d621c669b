//! Tag-based discovery filter

use log::debug;

use crate::client::models::Api;
use crate::config::MulesoftConfig;

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    tags: Vec<String>,
    ignore_tags: Vec<String>,
}

impl TagFilter {
    pub fn new(tags: Vec<String>, ignore_tags: Vec<String>) -> Self {
        Self { tags, ignore_tags }
    }

    pub fn from_config(config: &MulesoftConfig) -> Self {
        Self::new(config.discovery_tags(), config.discovery_ignore_tags())
    }

    /// Whether an API should go through the discovery pipeline.
    ///
    /// APIs without an endpoint are never discovered. Ignore tags win over
    /// match tags.
    pub fn should_discover(&self, api: &Api) -> bool {
        if api.endpoint_uri.is_empty() {
            debug!("Skipping api {}: no endpoint", api.id);
            return false;
        }
        if api.tags.iter().any(|t| self.ignore_tags.contains(t)) {
            debug!("Skipping api {}: ignored by tag", api.id);
            return false;
        }
        if !self.tags.is_empty() && !api.tags.iter().any(|t| self.tags.contains(t)) {
            debug!("Skipping api {}: no matching tag", api.id);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fixtures::AssetBuilder;

    fn filter(tags: &[&str], ignore: &[&str]) -> TagFilter {
        TagFilter::new(
            tags.iter().map(|t| t.to_string()).collect(),
            ignore.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let api = AssetBuilder::new(1, "a").tags(&["x"]).api();
        assert!(TagFilter::default().should_discover(&api));
    }

    #[test]
    fn test_missing_endpoint_is_skipped() {
        let api = AssetBuilder::new(1, "a").endpoint("").api();
        assert!(!TagFilter::default().should_discover(&api));
    }

    #[test]
    fn test_ignore_tags() {
        let api = AssetBuilder::new(1, "a").tags(&["donotdiscover"]).api();
        assert!(!filter(&[], &["donotdiscover"]).should_discover(&api));
    }

    #[test]
    fn test_match_tags() {
        let tagged = AssetBuilder::new(1, "a").tags(&["public", "v1"]).api();
        let untagged = AssetBuilder::new(2, "b").api();
        let f = filter(&["public"], &[]);
        assert!(f.should_discover(&tagged));
        assert!(!f.should_discover(&untagged));
    }

    #[test]
    fn test_ignore_wins_over_match() {
        let api = AssetBuilder::new(1, "a").tags(&["public", "internal"]).api();
        assert!(!filter(&["public"], &["internal"]).should_discover(&api));
    }
}
