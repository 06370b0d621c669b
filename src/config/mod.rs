//! Configuration management for the Mulesoft agents
//!
//! Each agent reads one YAML file and then lets environment variables
//! override individual keys. The resulting [`AgentConfig`] is validated once
//! and handed to constructors explicitly.

pub mod duration;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default Anypoint platform base URL
pub const DEFAULT_ANYPOINT_URL: &str = "https://anypoint.mulesoft.com";

/// Lowest accepted polling interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(20);
/// Shortest accepted `auth.lifetime`
pub const MIN_TOKEN_LIFETIME: Duration = Duration::from_secs(60);

/// Name of the on-disk watermark cache file inside `cachePath`
pub const CACHE_FILE_NAME: &str = "anypoint.cache";

/// Full agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Amplify Central settings
    #[serde(default)]
    pub central: CentralConfig,

    /// Mulesoft Anypoint settings
    #[serde(default)]
    pub mulesoft: MulesoftConfig,

    /// Traceability agent settings
    #[serde(default)]
    pub traceability: TraceabilityConfig,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Amplify Central connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralConfig {
    /// Catalog base URL
    #[serde(default)]
    pub url: String,

    /// Tenant (organization) ID in the catalog
    #[serde(default)]
    pub tenant_id: String,

    /// Catalog environment the services are published to
    #[serde(default)]
    pub environment: String,

    /// Team that owns published services and traffic
    #[serde(default)]
    pub team_id: String,

    /// Bearer token for the catalog API
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Telemetry ingestion endpoint
    #[serde(default)]
    pub ingestion_url: String,
}

/// Mulesoft Anypoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulesoftConfig {
    /// Platform base URL
    #[serde(default = "default_anypoint_url")]
    pub anypoint_exchange_url: String,

    /// Environment name to discover
    #[serde(default)]
    pub environment: String,

    /// Business group name
    #[serde(default)]
    pub org_name: String,

    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,

    /// Discovery and analytics period
    #[serde(default = "default_poll_interval", with = "duration")]
    pub poll_interval: Duration,

    /// Outer timeout for every HTTP call
    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,

    /// CSV list of tags an API must carry to be discovered
    #[serde(default)]
    pub discovery_tags: String,

    /// CSV list of tags that exclude an API from discovery
    #[serde(default)]
    pub discovery_ignore_tags: String,

    /// Directory holding the watermark cache
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Optional HTTP(S) proxy
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// TLS options
    #[serde(default)]
    pub ssl: SslConfig,

    /// Publish RAML specs as-is instead of skipping them
    #[serde(default)]
    pub discover_original_raml: bool,

    /// Use the monitoring archive instead of the live metric query
    #[serde(default, rename = "useMonitoringAPI")]
    pub use_monitoring_api: bool,

    /// Assets requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Capacity of the internal service channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Anypoint credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default, rename = "clientID")]
    pub client_id: Option<String>,

    #[serde(default, rename = "clientSecret", skip_serializing)]
    pub client_secret: Option<String>,

    /// Token lifetime hint used when the platform does not report one
    #[serde(default = "default_lifetime", with = "duration")]
    pub lifetime: Duration,
}

/// Which credential pair is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { username: String, password: String },
    ClientCredentials { client_id: String, client_secret: String },
}

/// TLS settings for the HTTP client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslConfig {
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Minimum TLS version (`1.2` or `1.3`)
    #[serde(default)]
    pub min_version: Option<String>,
}

/// Traceability agent switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityConfig {
    /// Pull raw analytics events and emit transaction logs
    #[serde(default = "default_true")]
    pub collect_events: bool,

    /// Pull per-API metric buckets
    #[serde(default = "default_true")]
    pub collect_metrics: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_anypoint_url() -> String {
    DEFAULT_ANYPOINT_URL.to_string()
}

fn default_poll_interval() -> Duration {
    MIN_POLL_INTERVAL
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_lifetime() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_page_size() -> usize {
    50
}

fn default_channel_capacity() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MulesoftConfig {
    fn default() -> Self {
        Self {
            anypoint_exchange_url: default_anypoint_url(),
            environment: String::new(),
            org_name: String::new(),
            auth: AuthConfig::default(),
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            discovery_tags: String::new(),
            discovery_ignore_tags: String::new(),
            cache_path: default_cache_path(),
            proxy_url: None,
            ssl: SslConfig::default(),
            discover_original_raml: false,
            use_monitoring_api: false,
            page_size: default_page_size(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            client_id: None,
            client_secret: None,
            lifetime: default_lifetime(),
        }
    }
}

impl Default for TraceabilityConfig {
    fn default() -> Self {
        Self {
            collect_events: true,
            collect_metrics: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Split a CSV tag list, dropping blanks
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl AuthConfig {
    /// Resolve the configured credential pair.
    ///
    /// Exactly one pair must be complete.
    pub fn credentials(&self) -> Result<Credentials> {
        let password = match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(u), Some(p)) => Some(Credentials::Password {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        };
        let client = match (non_empty(&self.client_id), non_empty(&self.client_secret)) {
            (Some(id), Some(secret)) => Some(Credentials::ClientCredentials {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            }),
            _ => None,
        };

        match (password, client) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "configure either auth.username/password or auth.clientID/clientSecret, not both"
                    .to_string(),
            )
            .into()),
            (Some(creds), None) | (None, Some(creds)) => Ok(creds),
            (None, None) => Err(ConfigError::MissingField(
                "mulesoft.auth.username/password or mulesoft.auth.clientID/clientSecret",
            )
            .into()),
        }
    }
}

impl MulesoftConfig {
    pub fn discovery_tags(&self) -> Vec<String> {
        split_csv(&self.discovery_tags)
    }

    pub fn discovery_ignore_tags(&self) -> Vec<String> {
        split_csv(&self.discovery_ignore_tags)
    }

    /// Path of the watermark cache file
    pub fn cache_file(&self) -> PathBuf {
        self.cache_path.join(CACHE_FILE_NAME)
    }
}

impl AgentConfig {
    /// Default config file location for an agent binary
    pub fn default_path(agent: &str) -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::Invalid(
            "Could not determine config directory".to_string(),
        ))?;
        Ok(base.join("mulesoft-agent").join(format!("{}.yaml", agent)))
    }

    /// Load configuration for an agent.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used when present and the environment alone otherwise. Environment
    /// overrides are applied and the result validated.
    pub fn load(agent: &str, path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => {
                let default = Self::default_path(agent)?;
                if default.exists() {
                    Self::load_from(&default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without applying overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AgentConfig = serde_yaml::from_str(contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let flag = |key: &str| get(key).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"));
        let dur = |key: &str| get(key).and_then(|v| duration::parse(&v));

        let m = &mut self.mulesoft;
        if let Some(v) = get("MULESOFT_ANYPOINTEXCHANGEURL") {
            m.anypoint_exchange_url = v;
        }
        if let Some(v) = get("MULESOFT_ENVIRONMENT") {
            m.environment = v;
        }
        if let Some(v) = get("MULESOFT_ORGNAME") {
            m.org_name = v;
        }
        if let Some(v) = get("MULESOFT_AUTH_USERNAME") {
            m.auth.username = Some(v);
        }
        if let Some(v) = get("MULESOFT_AUTH_PASSWORD") {
            m.auth.password = Some(v);
        }
        if let Some(v) = get("MULESOFT_AUTH_CLIENTID") {
            m.auth.client_id = Some(v);
        }
        if let Some(v) = get("MULESOFT_AUTH_CLIENTSECRET") {
            m.auth.client_secret = Some(v);
        }
        if let Some(v) = dur("MULESOFT_AUTH_LIFETIME") {
            m.auth.lifetime = v;
        }
        if let Some(v) = dur("MULESOFT_POLLINTERVAL") {
            m.poll_interval = v;
        }
        if let Some(v) = dur("MULESOFT_TIMEOUT") {
            m.timeout = v;
        }
        if let Some(v) = get("MULESOFT_DISCOVERYTAGS") {
            m.discovery_tags = v;
        }
        if let Some(v) = get("MULESOFT_DISCOVERYIGNORETAGS") {
            m.discovery_ignore_tags = v;
        }
        if let Some(v) = get("MULESOFT_CACHEPATH") {
            m.cache_path = PathBuf::from(v);
        }
        if let Some(v) = get("MULESOFT_PROXYURL") {
            m.proxy_url = Some(v);
        }
        if let Some(v) = flag("MULESOFT_SSL_INSECURESKIPVERIFY") {
            m.ssl.insecure_skip_verify = v;
        }
        if let Some(v) = get("MULESOFT_SSL_MINVERSION") {
            m.ssl.min_version = Some(v);
        }
        if let Some(v) = flag("MULESOFT_DISCOVERORIGINALRAML") {
            m.discover_original_raml = v;
        }
        if let Some(v) = flag("MULESOFT_USEMONITORINGAPI") {
            m.use_monitoring_api = v;
        }

        let c = &mut self.central;
        if let Some(v) = get("CENTRAL_URL") {
            c.url = v;
        }
        if let Some(v) = get("CENTRAL_TENANTID") {
            c.tenant_id = v;
        }
        if let Some(v) = get("CENTRAL_ENVIRONMENT") {
            c.environment = v;
        }
        if let Some(v) = get("CENTRAL_TEAMID") {
            c.team_id = v;
        }
        if let Some(v) = get("CENTRAL_TOKEN") {
            c.token = Some(v);
        }
        if let Some(v) = get("CENTRAL_INGESTIONURL") {
            c.ingestion_url = v;
        }

        if let Some(v) = flag("TRACEABILITY_COLLECTEVENTS") {
            self.traceability.collect_events = v;
        }
        if let Some(v) = flag("TRACEABILITY_COLLECTMETRICS") {
            self.traceability.collect_metrics = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log.level = v;
        }
    }

    /// Validate that required configuration is present and sane
    pub fn validate(&self) -> Result<()> {
        let m = &self.mulesoft;
        if m.environment.trim().is_empty() {
            return Err(ConfigError::MissingField("mulesoft.environment").into());
        }
        if m.org_name.trim().is_empty() {
            return Err(ConfigError::MissingField("mulesoft.orgName").into());
        }
        m.auth.credentials()?;

        if m.poll_interval < MIN_POLL_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "mulesoft.pollInterval must be at least {}, got {}",
                duration::format(MIN_POLL_INTERVAL),
                duration::format(m.poll_interval)
            ))
            .into());
        }
        if m.auth.lifetime < MIN_TOKEN_LIFETIME {
            return Err(ConfigError::Invalid(format!(
                "mulesoft.auth.lifetime must be at least {}, got {}",
                duration::format(MIN_TOKEN_LIFETIME),
                duration::format(m.auth.lifetime)
            ))
            .into());
        }
        if m.page_size == 0 {
            return Err(ConfigError::Invalid("mulesoft.pageSize must be positive".into()).into());
        }
        if m.channel_capacity == 0 {
            return Err(
                ConfigError::Invalid("mulesoft.channelCapacity must be positive".into()).into(),
            );
        }

        url::Url::parse(&m.anypoint_exchange_url).map_err(|e| {
            ConfigError::Invalid(format!("mulesoft.anypointExchangeUrl: {}", e))
        })?;
        if let Some(proxy) = m.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            url::Url::parse(proxy)
                .map_err(|e| ConfigError::Invalid(format!("mulesoft.proxyUrl: {}", e)))?;
        }
        if let Some(version) = m.ssl.min_version.as_deref()
            && !matches!(version, "1.2" | "1.3")
        {
            return Err(ConfigError::Invalid(format!(
                "mulesoft.ssl.minVersion must be 1.2 or 1.3, got {}",
                version
            ))
            .into());
        }
        for (key, value) in [
            ("central.url", &self.central.url),
            ("central.ingestionUrl", &self.central.ingestion_url),
        ] {
            if !value.is_empty() {
                url::Url::parse(value)
                    .map_err(|e| ConfigError::Invalid(format!("{}: {}", key, e)))?;
            }
        }

        Ok(())
    }
}
