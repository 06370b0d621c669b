//! Auth policy derivation from API Manager policies

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::models::Policy;

pub const CLIENT_ID_ENFORCEMENT: &str = "client-id-enforcement";
pub const SLA_BASED: &str = "sla-based";
pub const EXTERNAL_OAUTH2: &str = "external-oauth2-access-token-enforcement";

/// How consumers authenticate against an API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthPolicy {
    #[serde(rename = "apikey")]
    ApiKey,
    #[serde(rename = "oauth")]
    OAuth,
    #[serde(rename = "pass-through")]
    PassThrough,
}

impl AuthPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPolicy::ApiKey => "apikey",
            AuthPolicy::OAuth => "oauth",
            AuthPolicy::PassThrough => "pass-through",
        }
    }
}

impl fmt::Display for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived policy with the configuration of the policy it came from
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDetail {
    pub policy: AuthPolicy,
    pub is_sla_based: bool,
    pub configuration: Map<String, Value>,
}

impl PolicyDetail {
    pub fn pass_through() -> Self {
        Self {
            policy: AuthPolicy::PassThrough,
            is_sla_based: false,
            configuration: Map::new(),
        }
    }

    /// String view of a configuration value
    pub fn config_str(&self, key: &str) -> Option<String> {
        match self.configuration.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn is_client_id(template: &str) -> bool {
    template == CLIENT_ID_ENFORCEMENT || template.contains(SLA_BASED)
}

/// Derive the auth policy of an API.
///
/// Client-id style policies are searched first, then external OAuth2; within
/// each kind the first policy in platform order wins.
pub fn derive_auth_policy(policies: &[Policy]) -> PolicyDetail {
    if let Some(policy) = policies.iter().find(|p| is_client_id(p.template_id())) {
        return PolicyDetail {
            policy: AuthPolicy::ApiKey,
            is_sla_based: policy.template_id().contains(SLA_BASED),
            configuration: policy.configuration.clone(),
        };
    }

    if let Some(policy) = policies.iter().find(|p| p.template_id() == EXTERNAL_OAUTH2) {
        return PolicyDetail {
            policy: AuthPolicy::OAuth,
            is_sla_based: false,
            configuration: policy.configuration.clone(),
        };
    }

    PolicyDetail::pass_through()
}
