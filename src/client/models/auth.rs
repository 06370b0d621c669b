//! Authentication and account models

use serde::{Deserialize, Serialize};

/// Bearer token returned by either login flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime in seconds (client-credentials flow only)
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Current user as reported by `/accounts/api/me`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Root organization
    #[serde(default)]
    pub organization: Organization,

    /// Every business group the user belongs to
    #[serde(default)]
    pub member_of_organizations: Vec<Organization>,
}

impl User {
    /// Find the business group with the given name.
    ///
    /// The root organization also counts as a candidate.
    pub fn business_group(&self, name: &str) -> Option<&Organization> {
        self.member_of_organizations
            .iter()
            .chain(std::iter::once(&self.organization))
            .find(|org| org.name == name)
    }
}

/// Organization or business group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub sub_organization_ids: Vec<String>,
}

/// Anypoint environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub organization_id: String,

    #[serde(default)]
    pub is_production: bool,

    #[serde(default, rename = "type")]
    pub env_type: Option<String>,
}
