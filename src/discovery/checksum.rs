//! Change detection for discovered APIs

use sha2::{Digest, Sha256};

use super::policy::AuthPolicy;
use crate::client::models::Api;
use crate::error::Result;

/// SHA-256 over the serialized API record followed by the auth policy name.
///
/// Equal checksums mean the published service is current.
pub fn checksum(api: &Api, auth_policy: AuthPolicy) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(api)?);
    hasher.update(auth_policy.as_str().as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
