//! Health checks reported by `status` and at startup

use async_trait::async_trait;
use serde::Serialize;

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "details", rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Fail(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

/// A named dependency probe
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> HealthStatus;
}

/// Outcome of one named check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    #[serde(flatten)]
    pub status: HealthStatus,
}

/// Run every check in order.
pub async fn run_checks(checks: &[&dyn HealthCheck]) -> Vec<CheckResult> {
    let mut results = Vec::with_capacity(checks.len());
    for check in checks {
        results.push(CheckResult {
            name: check.name().to_string(),
            status: check.check().await,
        });
    }
    results
}
