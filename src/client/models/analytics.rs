//! Analytics event model
//!
//! The events endpoint labels fields with display names ("API ID",
//! "Status Code") and is inconsistent about quoting numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::de::{lenient_i64, lenient_string};

/// One request record from the analytics events API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    #[serde(rename = "API ID", default, deserialize_with = "lenient_string")]
    pub api_id: String,

    #[serde(rename = "API Version ID", default, deserialize_with = "lenient_string")]
    pub api_version_id: String,

    #[serde(rename = "API Version Name", default)]
    pub api_version_name: String,

    #[serde(rename = "API Name", default)]
    pub api_name: String,

    /// Client application ID, empty for anonymous traffic
    #[serde(rename = "Application", default, deserialize_with = "lenient_string")]
    pub application: String,

    #[serde(rename = "Application Name", default)]
    pub application_name: String,

    #[serde(rename = "Message ID", default)]
    pub message_id: String,

    #[serde(rename = "Client IP", default)]
    pub client_ip: String,

    #[serde(rename = "Resource Path", default)]
    pub resource_path: String,

    #[serde(rename = "Verb", default)]
    pub verb: String,

    #[serde(rename = "Status Code", default, deserialize_with = "lenient_i64")]
    pub status_code: i64,

    #[serde(rename = "Request Size", default, deserialize_with = "lenient_i64")]
    pub request_size: i64,

    #[serde(rename = "Response Size", default, deserialize_with = "lenient_i64")]
    pub response_size: i64,

    #[serde(rename = "Response Time", default, deserialize_with = "lenient_i64")]
    pub response_time: i64,

    #[serde(rename = "User Agent Name", default)]
    pub user_agent_name: String,

    #[serde(rename = "User Agent Version", default)]
    pub user_agent_version: String,

    #[serde(rename = "Request Outcome", default)]
    pub request_outcome: String,

    #[serde(rename = "Violated Policy Name", default)]
    pub violated_policy_name: String,

    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Field list requested from the events endpoint
pub const ANALYTICS_FIELDS: &str = "Application Name.Application.Browser.City.Client IP.\
Continent.Country.Hardware Platform.Message ID.OS Family.OS Major Version.OS Minor Version.\
OS Version.Postal Code.Request Outcome.Request Size.Resource Path.Response Size.Response Time.\
Status Code.Timezone.User Agent Name.User Agent Version.Verb.Violated Policy Name";
