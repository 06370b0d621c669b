//! Observer event model
//!
//! A request produces one transaction summary and two transaction legs.
//! Metric events carry pre-aggregated buckets for a single API.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const LOG_EVENT_VERSION: &str = "4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEventType {
    #[serde(rename = "transactionSummary")]
    Summary,
    #[serde(rename = "transactionEvent")]
    Event,
}

/// Outcome of a whole transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SummaryStatus {
    Success,
    Failure,
    Exception,
    Unknown,
}

impl SummaryStatus {
    pub fn from_status_code(code: i64) -> Self {
        match code {
            200..=399 => SummaryStatus::Success,
            400..=499 => SummaryStatus::Failure,
            500..=510 => SummaryStatus::Exception,
            _ => SummaryStatus::Unknown,
        }
    }
}

/// Outcome of a single leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TransactionStatus {
    Pass,
    Fail,
}

impl TransactionStatus {
    pub fn from_status_code(code: i64) -> Self {
        if code >= 400 {
            TransactionStatus::Fail
        } else {
            TransactionStatus::Pass
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
    pub path: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    pub id: String,
    pub name: String,
    pub revision: i64,
    pub stage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientApplication {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub status: SummaryStatus,
    pub status_detail: String,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub proxy: Proxy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ClientApplication>,
    pub entry_point: EntryPoint,
}

/// HTTP details of one leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpProtocol {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
    pub method: String,
    pub status: i64,
    pub status_text: String,
    pub host: String,
    pub user_agent: String,
    /// JSON object encoded as a string
    pub request_headers: String,
    /// JSON object encoded as a string
    pub response_headers: String,
    pub bytes_received: i64,
    pub bytes_sent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub source: String,
    pub destination: String,
    pub duration: i64,
    pub direction: Direction,
    pub status: TransactionStatus,
    pub protocol: HttpProtocol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub version: String,
    /// Event time, epoch milliseconds
    pub stamp: i64,
    #[serde(rename = "transactionId")]
    pub trans_id: String,
    pub environment_name: String,
    #[serde(rename = "type")]
    pub event_type: LogEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_event: Option<TransactionEvent>,
}

/// A log event framed for the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportEvent {
    #[serde(rename = "@timestamp")]
    pub timestamp: String,
    /// The serialized [`LogEvent`]
    pub message: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl TransportEvent {
    pub fn from_log_event(event: &LogEvent, fields: &BTreeMap<String, String>) -> Result<Self> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(event.stamp)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(Self {
            timestamp,
            message: serde_json::to_string(event)?,
            fields: fields.clone(),
        })
    }
}

/// Aggregated traffic of one API for one status code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "apiID")]
    pub api_id: String,
    pub instance: String,
    pub status_code: i64,
    pub count: i64,
    pub max: i64,
    pub min: i64,
}
