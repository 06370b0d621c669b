//! Monitoring models: archive summaries and the live metric query

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::de::{lenient_i64, lenient_string};

/// Pre-aggregated request bucket for one status code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringMetric {
    pub time: DateTime<Utc>,
    pub status_code: i64,
    pub count: i64,
    pub response_time_min: i64,
    pub response_time_max: i64,
    /// Sum of response times
    #[serde(default)]
    pub response_time_sum: i64,
    /// Sum of squared response times
    #[serde(default)]
    pub response_time_sos: i64,
}

/// Files available in the monitoring archive for one day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveDescriptor {
    #[serde(default)]
    pub resources: Vec<ArchiveFile>,
}

/// A single archived summary file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveFile {
    pub id: String,

    #[serde(default)]
    pub time: Option<i64>,

    #[serde(default)]
    pub size: Option<i64>,
}

/// One newline-delimited record of an archived summary file
#[derive(Debug, Clone, Deserialize)]
pub struct MetricLine {
    #[serde(default)]
    pub format: String,

    /// Bucket time in epoch milliseconds
    #[serde(deserialize_with = "lenient_i64")]
    pub time: i64,

    #[serde(default, rename = "type")]
    pub line_type: String,

    #[serde(default)]
    pub commons: HashMap<String, Value>,

    #[serde(default)]
    pub events: Vec<ArchivedBucket>,
}

/// Raw bucket inside a [`MetricLine`]
#[derive(Debug, Clone, Deserialize)]
pub struct ArchivedBucket {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub response_code: i64,

    #[serde(rename = "request_size.count", default, deserialize_with = "lenient_i64")]
    pub count: i64,

    #[serde(rename = "response_time.max", default, deserialize_with = "lenient_i64")]
    pub max: i64,

    #[serde(rename = "response_time.min", default, deserialize_with = "lenient_i64")]
    pub min: i64,

    #[serde(rename = "response_time.sum", default, deserialize_with = "lenient_i64")]
    pub sum: i64,

    #[serde(rename = "response_time.sos", default, deserialize_with = "lenient_i64")]
    pub sos: i64,
}

impl MetricLine {
    /// API ID recorded in the line's common dimensions
    pub fn api_id(&self) -> Option<String> {
        match self.commons.get("api_id")? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Flatten into one metric per status code
    pub fn into_metrics(self) -> Vec<MonitoringMetric> {
        let Some(time) = Utc.timestamp_millis_opt(self.time).single() else {
            return Vec::new();
        };
        self.events
            .into_iter()
            .map(|b| MonitoringMetric {
                time,
                status_code: b.response_code,
                count: b.count,
                response_time_min: b.min,
                response_time_max: b.max,
                response_time_sum: b.sum,
                response_time_sos: b.sos,
            })
            .collect()
    }
}

/// Visualizer boot descriptor naming the influx data source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootData {
    #[serde(rename = "Settings", default)]
    pub settings: BootSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootSettings {
    #[serde(default)]
    pub datasources: BootDataSources,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootDataSources {
    #[serde(default)]
    pub influxdb: InfluxDataSource,
}

/// Database and proxy ID for metric queries
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InfluxDataSource {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default)]
    pub database: String,
}

/// Influx query response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfluxResponse {
    #[serde(default)]
    pub results: Vec<InfluxResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfluxResult {
    #[serde(default)]
    pub series: Vec<InfluxSeries>,
}

/// One series grouped by response code
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfluxSeries {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl InfluxSeries {
    fn column(&self, row: &[Value], name: &str) -> i64 {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| row.get(i))
            .and_then(Value::as_f64)
            .map(|v| v as i64)
            .unwrap_or(0)
    }

    /// Convert rows into metrics, skipping empty buckets
    pub fn to_metrics(&self) -> Vec<MonitoringMetric> {
        let status_code = self
            .tags
            .get("response_code")
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);

        self.values
            .iter()
            .filter_map(|row| {
                let count = self.column(row, "request_count");
                if count == 0 {
                    return None;
                }
                let time = Utc.timestamp_millis_opt(self.column(row, "time")).single()?;
                Some(MonitoringMetric {
                    time,
                    status_code,
                    count,
                    response_time_min: self.column(row, "response_min"),
                    response_time_max: self.column(row, "response_max"),
                    response_time_sum: 0,
                    response_time_sos: 0,
                })
            })
            .collect()
    }
}

/// Parse a newline-delimited summary file. Unreadable lines are skipped.
pub fn parse_summary_file(text: &str) -> Vec<MonitoringMetric> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<MetricLine>(line) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("Skipping unreadable summary line: {}", e);
                None
            }
        })
        .flat_map(MetricLine::into_metrics)
        .collect()
}

impl InfluxResponse {
    pub fn into_metrics(self) -> Vec<MonitoringMetric> {
        self.results
            .iter()
            .flat_map(|r| r.series.iter())
            .flat_map(InfluxSeries::to_metrics)
            .collect()
    }
}
