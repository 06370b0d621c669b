//! Analytics event to log event mapping
//!
//! Every analytics record becomes a summary followed by an outbound leg
//! (client to gateway) and an inbound leg (gateway to backend).

use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;
use reqwest::StatusCode;

use crate::central::events::{
    ClientApplication, Direction, EntryPoint, HttpProtocol, LOG_EVENT_VERSION, LogEvent,
    LogEventType, Proxy, Summary, SummaryStatus, Team, TransactionEvent, TransactionStatus,
};
use crate::client::AnypointApi;
use crate::client::models::AnalyticsEvent;
use crate::error::Result;

const CLIENT: &str = "Client";
const GATEWAY: &str = "Mule.APIProxy";

pub fn format_proxy_id(api_id: &str) -> String {
    format!("remoteApiId_{}", api_id)
}

pub fn format_api_name(api_name: &str, api_version_name: &str) -> String {
    format!("{}:{}", api_name, api_version_name)
}

pub fn format_application_id(app_id: &str) -> String {
    format!("remoteAppId_{}", app_id)
}

pub fn format_txn_id(api_version_id: &str, message_id: &str) -> String {
    format!("{}-{}", api_version_id, message_id)
}

fn leg_id(message_id: &str, leg: u8) -> String {
    format!("{}-leg{}", message_id, leg)
}

fn status_text(code: i64) -> String {
    u16::try_from(code)
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

pub struct EventMapper {
    client: Arc<dyn AnypointApi>,
    environment_name: String,
    stage: String,
    team_id: String,
}

impl EventMapper {
    /// `environment_name` is the catalog environment, `stage` the Anypoint
    /// environment the traffic was observed in.
    pub fn new(
        client: Arc<dyn AnypointApi>,
        environment_name: impl Into<String>,
        stage: impl Into<String>,
        team_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            environment_name: environment_name.into(),
            stage: stage.into(),
            team_id: team_id.into(),
        }
    }

    /// Map one record to `[summary, outbound leg, inbound leg]`.
    pub async fn process_mapping(&self, event: &AnalyticsEvent) -> Result<Vec<LogEvent>> {
        let application = self.application(event).await;
        let trans_id = format_txn_id(&event.api_version_id, &event.message_id);
        let stamp = event.timestamp.timestamp_millis();

        let log_event = |event_type, summary, leg| LogEvent {
            version: LOG_EVENT_VERSION.to_string(),
            stamp,
            trans_id: trans_id.clone(),
            environment_name: self.environment_name.clone(),
            event_type,
            transaction_summary: summary,
            transaction_event: leg,
        };

        let summary = Summary {
            status: SummaryStatus::from_status_code(event.status_code),
            status_detail: status_text(event.status_code),
            duration: event.response_time,
            team: (!self.team_id.is_empty()).then(|| Team {
                id: self.team_id.clone(),
            }),
            proxy: Proxy {
                id: format_proxy_id(&event.api_id),
                name: format_api_name(&event.api_name, &event.api_version_name),
                revision: 1,
                stage: self.stage.clone(),
            },
            application,
            entry_point: EntryPoint {
                kind: "http".into(),
                method: event.verb.clone(),
                path: event.resource_path.clone(),
                host: event.client_ip.clone(),
            },
        };

        let protocol = self.protocol(event)?;
        let outbound = TransactionEvent {
            id: leg_id(&event.message_id, 0),
            parent_id: None,
            source: CLIENT.into(),
            destination: GATEWAY.into(),
            duration: event.response_time,
            direction: Direction::Outbound,
            status: TransactionStatus::from_status_code(event.status_code),
            protocol: protocol.clone(),
        };
        let inbound = TransactionEvent {
            id: leg_id(&event.message_id, 1),
            parent_id: Some(outbound.id.clone()),
            source: GATEWAY.into(),
            destination: format!("Backend{}", event.api_name),
            direction: Direction::Inbound,
            protocol,
            ..outbound.clone()
        };

        Ok(vec![
            log_event(LogEventType::Summary, Some(summary), None),
            log_event(LogEventType::Event, None, Some(outbound)),
            log_event(LogEventType::Event, None, Some(inbound)),
        ])
    }

    async fn application(&self, event: &AnalyticsEvent) -> Option<ClientApplication> {
        if event.application.is_empty() {
            return None;
        }
        let name = match self.client.get_client_application(&event.application).await {
            Ok(app) => app.name,
            Err(e) => {
                warn!(
                    "Could not look up application {} for message {}: {}",
                    event.application, event.message_id, e
                );
                event.application_name.clone()
            }
        };
        Some(ClientApplication {
            id: format_application_id(&event.application),
            name,
        })
    }

    fn protocol(&self, event: &AnalyticsEvent) -> Result<HttpProtocol> {
        let user_agent = format!("{} {}", event.user_agent_name, event.user_agent_version)
            .trim()
            .to_string();
        let request_headers = BTreeMap::from([
            ("User-AgentName", user_agent.clone()),
            ("Request-ID", event.message_id.clone()),
            ("Forwarded-For", event.client_ip.clone()),
            ("Violated-Policies", event.violated_policy_name.clone()),
        ]);
        let response_headers = BTreeMap::from([
            ("Request-Outcome", event.request_outcome.clone()),
            ("Response-Time", event.response_time.to_string()),
        ]);

        Ok(HttpProtocol {
            kind: "http".into(),
            uri: event.resource_path.clone(),
            method: event.verb.clone(),
            status: event.status_code,
            status_text: status_text(event.status_code),
            host: event.client_ip.clone(),
            user_agent,
            request_headers: serde_json::to_string(&request_headers)?,
            response_headers: serde_json::to_string(&response_headers)?,
            bytes_received: event.request_size,
            bytes_sent: event.response_size,
        })
    }
}
