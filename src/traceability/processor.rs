//! Turns analytics records into transport events

use std::collections::BTreeMap;

use log::warn;
use serde_json::Value;

use super::mapper::EventMapper;
use crate::central::events::TransportEvent;
use crate::client::models::AnalyticsEvent;
use crate::error::Result;

pub struct EventProcessor {
    mapper: EventMapper,
    fields: BTreeMap<String, String>,
}

impl EventProcessor {
    /// `fields` are attached to every transport event.
    pub fn new(mapper: EventMapper, fields: BTreeMap<String, String>) -> Self {
        Self { mapper, fields }
    }

    /// Decode either a raw analytics record or a transport event whose
    /// `message` holds one. Undecodable input yields nothing.
    pub async fn process(&self, input: &[u8]) -> Vec<TransportEvent> {
        match decode(input) {
            Ok(event) => self.process_event(&event).await,
            Err(e) => {
                warn!("Dropping undecodable analytics record: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn process_event(&self, event: &AnalyticsEvent) -> Vec<TransportEvent> {
        let log_events = match self.mapper.process_mapping(event).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Could not map message {}: {}", event.message_id, e);
                return Vec::new();
            }
        };
        log_events
            .iter()
            .filter_map(|log_event| {
                TransportEvent::from_log_event(log_event, &self.fields)
                    .map_err(|e| warn!("Could not frame message {}: {}", event.message_id, e))
                    .ok()
            })
            .collect()
    }
}

fn decode(input: &[u8]) -> Result<AnalyticsEvent> {
    let value: Value = serde_json::from_slice(input)?;
    let event = match value.get("message").and_then(Value::as_str) {
        Some(message) => serde_json::from_str(message)?,
        None => serde_json::from_value(value)?,
    };
    Ok(event)
}
