use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single telemetry event sent by a game client
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameEvent {
    pub event_id: String,
    pub event_type: String,
    pub event_name: String,
    pub event_version: String,
    pub event_timestamp: i64,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub event_data: Value,
}

/// Queue message produced by the events API: one batch per application
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestMessage {
    pub application_id: String,
    pub body: IngestBody,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestBody {
    #[serde(default)]
    pub events: Vec<GameEvent>,
}

impl IngestMessage {
    pub fn events(&self) -> &[GameEvent] {
        &self.body.events
    }
}
