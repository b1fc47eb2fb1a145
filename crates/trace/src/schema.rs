//! Core event types and schema tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const EVENT_SCHEMA: &str = "tracemill.event.v1";
pub const RUN_SCHEMA: &str = "tracemill.run.v1";

/// Default actor tag stamped on imported events.
pub const DEFAULT_ACTOR: &str = "openclaw";

/// Semantic kind of a normalized trace event.
///
/// `Note` is the degradation target: classification never fails, it falls
/// back to `Note` for shapes it does not recognize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "agent.input")]
    AgentInput,
    #[serde(rename = "agent.output")]
    AgentOutput,
    #[serde(rename = "tool.call")]
    ToolCall,
    #[serde(rename = "tool.result")]
    ToolResult,
    #[serde(rename = "memory.read")]
    MemoryRead,
    #[serde(rename = "memory.write")]
    MemoryWrite,
    #[serde(rename = "cron.fire")]
    CronFire,
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "system.event")]
    SystemEvent,
    #[serde(rename = "note")]
    Note,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AgentInput => "agent.input",
            EventKind::AgentOutput => "agent.output",
            EventKind::ToolCall => "tool.call",
            EventKind::ToolResult => "tool.result",
            EventKind::MemoryRead => "memory.read",
            EventKind::MemoryWrite => "memory.write",
            EventKind::CronFire => "cron.fire",
            EventKind::Heartbeat => "heartbeat",
            EventKind::SystemEvent => "system.event",
            EventKind::Note => "note",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized trace event. Immutable once created.
///
/// `sequence_id` is >= 1 and monotonically non-decreasing within a run;
/// the importer assigns it, uniqueness within a run is the writer's contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "default_event_schema")]
    pub schema_version: String,
    pub event_id: String,
    pub run_id: String,
    pub sequence_id: u64,
    pub ts: DateTime<Utc>,
    pub kind: EventKind,
    pub actor: String,
    #[serde(default)]
    pub attrs: Map<String, Value>,
    #[serde(default)]
    pub token_estimate: Option<u64>,
    #[serde(default)]
    pub prompt_chars: Option<u64>,
    #[serde(default)]
    pub response_chars: Option<u64>,
    #[serde(default)]
    pub cost_usd_micros: Option<u64>,
}

fn default_event_schema() -> String {
    EVENT_SCHEMA.to_string()
}

impl Event {
    /// New event with a generated id and the current timestamp.
    pub fn new(run_id: impl Into<String>, sequence_id: u64, kind: EventKind) -> Self {
        Self {
            schema_version: EVENT_SCHEMA.to_string(),
            event_id: new_event_id(),
            run_id: run_id.into(),
            sequence_id,
            ts: Utc::now(),
            kind,
            actor: DEFAULT_ACTOR.to_string(),
            attrs: Map::new(),
            token_estimate: None,
            prompt_chars: None,
            response_chars: None,
            cost_usd_micros: None,
        }
    }
}

/// Run-level metadata written next to a run's event files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: String,
    pub run_id: String,
    pub session_key: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl RunMeta {
    pub fn new(run_id: impl Into<String>, session_key: Option<String>, source: impl Into<String>) -> Self {
        Self {
            schema_version: RUN_SCHEMA.to_string(),
            run_id: run_id.into(),
            session_key,
            source: source.into(),
            created_at: Utc::now(),
        }
    }
}

pub fn new_event_id() -> String {
    format!("ev_{}", Uuid::new_v4().simple())
}

/// Fresh run id: `run_<utc stamp>_<8 hex chars>`. Callers pass the result
/// around explicitly; there is no process-wide generator.
pub fn new_run_id() -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("run_{stamp}_{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults() {
        let e = Event::new("run_x", 1, EventKind::Note);
        assert_eq!(e.schema_version, EVENT_SCHEMA);
        assert!(e.event_id.starts_with("ev_"));
        assert_eq!(e.actor, DEFAULT_ACTOR);
        assert!(e.attrs.is_empty());
    }

    #[test]
    fn test_kind_serializes_dotted() {
        let json = serde_json::to_string(&EventKind::AgentInput).unwrap();
        assert_eq!(json, "\"agent.input\"");
        let back: EventKind = serde_json::from_str("\"tool.result\"").unwrap();
        assert_eq!(back, EventKind::ToolResult);
    }

    #[test]
    fn test_run_id_shape() {
        let id = new_run_id();
        assert!(id.starts_with("run_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_event_roundtrip_keeps_optional_fields() {
        let mut e = Event::new("run_x", 3, EventKind::AgentOutput);
        e.token_estimate = Some(12);
        e.cost_usd_micros = Some(200);
        let line = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&line).unwrap();
        assert_eq!(back.sequence_id, 3);
        assert_eq!(back.token_estimate, Some(12));
        assert_eq!(back.cost_usd_micros, Some(200));
        assert_eq!(back.kind, EventKind::AgentOutput);
    }
}
