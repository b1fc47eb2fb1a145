//! Total classification of raw rows into event kinds plus usage numbers.
//!
//! Classification is a pure function of the row and never errors: absent
//! or malformed fields degrade to neutral defaults and unknown shapes land
//! on [`EventKind::Note`].

use serde_json::Value;

use crate::raw::{as_text, tool_call_names, RawRow};
use crate::schema::EventKind;

const HEARTBEAT_MARKER: &str = "heartbeat_ok";

/// Everything the classifier pulls out of one raw row.
#[derive(Clone, Debug)]
pub struct Classified {
    pub kind: EventKind,
    pub role: String,
    pub text: String,
    pub tool_calls: Vec<String>,
    pub token_estimate: u64,
    pub prompt_chars: Option<u64>,
    pub response_chars: Option<u64>,
    pub cost_usd_micros: Option<u64>,
}

/// Classify one raw row and derive its usage numbers.
pub fn classify_row(value: &Value) -> Classified {
    let row = RawRow::new(value);
    let (role, text, token_total, cost_usd, tool_calls) = extract_fields(row);
    let kind = infer_kind(row, &role, &text, &tool_calls);

    let chars = text.chars().count() as u64;
    let token_estimate = match token_total {
        Some(n) => n,
        None if text.is_empty() => 0,
        None => (chars + 3) / 4,
    };
    let prompt_chars = (role == "user").then_some(chars);
    let response_chars = matches!(role.as_str(), "assistant" | "system" | "toolresult").then_some(chars);
    let cost_usd_micros = cost_usd
        .filter(|c| c.is_finite() && *c >= 0.0)
        .map(|c| (c * 1_000_000.0).round() as u64);

    Classified {
        kind,
        role,
        text,
        tool_calls,
        token_estimate,
        prompt_chars,
        response_chars,
        cost_usd_micros,
    }
}

/// Pull (role, text, usage total, cost) out of a row. Message rows nest
/// these under `message`; everything else reads top-level fields.
fn extract_fields(row: RawRow) -> (String, String, Option<u64>, Option<f64>, Vec<String>) {
    if row.row_type() == "message" {
        if let Some(msg) = row.message() {
            let role = msg
                .get("role")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase();
            let content = msg.get("content");
            let text = as_text(content);
            let usage = msg.get("usage").and_then(Value::as_object);
            let token_total = usage
                .and_then(|u| u.get("totalTokens"))
                .and_then(Value::as_u64);
            let cost_usd = usage
                .and_then(|u| u.get("cost"))
                .and_then(Value::as_object)
                .and_then(|c| c.get("total"))
                .and_then(Value::as_f64);
            let tool_calls = tool_call_names(content);
            return (role, text, token_total, cost_usd, tool_calls);
        }
    }

    let role = row.role();
    let content = row
        .get("text")
        .or_else(|| row.get("content"))
        .or_else(|| row.get("summary"));
    (role, as_text(content), None, None, Vec::new())
}

/// Classification precedence; first match wins.
fn infer_kind(row: RawRow, role: &str, text: &str, tool_calls: &[String]) -> EventKind {
    let row_type = row.row_type();
    let lower_text = text.to_lowercase();

    if lower_text.contains(HEARTBEAT_MARKER) || row_type == "heartbeat" {
        return EventKind::Heartbeat;
    }

    if row_type == "session" || row_type == "compaction" {
        return EventKind::SystemEvent;
    }

    if row_type == "custom" && row.custom_type().starts_with("model") {
        return EventKind::SystemEvent;
    }

    if row_type.starts_with("tool") {
        if row_type.contains("result") {
            return EventKind::ToolResult;
        }
        return EventKind::ToolCall;
    }

    if row_type == "message" {
        match role {
            "toolresult" => return EventKind::ToolResult,
            "assistant" if !tool_calls.is_empty() => return EventKind::ToolCall,
            "assistant" => return EventKind::AgentOutput,
            "user" => {
                let system = looks_like_system_text(text);
                if system && looks_like_cron_text(text) {
                    return EventKind::CronFire;
                }
                if system {
                    return EventKind::SystemEvent;
                }
                return EventKind::AgentInput;
            }
            _ => {}
        }
    }

    EventKind::Note
}

fn looks_like_system_text(text: &str) -> bool {
    let stripped = text.trim();
    stripped.starts_with("System:") || stripped.starts_with("Note:")
}

fn looks_like_cron_text(text: &str) -> bool {
    text.to_lowercase().contains("cron:")
}
