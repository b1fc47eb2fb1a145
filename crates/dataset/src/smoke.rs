//! Trainer-side smoke checks for exported dataset rows.
//!
//! Lightweight shape validation run from the consumer's point of view:
//! schema tags, role ordering, non-empty texts, duplicate fingerprints.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::export::{MESSAGES_SCHEMA, TRIPLET_SCHEMA};

#[derive(Clone, Debug, Default, Serialize)]
pub struct SmokeSummary {
    pub format: String,
    pub rows_total: u64,
    pub rows_ok: u64,
    pub rows_bad: u64,
    pub duplicate_rows: u64,
    pub sample_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_user_chars: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_assistant_chars: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_state_chars: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_action_chars: Option<f64>,
}

impl SmokeSummary {
    /// A check passes when at least one row exists and none are bad.
    pub fn ok(&self) -> bool {
        self.rows_bad == 0 && self.rows_total > 0
    }
}

/// Validate message-pair rows.
pub fn smoke_check_messages(rows: &[Value], max_rows: Option<usize>) -> SmokeSummary {
    let rows = limit(rows, max_rows);
    let mut summary = SmokeSummary {
        format: "messages".to_string(),
        rows_total: rows.len() as u64,
        ..Default::default()
    };

    let mut user_chars: Vec<u64> = Vec::new();
    let mut assistant_chars: Vec<u64> = Vec::new();
    let mut seen: HashSet<[u8; 32]> = HashSet::new();

    for row in rows {
        let schema_ok = row.get("schema").and_then(Value::as_str) == Some(MESSAGES_SCHEMA);
        let len_ok = row
            .get("messages")
            .and_then(Value::as_array)
            .is_some_and(|m| m.len() >= 2);
        let roles_ok = row.pointer("/messages/0/role").and_then(Value::as_str) == Some("user")
            && row.pointer("/messages/1/role").and_then(Value::as_str) == Some("assistant");
        let user_text = row
            .pointer("/messages/0/content")
            .and_then(Value::as_str)
            .unwrap_or("");
        let assistant_text = row
            .pointer("/messages/1/content")
            .and_then(Value::as_str)
            .unwrap_or("");

        let row_ok = schema_ok
            && len_ok
            && roles_ok
            && !user_text.trim().is_empty()
            && !assistant_text.trim().is_empty();

        if !row_ok {
            summary.rows_bad += 1;
            continue;
        }

        summary.rows_ok += 1;
        user_chars.push(user_text.chars().count() as u64);
        assistant_chars.push(assistant_text.chars().count() as u64);

        let fingerprint: [u8; 32] =
            blake3::hash(format!("{user_text}\n{assistant_text}").as_bytes()).into();
        if !seen.insert(fingerprint) {
            summary.duplicate_rows += 1;
        }
        record_sample_id(&mut summary, row);
    }

    summary.avg_user_chars = avg(&user_chars);
    summary.avg_assistant_chars = avg(&assistant_chars);
    summary
}

/// Validate triplet rows.
pub fn smoke_check_triplets(rows: &[Value], max_rows: Option<usize>) -> SmokeSummary {
    let rows = limit(rows, max_rows);
    let mut summary = SmokeSummary {
        format: "triplets".to_string(),
        rows_total: rows.len() as u64,
        ..Default::default()
    };

    let mut state_chars: Vec<u64> = Vec::new();
    let mut action_chars: Vec<u64> = Vec::new();
    let mut seen: HashSet<[u8; 32]> = HashSet::new();

    for row in rows {
        let schema_ok = row.get("schema").and_then(Value::as_str) == Some(TRIPLET_SCHEMA);
        let state_text = row.get("state_text").and_then(Value::as_str).unwrap_or("");
        let action_text = row.get("action_text").and_then(Value::as_str).unwrap_or("");
        let reward_ok = matches!(
            row.get("reward"),
            None | Some(Value::Null) | Some(Value::Number(_))
        );

        let row_ok = schema_ok
            && reward_ok
            && !state_text.trim().is_empty()
            && !action_text.trim().is_empty();

        if !row_ok {
            summary.rows_bad += 1;
            continue;
        }

        summary.rows_ok += 1;
        state_chars.push(state_text.chars().count() as u64);
        action_chars.push(action_text.chars().count() as u64);

        let fingerprint: [u8; 32] =
            blake3::hash(format!("{state_text}\n{action_text}").as_bytes()).into();
        if !seen.insert(fingerprint) {
            summary.duplicate_rows += 1;
        }
        record_sample_id(&mut summary, row);
    }

    summary.avg_state_chars = avg(&state_chars);
    summary.avg_action_chars = avg(&action_chars);
    summary
}

fn limit(rows: &[Value], max_rows: Option<usize>) -> &[Value] {
    match max_rows {
        Some(cap) if cap < rows.len() => &rows[..cap],
        _ => rows,
    }
}

fn record_sample_id(summary: &mut SmokeSummary, row: &Value) {
    if summary.sample_ids.len() >= 5 {
        return;
    }
    if let Some(id) = row.get("id").and_then(Value::as_str) {
        if !id.is_empty() {
            summary.sample_ids.push(id.to_string());
        }
    }
}

fn avg(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<u64>() as f64 / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
