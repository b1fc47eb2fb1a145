//! Streaming session importer: raw session JSONL in, trace events out.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::classify::{classify_row, Classified};
use crate::io::JsonlWriter;
use crate::schema::{new_event_id, Event, DEFAULT_ACTOR, EVENT_SCHEMA};
use crate::Result;

const FLUSH_EVERY: usize = 200;

/// How much payload an imported event keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Metadata only, no content payload.
    Lean,
    /// Content text retained for downstream pairing/export.
    Bridge,
    /// Content plus the raw source row.
    Debug,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Lean => "lean",
            Profile::Bridge => "bridge",
            Profile::Debug => "debug",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImportOptions {
    pub include_content: bool,
    pub start_sequence_id: u64,
    pub profile: Profile,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            include_content: false,
            start_sequence_id: 1,
            profile: Profile::Lean,
        }
    }
}

/// Import one session file into `out_events`, appending events stamped with
/// `run_id` and sequential ids from `start_sequence_id`. Returns the number
/// of events written.
///
/// Blank and malformed lines are skipped silently; ingestion is total and
/// never blocks on unknown log shapes.
pub fn import_session(
    session_jsonl: &Path,
    out_events: &Path,
    run_id: &str,
    opts: &ImportOptions,
) -> Result<u64> {
    let mut writer = JsonlWriter::new(out_events, FLUSH_EVERY)?;
    let keep_content = opts.include_content || matches!(opts.profile, Profile::Bridge | Profile::Debug);

    let reader = BufReader::new(File::open(session_jsonl)?);
    let mut seq = opts.start_sequence_id.max(1);
    let mut count = 0u64;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: Value = match serde_json::from_str(line) {
            Ok(row) => row,
            Err(_) => continue,
        };

        let classified = classify_row(&row);
        let event = build_event(&row, classified, run_id, seq, opts.profile, keep_content);
        writer.append(&event)?;
        seq += 1;
        count += 1;
    }

    writer.close()?;
    Ok(count)
}

fn build_event(
    row: &Value,
    classified: Classified,
    run_id: &str,
    sequence_id: u64,
    profile: Profile,
    keep_content: bool,
) -> Event {
    let mut attrs = Map::new();
    attrs.insert(
        "role".to_string(),
        if classified.role.is_empty() { Value::Null } else { json!(classified.role) },
    );
    attrs.insert("type".to_string(), row.get("type").cloned().unwrap_or(Value::Null));
    attrs.insert("content_chars".to_string(), json!(classified.text.chars().count()));
    attrs.insert("profile".to_string(), json!(profile.as_str()));

    if let Some(custom) = row.get("customType").and_then(Value::as_str) {
        if !custom.is_empty() {
            attrs.insert("custom_type".to_string(), json!(custom));
        }
    }
    if !classified.tool_calls.is_empty() {
        attrs.insert("tool_call_count".to_string(), json!(classified.tool_calls.len()));
        attrs.insert("tool_calls".to_string(), json!(classified.tool_calls));
    }
    if keep_content {
        attrs.insert("content".to_string(), json!(classified.text));
        if profile == Profile::Debug {
            attrs.insert("raw".to_string(), row.clone());
        }
    }

    Event {
        schema_version: EVENT_SCHEMA.to_string(),
        event_id: new_event_id(),
        run_id: run_id.to_string(),
        sequence_id,
        ts: chrono::Utc::now(),
        kind: classified.kind,
        actor: DEFAULT_ACTOR.to_string(),
        attrs,
        token_estimate: Some(classified.token_estimate),
        prompt_chars: classified.prompt_chars,
        response_chars: classified.response_chars,
        cost_usd_micros: classified.cost_usd_micros,
    }
}
