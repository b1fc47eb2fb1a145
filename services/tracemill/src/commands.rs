//! Command handlers: wire the library crates to files, return the JSON
//! payload each command prints on stdout.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;

use dataset::{
    export_message_pairs, export_triplets, run_policy_search, smoke_check_messages,
    smoke_check_triplets, PolicySearchOptions, RewardMode,
};
use replay::SplitOptions;
use trace::{ImportOptions, Profile, RunMeta};

/// Which dataset row shape a command operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetFormat {
    Messages,
    Triplets,
}

pub fn run_init(
    root: &Path,
    run_id: Option<String>,
    session_key: Option<String>,
    source: &str,
) -> Result<Value> {
    let run_id = run_id.unwrap_or_else(trace::new_run_id);
    let run_dir = root.join(&run_id);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating run dir {}", run_dir.display()))?;

    let meta = RunMeta::new(run_id.clone(), session_key, source);
    let payload = serde_json::to_string_pretty(&meta)?;
    fs::write(run_dir.join("run.json"), payload + "\n")
        .with_context(|| format!("writing run.json under {}", run_dir.display()))?;

    info!(run_id = %run_id, "run initialized");
    Ok(json!({
        "ok": true,
        "run_id": run_id,
        "run_dir": run_dir.display().to_string(),
    }))
}

#[allow(clippy::too_many_arguments)]
pub fn import_session(
    session_jsonl: &Path,
    out: &Path,
    run_id: Option<String>,
    profile: Profile,
    include_content: bool,
    append: bool,
    start_sequence_id: u64,
) -> Result<Value> {
    let run_id = run_id.unwrap_or_else(trace::new_run_id);
    if out.exists() && !append {
        fs::remove_file(out).with_context(|| format!("replacing {}", out.display()))?;
    }

    let opts = ImportOptions { include_content, start_sequence_id, profile };
    let written = trace::import_session(session_jsonl, out, &run_id, &opts)
        .with_context(|| format!("importing {}", session_jsonl.display()))?;

    info!(run_id = %run_id, events = written, "session imported");
    Ok(json!({
        "ok": true,
        "run_id": run_id,
        "events_written": written,
        "out": out.display().to_string(),
    }))
}

pub fn stats(events_path: &Path) -> Result<Value> {
    let events = trace::read_events(events_path)
        .with_context(|| format!("reading {}", events_path.display()))?;

    let mut kinds: BTreeMap<String, u64> = BTreeMap::new();
    for event in &events {
        *kinds.entry(event.kind.as_str().to_string()).or_insert(0) += 1;
    }
    let token_total: u64 = events.iter().filter_map(|e| e.token_estimate).sum();
    let cost_micros: u64 = events.iter().filter_map(|e| e.cost_usd_micros).sum();

    Ok(json!({
        "ok": true,
        "events": events.len(),
        "token_estimate_total": token_total,
        "cost_usd": round6(cost_micros as f64 / 1_000_000.0),
        "kinds": kinds,
    }))
}

pub fn export(
    events_path: &Path,
    out: &Path,
    format: DatasetFormat,
    reward_mode: RewardMode,
) -> Result<Value> {
    let events = trace::read_events(events_path)
        .with_context(|| format!("reading {}", events_path.display()))?;

    let summary = match format {
        DatasetFormat::Messages => {
            let (rows, summary) = export_message_pairs(events);
            trace::write_rows(out, &rows)?;
            summary
        }
        DatasetFormat::Triplets => {
            let (rows, summary) = export_triplets(events, reward_mode);
            trace::write_rows(out, &rows)?;
            summary
        }
    };

    info!(format = %summary.format, rows = summary.rows_written, "dataset exported");
    Ok(json!({
        "ok": true,
        "format": summary.format,
        "out": out.display().to_string(),
        "rows_written": summary.rows_written,
        "skipped_missing_content": summary.skipped_missing_content,
        "skipped_unpaired": summary.skipped_unpaired,
    }))
}

pub fn replay_split(input: &Path, out_a: &Path, out_b: &Path, opts: &SplitOptions) -> Result<Value> {
    let rows = trace::read_rows(input).with_context(|| format!("reading {}", input.display()))?;
    let (a, b, summary) = replay::sample_and_split(rows, opts)?;
    trace::write_rows(out_a, &a)?;
    trace::write_rows(out_b, &b)?;

    Ok(json!({
        "ok": true,
        "input_rows": summary.input_rows,
        "sampled_rows": summary.sampled_rows,
        "out_a_rows": summary.out_a_rows,
        "out_b_rows": summary.out_b_rows,
        "out_a": out_a.display().to_string(),
        "out_b": out_b.display().to_string(),
    }))
}

pub fn replay_manifest(input: &Path, out: &Path) -> Result<Value> {
    let manifest = replay::build_manifest(input)
        .with_context(|| format!("fingerprinting {}", input.display()))?;

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(out, serde_json::to_string_pretty(&manifest)? + "\n")
        .with_context(|| format!("writing {}", out.display()))?;

    Ok(json!({
        "ok": true,
        "out": out.display().to_string(),
        "rows": manifest.rows,
        "sha256": manifest.sha256,
    }))
}

pub fn smoke(
    input: &Path,
    format: DatasetFormat,
    max_rows: Option<usize>,
    strict: bool,
) -> Result<(Value, i32)> {
    let rows = trace::read_rows(input).with_context(|| format!("reading {}", input.display()))?;
    let summary = match format {
        DatasetFormat::Messages => smoke_check_messages(&rows, max_rows),
        DatasetFormat::Triplets => smoke_check_triplets(&rows, max_rows),
    };

    let ok = summary.ok();
    let mut payload = serde_json::to_value(&summary)?;
    if let Some(map) = payload.as_object_mut() {
        map.insert("ok".to_string(), json!(ok));
    }
    let code = if strict && !ok { 2 } else { 0 };
    Ok((payload, code))
}

pub fn optimize(triplets: &Path, opts: &PolicySearchOptions, out: Option<&Path>) -> Result<Value> {
    let rows = trace::read_rows(triplets)
        .with_context(|| format!("reading {}", triplets.display()))?;
    let report = run_policy_search(rows, opts)?;

    if let Some(out) = out {
        if let Some(parent) = out.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(out, serde_json::to_string_pretty(&report)? + "\n")
            .with_context(|| format!("writing {}", out.display()))?;
    }

    info!(best = %report.best_policy, "policy search finished");
    let mut payload = serde_json::to_value(&report)?;
    if let Some(map) = payload.as_object_mut() {
        map.insert("ok".to_string(), json!(true));
    }
    Ok(payload)
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}
