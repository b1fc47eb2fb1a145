//! Offline policy search over a fixed catalog of text transforms.

use std::collections::BTreeMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::export::TRIPLET_SCHEMA;
use crate::reward::heuristic_reward;
use crate::{DatasetError, Result};

const NS_VAL_SPLIT: &str = "val-split";
const SHORT_SAFE_LIMIT: usize = 220;

/// Case-insensitive whole-word replacements applied by `sanitize_errors`.
static SANITIZE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("error", "issue"),
        ("failed", "not completed"),
        ("exception", "unexpected condition"),
        ("timeout", "time limit"),
    ]
    .into_iter()
    .map(|(word, replacement)| {
        let pattern = Regex::new(&format!(r"(?i)\b{word}\b")).expect("fixed sanitize pattern");
        (pattern, replacement)
    })
    .collect()
});

/// The fixed transform catalog, in evaluation order. `Identity` is the
/// baseline and is always evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Identity,
    SanitizeErrors,
    SafeRewrite,
    ShortSafe,
}

impl Policy {
    pub const CATALOG: [Policy; 4] = [
        Policy::Identity,
        Policy::SanitizeErrors,
        Policy::SafeRewrite,
        Policy::ShortSafe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Identity => "identity",
            Policy::SanitizeErrors => "sanitize_errors",
            Policy::SafeRewrite => "safe_rewrite",
            Policy::ShortSafe => "short_safe",
        }
    }

    /// Apply the transform to an action text.
    pub fn apply(&self, action_text: &str) -> String {
        match self {
            Policy::Identity => action_text.to_string(),
            Policy::SanitizeErrors => sanitize_error_terms(action_text),
            Policy::SafeRewrite => {
                let cleaned = sanitize_error_terms(action_text);
                let trimmed = cleaned.trim();
                if trimmed.is_empty() {
                    "Result summary: action completed.".to_string()
                } else {
                    format!("Result summary: {trimmed}")
                }
            }
            Policy::ShortSafe => {
                let cleaned = sanitize_error_terms(action_text);
                let trimmed = cleaned.trim();
                if trimmed.is_empty() {
                    return "Completed.".to_string();
                }
                let first_line = trimmed.lines().next().unwrap_or("");
                first_line.chars().take(SHORT_SAFE_LIMIT).collect()
            }
        }
    }
}

impl FromStr for Policy {
    type Err = DatasetError;

    fn from_str(name: &str) -> Result<Self> {
        Policy::CATALOG
            .iter()
            .copied()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| DatasetError::UnknownPolicy(name.to_string()))
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn sanitize_error_terms(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in SANITIZE_RULES.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out
}

#[derive(Clone, Debug)]
pub struct PolicySearchOptions {
    pub val_ratio: f64,
    pub seed: u64,
    pub max_rows: Option<usize>,
}

impl Default for PolicySearchOptions {
    fn default() -> Self {
        Self {
            val_ratio: 0.2,
            seed: 42,
            max_rows: None,
        }
    }
}

/// Outcome of one policy-search run over a triplet dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub rows_total: u64,
    pub rows_train: u64,
    pub rows_val: u64,
    pub baseline_policy: String,
    pub best_policy: String,
    pub baseline_train_reward: f64,
    pub baseline_val_reward: f64,
    pub best_train_reward: f64,
    pub best_val_reward: f64,
    pub uplift_val_abs: f64,
    pub uplift_val_pct: f64,
}

/// Evaluate the catalog against a deterministic train/val split of the
/// triplet rows and report the best policy by mean train reward.
///
/// Rows that do not carry the triplet schema tag are ignored. The stored
/// middle-kind histogram is reused unchanged; only the action text is
/// transformed before scoring.
pub fn run_policy_search(rows: Vec<Value>, opts: &PolicySearchOptions) -> Result<OptimizationReport> {
    if !(opts.val_ratio > 0.0 && opts.val_ratio < 1.0) {
        return Err(DatasetError::InvalidRatio(opts.val_ratio));
    }

    let mut rows = rows;
    if let Some(cap) = opts.max_rows {
        rows.truncate(cap);
    }
    let rows: Vec<Value> = rows
        .into_iter()
        .filter(|row| row.get("schema").and_then(Value::as_str) == Some(TRIPLET_SCHEMA))
        .collect();

    let mut train: Vec<&Value> = Vec::new();
    let mut val: Vec<&Value> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let rid = row_id(row, idx);
        if replay::unit_score(NS_VAL_SPLIT, opts.seed, &rid) < opts.val_ratio {
            val.push(row);
        } else {
            train.push(row);
        }
    }

    let baseline = Policy::Identity;
    let baseline_train = mean_reward(&train, baseline);
    let baseline_val = mean_reward(&val, baseline);

    let mut best = baseline;
    let mut best_train = baseline_train;
    let mut best_val = baseline_val;
    for policy in Policy::CATALOG {
        let train_reward = mean_reward(&train, policy);
        if train_reward > best_train {
            best = policy;
            best_train = train_reward;
            best_val = mean_reward(&val, policy);
        }
    }

    let uplift_val_abs = round6(best_val - baseline_val);
    let uplift_val_pct = if baseline_val <= 0.0 {
        0.0
    } else {
        round4(uplift_val_abs / baseline_val * 100.0)
    };

    Ok(OptimizationReport {
        rows_total: rows.len() as u64,
        rows_train: train.len() as u64,
        rows_val: val.len() as u64,
        baseline_policy: baseline.as_str().to_string(),
        best_policy: best.as_str().to_string(),
        baseline_train_reward: baseline_train,
        baseline_val_reward: baseline_val,
        best_train_reward: best_train,
        best_val_reward: best_val,
        uplift_val_abs,
        uplift_val_pct,
    })
}

fn row_id(row: &Value, idx: usize) -> String {
    if let Some(id) = row.get("id").and_then(Value::as_str) {
        if !id.is_empty() {
            return id.to_string();
        }
    }
    if let Some(id) = row.pointer("/metadata/input_event_id").and_then(Value::as_str) {
        if !id.is_empty() {
            return id.to_string();
        }
    }
    format!("row_{idx}")
}

fn stored_middle_counts(row: &Value) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    if let Some(map) = row.pointer("/metadata/middle_counts").and_then(Value::as_object) {
        for (kind, count) in map {
            if let Some(n) = count.as_u64() {
                counts.insert(kind.clone(), n);
            }
        }
    }
    counts
}

fn mean_reward(rows: &[&Value], policy: Policy) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let total: f64 = rows
        .iter()
        .map(|row| {
            let action = row.get("action_text").and_then(Value::as_str).unwrap_or("");
            let transformed = policy.apply(action);
            heuristic_reward(&transformed, &stored_middle_counts(row))
        })
        .sum();
    round6(total / rows.len() as f64)
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triplet(id: &str, action: &str) -> Value {
        json!({
            "schema": TRIPLET_SCHEMA,
            "id": id,
            "run_id": "run_p",
            "state_text": "state",
            "action_text": action,
            "reward": null,
            "metadata": {"middle_counts": {"tool.result": 1}, "reward_mode": "none"}
        })
    }

    #[test]
    fn test_sanitize_is_whole_word() {
        let out = Policy::SanitizeErrors.apply("An Error occurred; errors remain");
        assert_eq!(out, "An issue occurred; errors remain");
    }

    #[test]
    fn test_sanitize_replaces_all_terms() {
        let out = Policy::SanitizeErrors.apply("failed with timeout after exception");
        assert_eq!(out, "not completed with time limit after unexpected condition");
    }

    #[test]
    fn test_safe_rewrite_wraps_or_falls_back() {
        assert_eq!(
            Policy::SafeRewrite.apply("  job done  "),
            "Result summary: job done"
        );
        assert_eq!(Policy::SafeRewrite.apply("   "), "Result summary: action completed.");
    }

    #[test]
    fn test_short_safe_first_line_truncated() {
        let long = "x".repeat(400);
        let text = format!("{long}\nsecond line");
        let out = Policy::ShortSafe.apply(&text);
        assert_eq!(out.chars().count(), SHORT_SAFE_LIMIT);
        assert!(!out.contains("second"));
        assert_eq!(Policy::ShortSafe.apply(""), "Completed.");
    }

    #[test]
    fn test_policy_parse_rejects_unknown() {
        assert_eq!("short_safe".parse::<Policy>().unwrap(), Policy::ShortSafe);
        assert!(matches!(
            "made_up".parse::<Policy>(),
            Err(DatasetError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn test_search_best_train_at_least_baseline() {
        let rows = vec![
            triplet("t1", "operation failed with timeout"),
            triplet("t2", "completed successfully"),
            triplet("t3", "error occurred"),
            triplet("t4", "all good"),
        ];
        let report = run_policy_search(rows, &PolicySearchOptions { val_ratio: 0.5, seed: 9, ..Default::default() }).unwrap();
        assert!(report.best_train_reward >= report.baseline_train_reward);
        assert_eq!(report.baseline_policy, "identity");
        assert_eq!(report.rows_total, 4);
        assert_eq!(report.rows_train + report.rows_val, 4);
    }

    #[test]
    fn test_search_is_deterministic() {
        let rows: Vec<Value> = (0..20)
            .map(|i| triplet(&format!("t{i}"), if i % 3 == 0 { "error in step" } else { "done" }))
            .collect();
        let opts = PolicySearchOptions::default();
        let a = run_policy_search(rows.clone(), &opts).unwrap();
        let b = run_policy_search(rows, &opts).unwrap();
        assert_eq!(a.best_policy, b.best_policy);
        assert_eq!(a.best_train_reward, b.best_train_reward);
        assert_eq!(a.rows_train, b.rows_train);
    }

    #[test]
    fn test_search_filters_foreign_schemas() {
        let rows = vec![
            triplet("t1", "fine"),
            json!({"schema": "something.else", "id": "x", "action_text": "error"}),
        ];
        let report = run_policy_search(rows, &PolicySearchOptions::default()).unwrap();
        assert_eq!(report.rows_total, 1);
    }

    #[test]
    fn test_search_rejects_bad_ratio() {
        let opts = PolicySearchOptions { val_ratio: 0.0, ..Default::default() };
        assert!(matches!(
            run_policy_search(vec![], &opts),
            Err(DatasetError::InvalidRatio(_))
        ));
    }

    #[test]
    fn test_search_caps_rows_before_filtering() {
        let rows: Vec<Value> = (0..10).map(|i| triplet(&format!("t{i}"), "done")).collect();
        let opts = PolicySearchOptions { max_rows: Some(3), ..Default::default() };
        let report = run_policy_search(rows, &opts).unwrap();
        assert_eq!(report.rows_total, 3);
    }

    #[test]
    fn test_uplift_pct_zero_when_baseline_nonpositive() {
        let report = run_policy_search(vec![], &PolicySearchOptions::default()).unwrap();
        assert_eq!(report.uplift_val_pct, 0.0);
    }
}
