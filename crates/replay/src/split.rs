//! Deterministic sampling and A/B splitting over in-memory JSONL rows.
//!
//! Both operations are pure given (rows, options); file handling belongs to
//! the caller.

use serde_json::Value;

use crate::hash::{stable_key, unit_score};
use crate::{ReplayError, Result};

const NS_SAMPLE: &str = "sample";
const NS_SPLIT: &str = "split";

#[derive(Clone, Debug)]
pub struct SplitOptions {
    pub split_ratio: f64,
    pub seed: u64,
    pub key_field: String,
    pub sample_size: Option<usize>,
    pub sample_seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            split_ratio: 0.5,
            seed: 42,
            key_field: "id".to_string(),
            sample_size: None,
            sample_seed: 42,
        }
    }
}

/// Row accounting for one sample-and-split pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitSummary {
    pub input_rows: u64,
    pub sampled_rows: u64,
    pub out_a_rows: u64,
    pub out_b_rows: u64,
}

/// Seed-stable subset of `k` rows: score each row in the `sample`
/// namespace, sort ascending, keep the first `k`. Equal scores keep input
/// order (stable sort); `k >= len` keeps everything.
pub fn sample_rows(rows: Vec<Value>, k: usize, seed: u64, key_field: &str) -> Vec<Value> {
    let mut scored: Vec<(f64, Value)> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let key = stable_key(&row, key_field, idx);
            (unit_score(NS_SAMPLE, seed, &key), row)
        })
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored.into_iter().map(|(_, row)| row).collect()
}

/// Assign every row to exactly one bucket: score < ratio goes to A, the
/// rest to B. The ratio must be inside the open interval (0, 1).
pub fn split_rows(
    rows: Vec<Value>,
    ratio: f64,
    seed: u64,
    key_field: &str,
) -> Result<(Vec<Value>, Vec<Value>)> {
    validate_ratio(ratio)?;
    let mut out_a = Vec::new();
    let mut out_b = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        let key = stable_key(&row, key_field, idx);
        if unit_score(NS_SPLIT, seed, &key) < ratio {
            out_a.push(row);
        } else {
            out_b.push(row);
        }
    }
    Ok((out_a, out_b))
}

/// Optional sampling followed by the A/B split, with row accounting.
/// Configuration is validated before any row is touched.
pub fn sample_and_split(
    rows: Vec<Value>,
    opts: &SplitOptions,
) -> Result<(Vec<Value>, Vec<Value>, SplitSummary)> {
    validate_ratio(opts.split_ratio)?;

    let input_rows = rows.len() as u64;
    let sampled = match opts.sample_size {
        Some(k) => sample_rows(rows, k, opts.sample_seed, &opts.key_field),
        None => rows,
    };
    let sampled_rows = sampled.len() as u64;

    let (out_a, out_b) = split_rows(sampled, opts.split_ratio, opts.seed, &opts.key_field)?;
    let summary = SplitSummary {
        input_rows,
        sampled_rows,
        out_a_rows: out_a.len() as u64,
        out_b_rows: out_b.len() as u64,
    };
    Ok((out_a, out_b, summary))
}

fn validate_ratio(ratio: f64) -> Result<()> {
    if ratio > 0.0 && ratio < 1.0 {
        Ok(())
    } else {
        Err(ReplayError::InvalidRatio(ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": format!("row_{i:03}"), "v": i})).collect()
    }

    #[test]
    fn test_split_assigns_every_row_once() {
        let input = rows(50);
        let (a, b) = split_rows(input.clone(), 0.5, 42, "id").unwrap();
        assert_eq!(a.len() + b.len(), input.len());
        for row in input {
            let in_a = a.contains(&row);
            let in_b = b.contains(&row);
            assert!(in_a ^ in_b);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let (a1, b1) = split_rows(rows(40), 0.3, 7, "id").unwrap();
        let (a2, b2) = split_rows(rows(40), 0.3, 7, "id").unwrap();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_split_changes_with_seed() {
        let (a1, _) = split_rows(rows(60), 0.5, 1, "id").unwrap();
        let (a2, _) = split_rows(rows(60), 0.5, 2, "id").unwrap();
        assert_ne!(a1, a2);
    }

    #[test]
    fn test_split_rejects_bad_ratio() {
        assert!(matches!(split_rows(rows(5), 0.0, 42, "id"), Err(ReplayError::InvalidRatio(_))));
        assert!(matches!(split_rows(rows(5), 1.0, 42, "id"), Err(ReplayError::InvalidRatio(_))));
        assert!(matches!(split_rows(rows(5), -0.2, 42, "id"), Err(ReplayError::InvalidRatio(_))));
    }

    #[test]
    fn test_sample_exact_size_no_duplicates() {
        let sampled = sample_rows(rows(40), 10, 99, "id");
        assert_eq!(sampled.len(), 10);
        let mut ids: Vec<String> = sampled
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_sample_larger_than_input_keeps_all() {
        assert_eq!(sample_rows(rows(4), 10, 42, "id").len(), 4);
    }

    #[test]
    fn test_sample_is_deterministic() {
        let s1 = sample_rows(rows(30), 8, 5, "id");
        let s2 = sample_rows(rows(30), 8, 5, "id");
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_sample_survives_missing_keys() {
        // rows without any id field fall back to the positional index
        let input: Vec<Value> = (0..10).map(|i| json!({"v": i})).collect();
        assert_eq!(sample_rows(input, 4, 42, "id").len(), 4);
    }

    #[test]
    fn test_sample_and_split_accounting() {
        let opts = SplitOptions {
            sample_size: Some(10),
            sample_seed: 99,
            ..Default::default()
        };
        let (a, b, summary) = sample_and_split(rows(40), &opts).unwrap();
        assert_eq!(summary.input_rows, 40);
        assert_eq!(summary.sampled_rows, 10);
        assert_eq!(summary.out_a_rows, a.len() as u64);
        assert_eq!(summary.out_b_rows, b.len() as u64);
        assert_eq!(a.len() + b.len(), 10);
    }

    #[test]
    fn test_sample_and_split_validates_before_sampling() {
        let opts = SplitOptions { split_ratio: 1.5, ..Default::default() };
        assert!(sample_and_split(rows(5), &opts).is_err());
    }
}
