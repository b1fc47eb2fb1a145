//! Namespace-separated, seed-stable scoring into the unit interval.

use serde_json::Value;
use sha2::{Digest, Sha256};

const BUCKETS: u64 = 1_000_000;

/// Deterministic score in [0, 1) for `(namespace, seed, key)`.
///
/// SHA-256 over the UTF-8 bytes of `"{namespace}:{seed}:{key}"`; the first
/// 48 bits of the digest, read big-endian, reduced mod 1e6. A pure function
/// of its inputs: the same triple maps to the same score across processes
/// and languages that share the digest and encoding.
pub fn unit_score(namespace: &str, seed: u64, key: &str) -> f64 {
    let digest = Sha256::digest(format!("{namespace}:{seed}:{key}").as_bytes());
    let mut bucket: u64 = 0;
    for byte in &digest[..6] {
        bucket = (bucket << 8) | u64::from(*byte);
    }
    (bucket % BUCKETS) as f64 / BUCKETS as f64
}

/// Stable per-row key for scoring.
///
/// The configured field wins when present and non-null; otherwise fall back
/// to `event_id`, `id`, `sequence_id`, and finally the stringified
/// positional index.
pub fn stable_key(row: &Value, key_field: &str, idx: usize) -> String {
    for field in [key_field, "event_id", "id", "sequence_id"] {
        match row.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
        }
    }
    idx.to_string()
}
