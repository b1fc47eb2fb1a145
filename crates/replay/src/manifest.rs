//! Point-in-time fingerprints for dataset files.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;

pub const MANIFEST_SCHEMA: &str = "tracemill.manifest.v1";

/// Fingerprint of a dataset file: row count plus a digest of the exact
/// byte content. Produced on demand, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: String,
    pub input: String,
    pub rows: u64,
    pub sha256: String,
    pub generated_at: DateTime<Utc>,
}

/// Build a manifest for a JSONL file. Rows are the non-empty lines, each of
/// which must parse as JSON; the digest covers the raw bytes as read.
pub fn build_manifest(input: &Path) -> Result<Manifest> {
    let payload = fs::read(input)?;
    let text = String::from_utf8_lossy(&payload);

    let mut rows = 0u64;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _: serde::de::IgnoredAny = serde_json::from_str(line)?;
        rows += 1;
    }

    Ok(Manifest {
        schema: MANIFEST_SCHEMA.to_string(),
        input: input.display().to_string(),
        rows,
        sha256: hex::encode(Sha256::digest(&payload)),
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jsonl(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        let mut file = fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        (dir, path)
    }

    #[test]
    fn test_manifest_counts_rows_and_hashes() {
        let (_dir, path) = write_jsonl(&[r#"{"id":1}"#, r#"{"id":2}"#, "", r#"{"id":3}"#]);
        let manifest = build_manifest(&path).unwrap();
        assert_eq!(manifest.schema, MANIFEST_SCHEMA);
        assert_eq!(manifest.rows, 3);
        assert_eq!(manifest.sha256.len(), 64);
    }

    #[test]
    fn test_manifest_is_idempotent() {
        let (_dir, path) = write_jsonl(&[r#"{"id":1}"#, r#"{"id":2}"#]);
        let first = build_manifest(&path).unwrap();
        let second = build_manifest(&path).unwrap();
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_manifest_digest_tracks_content() {
        let (_dir, path) = write_jsonl(&[r#"{"id":1}"#]);
        let before = build_manifest(&path).unwrap();
        fs::write(&path, "{\"id\":2}\n").unwrap();
        let after = build_manifest(&path).unwrap();
        assert_ne!(before.sha256, after.sha256);
    }

    #[test]
    fn test_manifest_rejects_malformed_rows() {
        let (_dir, path) = write_jsonl(&[r#"{"id":1}"#, "not json"]);
        assert!(build_manifest(&path).is_err());
    }
}
