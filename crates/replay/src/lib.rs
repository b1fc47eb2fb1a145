//! Deterministic replay tooling.
//!
//! Seed-stable assignment of records to the unit interval, sampling and
//! A/B splitting built on it, and point-in-time dataset manifests.

pub mod hash;
pub mod manifest;
pub mod split;

pub use hash::{stable_key, unit_score};
pub use manifest::{build_manifest, Manifest, MANIFEST_SCHEMA};
pub use split::{sample_and_split, sample_rows, split_rows, SplitOptions, SplitSummary};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("split ratio must be inside (0, 1), got {0}")]
    InvalidRatio(f64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
