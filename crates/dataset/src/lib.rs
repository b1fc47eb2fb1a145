//! Training-dataset construction from trace events.
//!
//! Turn pairing, the reward heuristic, the two export row shapes, the
//! offline policy-search loop, and trainer-side smoke checks.

pub mod export;
pub mod pairing;
pub mod policy;
pub mod reward;
pub mod smoke;

pub use export::{
    export_message_pairs, export_triplets, ExportSummary, MessagePairRow, RewardMode, TripletRow,
    MESSAGES_SCHEMA, TRIPLET_SCHEMA,
};
pub use pairing::{content_of, pair_turns, PairingStats, TurnPair};
pub use policy::{run_policy_search, OptimizationReport, Policy, PolicySearchOptions};
pub use reward::heuristic_reward;
pub use smoke::{smoke_check_messages, smoke_check_triplets, SmokeSummary};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("val ratio must be inside (0, 1), got {0}")]
    InvalidRatio(f64),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
