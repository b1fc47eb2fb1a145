//! Dataset row export: message pairs and state/action/reward triplets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trace::Event;

use crate::pairing::{content_of, pair_turns, TurnPair};
use crate::reward::heuristic_reward;

pub const MESSAGES_SCHEMA: &str = "tracemill.messages.v1";
pub const TRIPLET_SCHEMA: &str = "tracemill.triplet.v1";

/// Whether triplet rewards are computed or left null.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardMode {
    None,
    Heuristic,
}

impl RewardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardMode::None => "none",
            RewardMode::Heuristic => "heuristic",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessagePairMetadata {
    pub input_event_id: String,
    pub output_event_id: String,
    pub input_sequence_id: u64,
    pub output_sequence_id: u64,
    pub middle_counts: BTreeMap<String, u64>,
    pub input_token_estimate: Option<u64>,
    pub output_token_estimate: Option<u64>,
    /// Summed boundary-event cost; missing cost counts as zero.
    pub cost_usd_micros: u64,
}

/// Chat-style training row: one user message, one assistant message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessagePairRow {
    pub schema: String,
    pub id: String,
    pub run_id: String,
    pub messages: Vec<Message>,
    pub metadata: MessagePairMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripletMetadata {
    pub input_event_id: String,
    pub output_event_id: String,
    pub input_sequence_id: u64,
    pub output_sequence_id: u64,
    pub middle_counts: BTreeMap<String, u64>,
    pub reward_mode: String,
}

/// State/action/reward training row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TripletRow {
    pub schema: String,
    pub id: String,
    pub run_id: String,
    pub state_text: String,
    pub action_text: String,
    pub reward: Option<f64>,
    pub metadata: TripletMetadata,
}

/// Export accounting, including the pairing anomaly counters so callers can
/// judge yield.
#[derive(Clone, Debug, Serialize)]
pub struct ExportSummary {
    pub format: String,
    pub rows_written: u64,
    pub skipped_missing_content: u64,
    pub skipped_unpaired: u64,
}

fn middle_counts(middle: &[Event]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for event in middle {
        *counts.entry(event.kind.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Pair turns and map each pair to a message row. Row ids are 1-based and
/// zero-padded so lexical order matches emission order.
pub fn export_message_pairs(events: Vec<Event>) -> (Vec<MessagePairRow>, ExportSummary) {
    let (pairs, stats) = pair_turns(events);

    let rows: Vec<MessagePairRow> = pairs
        .iter()
        .enumerate()
        .map(|(idx, pair)| MessagePairRow {
            schema: MESSAGES_SCHEMA.to_string(),
            id: format!("msgpair_{:06}", idx + 1),
            run_id: pair.input.run_id.clone(),
            messages: vec![
                Message {
                    role: "user".to_string(),
                    content: content_of(&pair.input).to_string(),
                },
                Message {
                    role: "assistant".to_string(),
                    content: content_of(&pair.output).to_string(),
                },
            ],
            metadata: MessagePairMetadata {
                input_event_id: pair.input.event_id.clone(),
                output_event_id: pair.output.event_id.clone(),
                input_sequence_id: pair.input.sequence_id,
                output_sequence_id: pair.output.sequence_id,
                middle_counts: middle_counts(&pair.middle),
                input_token_estimate: pair.input.token_estimate,
                output_token_estimate: pair.output.token_estimate,
                cost_usd_micros: pair.input.cost_usd_micros.unwrap_or(0)
                    + pair.output.cost_usd_micros.unwrap_or(0),
            },
        })
        .collect();

    let summary = ExportSummary {
        format: "messages".to_string(),
        rows_written: rows.len() as u64,
        skipped_missing_content: stats.missing_content,
        skipped_unpaired: stats.unpaired,
    };
    (rows, summary)
}

/// Pair turns and map each pair to a triplet row, optionally scoring the
/// action text with the reward heuristic.
pub fn export_triplets(events: Vec<Event>, reward_mode: RewardMode) -> (Vec<TripletRow>, ExportSummary) {
    let (pairs, stats) = pair_turns(events);

    let rows: Vec<TripletRow> = pairs
        .iter()
        .enumerate()
        .map(|(idx, pair)| triplet_row(pair, idx, reward_mode))
        .collect();

    let summary = ExportSummary {
        format: "triplets".to_string(),
        rows_written: rows.len() as u64,
        skipped_missing_content: stats.missing_content,
        skipped_unpaired: stats.unpaired,
    };
    (rows, summary)
}

fn triplet_row(pair: &TurnPair, idx: usize, reward_mode: RewardMode) -> TripletRow {
    let counts = middle_counts(&pair.middle);
    let action_text = content_of(&pair.output).to_string();
    let reward = match reward_mode {
        RewardMode::Heuristic => Some(heuristic_reward(&action_text, &counts)),
        RewardMode::None => None,
    };

    TripletRow {
        schema: TRIPLET_SCHEMA.to_string(),
        id: format!("triplet_{:06}", idx + 1),
        run_id: pair.input.run_id.clone(),
        state_text: content_of(&pair.input).to_string(),
        action_text,
        reward,
        metadata: TripletMetadata {
            input_event_id: pair.input.event_id.clone(),
            output_event_id: pair.output.event_id.clone(),
            input_sequence_id: pair.input.sequence_id,
            output_sequence_id: pair.output.sequence_id,
            middle_counts: counts,
            reward_mode: reward_mode.as_str().to_string(),
        },
    }
}
