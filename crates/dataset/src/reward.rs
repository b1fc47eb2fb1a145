//! Deterministic reward heuristic for action text.

use std::collections::BTreeMap;

use trace::EventKind;

const NEGATIVE_KEYWORDS: [&str; 4] = ["error", "failed", "exception", "timeout"];

/// Scalar quality proxy in [0, 1] for an action text plus the histogram of
/// events seen mid-turn. Identical inputs always score identically; nothing
/// else influences the result.
pub fn heuristic_reward(action_text: &str, middle_counts: &BTreeMap<String, u64>) -> f64 {
    let lower = action_text.to_lowercase();

    let mut reward = 0.4;
    if !action_text.trim().is_empty() {
        reward += 0.25;
    }
    if count_of(middle_counts, EventKind::ToolResult) > 0 {
        reward += 0.2;
    }
    if count_of(middle_counts, EventKind::SystemEvent) > 0 {
        reward -= 0.1;
    }
    if NEGATIVE_KEYWORDS.iter().any(|word| lower.contains(word)) {
        reward -= 0.3;
    }

    round4(reward).clamp(0.0, 1.0)
}

fn count_of(counts: &BTreeMap<String, u64>, kind: EventKind) -> u64 {
    counts.get(kind.as_str()).copied().unwrap_or(0)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
