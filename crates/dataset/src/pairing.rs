//! Turn pairing: fold an ordered event stream into input/output pairs.

use serde_json::Value;
use trace::{Event, EventKind};

/// One matched turn: the input event, the output event that closed it, and
/// the events strictly between them (the output itself excluded).
///
/// All three share a run and satisfy
/// `sequence(input) < sequence(middle_i) < sequence(output)`.
#[derive(Clone, Debug)]
pub struct TurnPair {
    pub input: Event,
    pub output: Event,
    pub middle: Vec<Event>,
}

/// Pairing anomaly counters. Metrics, not failures: callers decide whether
/// low yield is acceptable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairingStats {
    pub missing_content: u64,
    pub unpaired: u64,
}

/// Trimmed text payload of an event, or "" when absent.
pub fn content_of(event: &Event) -> &str {
    event
        .attrs
        .get("content")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
}

/// Two-state reducer: idle until an input opens a turn, then buffering
/// until the matching output closes it.
struct TurnPairer {
    pending_input: Option<Event>,
    middle: Vec<Event>,
    pairs: Vec<TurnPair>,
    stats: PairingStats,
}

impl TurnPairer {
    fn new() -> Self {
        Self {
            pending_input: None,
            middle: Vec::new(),
            pairs: Vec::new(),
            stats: PairingStats::default(),
        }
    }

    fn push(&mut self, event: Event) {
        if event.kind == EventKind::AgentInput {
            if self.pending_input.is_some() {
                // previous input never saw its output
                self.stats.unpaired += 1;
            }
            self.pending_input = Some(event);
            self.middle.clear();
            return;
        }

        if event.kind != EventKind::AgentOutput {
            if self.pending_input.is_some() {
                self.middle.push(event);
            }
            return;
        }

        let Some(input) = self.pending_input.take() else {
            return;
        };
        let middle = std::mem::take(&mut self.middle);
        if content_of(&input).is_empty() || content_of(&event).is_empty() {
            self.stats.missing_content += 1;
        } else {
            self.pairs.push(TurnPair { input, output: event, middle });
        }
    }

    fn finish(mut self) -> (Vec<TurnPair>, PairingStats) {
        if self.pending_input.is_some() {
            self.stats.unpaired += 1;
        }
        (self.pairs, self.stats)
    }
}

/// Pair turns from an event stream. Events are stably sorted by sequence
/// number first, so ties keep encounter order.
pub fn pair_turns(mut events: Vec<Event>) -> (Vec<TurnPair>, PairingStats) {
    events.sort_by_key(|e| e.sequence_id);
    let mut pairer = TurnPairer::new();
    for event in events {
        pairer.push(event);
    }
    pairer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(seq: u64, kind: EventKind, content: &str) -> Event {
        let mut event = Event::new("run_t", seq, kind);
        if !content.is_empty() {
            event.attrs.insert("content".to_string(), json!(content));
        }
        event
    }

    #[test]
    fn test_simple_pairing() {
        let events = vec![
            ev(1, EventKind::AgentInput, "hello"),
            ev(2, EventKind::ToolCall, "calling read"),
            ev(3, EventKind::AgentOutput, "hi"),
        ];
        let (pairs, stats) = pair_turns(events);
        assert_eq!(pairs.len(), 1);
        assert_eq!(content_of(&pairs[0].input), "hello");
        assert_eq!(content_of(&pairs[0].output), "hi");
        assert_eq!(pairs[0].middle.len(), 1);
        assert_eq!(pairs[0].middle[0].kind, EventKind::ToolCall);
        assert_eq!(stats, PairingStats::default());
    }

    #[test]
    fn test_abandoned_input_counts_unpaired() {
        let events = vec![
            ev(1, EventKind::AgentInput, "a"),
            ev(2, EventKind::AgentInput, "b"),
            ev(3, EventKind::AgentOutput, "c"),
        ];
        let (pairs, stats) = pair_turns(events);
        assert_eq!(pairs.len(), 1);
        assert_eq!(content_of(&pairs[0].input), "b");
        assert_eq!(content_of(&pairs[0].output), "c");
        assert_eq!(stats.unpaired, 1);
    }

    #[test]
    fn test_missing_content_skips_pair() {
        let events = vec![
            ev(1, EventKind::AgentInput, "hello"),
            ev(2, EventKind::AgentOutput, ""),
        ];
        let (pairs, stats) = pair_turns(events);
        assert!(pairs.is_empty());
        assert_eq!(stats.missing_content, 1);
        assert_eq!(stats.unpaired, 0);
    }

    #[test]
    fn test_events_outside_open_turn_are_discarded() {
        let events = vec![
            ev(1, EventKind::ToolResult, "stray"),
            ev(2, EventKind::AgentOutput, "stray output"),
            ev(3, EventKind::AgentInput, "hello"),
            ev(4, EventKind::AgentOutput, "hi"),
        ];
        let (pairs, stats) = pair_turns(events);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].middle.is_empty());
        assert_eq!(stats, PairingStats::default());
    }

    #[test]
    fn test_trailing_input_counts_unpaired() {
        let events = vec![
            ev(1, EventKind::AgentInput, "hello"),
            ev(2, EventKind::ToolCall, "calling"),
        ];
        let (pairs, stats) = pair_turns(events);
        assert!(pairs.is_empty());
        assert_eq!(stats.unpaired, 1);
    }

    #[test]
    fn test_events_are_sorted_by_sequence() {
        let events = vec![
            ev(3, EventKind::AgentOutput, "hi"),
            ev(1, EventKind::AgentInput, "hello"),
            ev(2, EventKind::ToolResult, "done"),
        ];
        let (pairs, _) = pair_turns(events);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].middle.len(), 1);
        assert_eq!(pairs[0].input.sequence_id, 1);
        assert_eq!(pairs[0].output.sequence_id, 3);
    }

    #[test]
    fn test_multiple_turns_emit_in_order() {
        let events = vec![
            ev(1, EventKind::AgentInput, "first"),
            ev(2, EventKind::AgentOutput, "one"),
            ev(3, EventKind::AgentInput, "second"),
            ev(4, EventKind::ToolResult, "ok"),
            ev(5, EventKind::AgentOutput, "two"),
        ];
        let (pairs, stats) = pair_turns(events);
        assert_eq!(pairs.len(), 2);
        assert_eq!(content_of(&pairs[0].output), "one");
        assert_eq!(content_of(&pairs[1].output), "two");
        assert_eq!(pairs[1].middle.len(), 1);
        assert_eq!(stats, PairingStats::default());
    }

    #[test]
    fn test_middle_buffer_resets_after_missing_content() {
        let events = vec![
            ev(1, EventKind::AgentInput, "hello"),
            ev(2, EventKind::ToolCall, "call"),
            ev(3, EventKind::AgentOutput, ""),
            ev(4, EventKind::AgentInput, "again"),
            ev(5, EventKind::AgentOutput, "done"),
        ];
        let (pairs, stats) = pair_turns(events);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].middle.is_empty());
        assert_eq!(stats.missing_content, 1);
    }
}
