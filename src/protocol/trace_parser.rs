//! Reads trace events back out of the traced program's output.
//!
//! Only lines starting with the sentinel are considered; everything else is
//! ordinary program output and is left alone. A sentinel line that fails to
//! decode becomes a synthetic `parse_error` event and parsing continues.

use super::schema::{EventType, TraceEvent};
use crate::utils::config::TRACE_SENTINEL;
use crate::utils::error::DecodeError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wire shape of one event; var values may be any JSON scalar
#[derive(Debug, Deserialize)]
struct RawEvent {
    step: u64,
    event_type: EventType,
    #[serde(default)]
    action: String,
    #[serde(default)]
    vars: serde_json::Map<String, serde_json::Value>,
    timestamp: u64,
}

/// Parse the merged output of one execution
///
/// **Public** - main entry point of the protocol parser
///
/// # Arguments
/// * `raw_output` - Everything the traced program wrote, stdout and stderr merged
///
/// # Returns
/// Events in output order. Never fails: undecodable lines become
/// `parse_error` events carrying the line verbatim.
pub fn parse_trace_output(raw_output: &str) -> Vec<TraceEvent> {
    let mut events = Vec::new();
    let mut last_timestamp = 0;

    for line in raw_output.lines() {
        let Some(payload) = line.strip_prefix(TRACE_SENTINEL) else {
            continue;
        };
        match decode_event(payload) {
            Ok(event) => {
                last_timestamp = event.timestamp;
                events.push(event);
            }
            Err(err) => {
                warn!("Undecodable trace line: {}", err);
                events.push(TraceEvent::parse_error(line, &err.to_string(), last_timestamp));
            }
        }
    }

    debug!("Decoded {} trace events", events.len());
    events
}

/// Decode the JSON payload that follows the sentinel
pub fn decode_event(payload: &str) -> Result<TraceEvent, DecodeError> {
    if payload.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    let raw: RawEvent = serde_json::from_str(payload)?;

    let vars = raw
        .vars
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            };
            (name, text)
        })
        .collect();

    Ok(TraceEvent {
        step: raw.step,
        event_type: raw.event_type,
        action: raw.action,
        vars,
        timestamp: raw.timestamp,
    })
}

/// Something wrong with the shape of an event sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SequenceIssue {
    StepNotIncreasing { index: usize, previous: u64, step: u64 },
    TimestampDecreased { index: usize, previous: u64, timestamp: u64 },
    ParseError { index: usize, raw_line: String },
}

impl fmt::Display for SequenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceIssue::StepNotIncreasing { index, previous, step } => {
                write!(f, "event {}: step {} does not follow step {}", index, step, previous)
            }
            SequenceIssue::TimestampDecreased {
                index,
                previous,
                timestamp,
            } => write!(f, "event {}: timestamp {} is before {}", index, timestamp, previous),
            SequenceIssue::ParseError { index, raw_line } => {
                write!(f, "event {}: undecodable line {:?}", index, raw_line)
            }
        }
    }
}

/// Check ordering invariants of a decoded sequence
///
/// Steps of real events must be strictly increasing and timestamps
/// non-decreasing. Synthetic events are reported but skipped for ordering.
pub fn check_sequence(events: &[TraceEvent]) -> Vec<SequenceIssue> {
    let mut issues = Vec::new();
    let mut previous: Option<&TraceEvent> = None;

    for (index, event) in events.iter().enumerate() {
        if event.is_synthetic() {
            issues.push(SequenceIssue::ParseError {
                index,
                raw_line: event.vars.get("raw_line").cloned().unwrap_or_default(),
            });
            continue;
        }
        if let Some(prev) = previous {
            if event.step <= prev.step {
                issues.push(SequenceIssue::StepNotIncreasing {
                    index,
                    previous: prev.step,
                    step: event.step,
                });
            }
            if event.timestamp < prev.timestamp {
                issues.push(SequenceIssue::TimestampDecreased {
                    index,
                    previous: prev.timestamp,
                    timestamp: event.timestamp,
                });
            }
        }
        previous = Some(event);
    }
    issues
}

/// Aggregate view of one trace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    pub total_events: usize,

    /// Events per type
    pub counts: BTreeMap<EventType, usize>,

    /// Last reported value of every variable
    pub last_values: BTreeMap<String, String>,

    /// Milliseconds between the first and last decoded events
    pub duration_ms: u64,
}

impl TraceSummary {
    pub fn from_events(events: &[TraceEvent]) -> Self {
        let mut summary = TraceSummary {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events {
            *summary.counts.entry(event.event_type).or_insert(0) += 1;
            if event.event_type == EventType::VariableUpdate {
                for (name, value) in &event.vars {
                    summary.last_values.insert(name.clone(), value.clone());
                }
            }
        }

        let mut real = events.iter().filter(|event| !event.is_synthetic());
        if let Some(first) = real.next() {
            let last = real.last().unwrap_or(first);
            summary.duration_ms = last.timestamp.saturating_sub(first.timestamp);
        }
        summary
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.counts.get(&event_type).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = concat!(
        "TRACE:{\"step\":1,\"event_type\":\"method_entry\",\"action\":\"Entering method main\",\"vars\":{\"method\":\"main\"},\"timestamp\":1000}\n",
        "hello from the program\n",
        "TRACE:{\"step\":2,\"event_type\":\"variable_update\",\"action\":\"Variable x = 5\",\"vars\":{\"x\":\"5\"},\"timestamp\":1001}\n",
    );

    #[test]
    fn test_ignores_plain_output() {
        let events = parse_trace_output(SAMPLE);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::MethodEntry);
        assert_eq!(events[1].vars["x"], "5");
    }

    #[test]
    fn test_empty_output_yields_no_events() {
        assert!(parse_trace_output("").is_empty());
        assert!(parse_trace_output("just text\nmore text").is_empty());
    }

    #[test]
    fn test_bad_line_becomes_parse_error_and_parsing_continues() {
        let raw = format!("{}TRACE:{{\"step\":3,\"event\n{}", SAMPLE, SAMPLE);
        let events = parse_trace_output(&raw);
        assert_eq!(events.len(), 5);

        let bad = &events[2];
        assert_eq!(bad.event_type, EventType::ParseError);
        assert_eq!(bad.step, 0);
        assert!(bad.action.starts_with("Failed to parse trace: "));
        assert_eq!(bad.vars["raw_line"], "TRACE:{\"step\":3,\"event");
        assert_eq!(bad.timestamp, 1001);
    }

    #[test]
    fn test_parse_error_before_any_event_has_zero_timestamp() {
        let events = parse_trace_output("TRACE:");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 0);
        assert!(events[0].action.contains("empty event record"));
    }

    #[test]
    fn test_non_string_vars_are_stringified() {
        let event = decode_event(
            "{\"step\":1,\"event_type\":\"call\",\"action\":\"\",\"vars\":{\"n\":5,\"ok\":true,\"v\":null},\"timestamp\":7}",
        )
        .unwrap();
        assert_eq!(event.vars["n"], "5");
        assert_eq!(event.vars["ok"], "true");
        assert_eq!(event.vars["v"], "null");
    }

    #[test]
    fn test_unknown_event_type_is_a_decode_error() {
        let err = decode_event("{\"step\":1,\"event_type\":\"bogus\",\"vars\":{},\"timestamp\":1}");
        assert!(err.is_err());
    }

    #[test]
    fn test_check_sequence_reports_disorder() {
        let mut events = parse_trace_output(SAMPLE);
        assert!(check_sequence(&events).is_empty());

        events[1].step = 1;
        events[1].timestamp = 999;
        events.push(TraceEvent::parse_error("TRACE:x", "bad", 999));
        let issues = check_sequence(&events);
        assert_eq!(
            issues,
            vec![
                SequenceIssue::StepNotIncreasing { index: 1, previous: 1, step: 1 },
                SequenceIssue::TimestampDecreased { index: 1, previous: 1000, timestamp: 999 },
                SequenceIssue::ParseError { index: 2, raw_line: "TRACE:x".to_string() },
            ]
        );
    }

    #[test]
    fn test_summary() {
        let mut raw = SAMPLE.to_string();
        raw.push_str("TRACE:{\"step\":3,\"event_type\":\"variable_update\",\"action\":\"Variable x = 6\",\"vars\":{\"x\":\"6\"},\"timestamp\":1010}\n");
        let summary = TraceSummary::from_events(&parse_trace_output(&raw));
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.count(EventType::VariableUpdate), 2);
        assert_eq!(summary.count(EventType::Return), 0);
        assert_eq!(summary.last_values["x"], "6");
        assert!(!summary.last_values.contains_key("method"));
        assert_eq!(summary.duration_ms, 10);
    }
}
