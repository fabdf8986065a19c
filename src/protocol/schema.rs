//! Trace event schema.
//!
//! This is the structure the parent reads back from the traced program's
//! output, and the structure written into reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of observed moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProgramStart,
    MethodEntry,
    VariableUpdate,
    Call,
    Return,
    ProgramEnd,
    /// Synthetic: a sentinel line that could not be decoded
    ParseError,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProgramStart => "program_start",
            EventType::MethodEntry => "method_entry",
            EventType::VariableUpdate => "variable_update",
            EventType::Call => "call",
            EventType::Return => "return",
            EventType::ProgramEnd => "program_end",
            EventType::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed moment in execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Assigned by the running program; strictly increasing within one run
    pub step: u64,

    pub event_type: EventType,

    /// Human-readable description
    pub action: String,

    /// Variable name to textual value at that moment
    pub vars: BTreeMap<String, String>,

    /// Epoch milliseconds at capture time
    pub timestamp: u64,
}

impl TraceEvent {
    /// Synthetic event standing in for an undecodable sentinel line
    pub fn parse_error(raw_line: &str, reason: &str, timestamp: u64) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("raw_line".to_string(), raw_line.to_string());
        Self {
            step: 0,
            event_type: EventType::ParseError,
            action: format!("Failed to parse trace: {}", reason),
            vars,
            timestamp,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.event_type == EventType::ParseError
    }
}
