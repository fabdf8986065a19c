//! Trace protocol: event schema and the parser for sentinel lines.

pub mod schema;
pub mod trace_parser;

pub use schema::{EventType, TraceEvent};
pub use trace_parser::{check_sequence, decode_event, parse_trace_output, SequenceIssue, TraceSummary};
