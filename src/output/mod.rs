//! Output writers for trace reports.
//!
//! Reports are pretty JSON; instrumented sources are written as plain text.

pub mod json;

pub use json::{read_report, validate_output_path, write_report, write_text, TraceReport};
