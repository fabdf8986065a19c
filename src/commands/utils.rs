use crate::output::read_report;
use crate::pipeline::TraceResult;
use crate::protocol::{check_sequence, TraceSummary};
use crate::utils::config::REPORT_SCHEMA_VERSION;
use anyhow::Result;
use std::path::Path;

/// Validate a trace report file
///
/// Fails when the file is not a report or its event sequence is out of order.
/// Parse-error events are listed but do not fail validation.
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)?;

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Target: {}.{}", report.class_name, report.method_name);
    println!("  Generated: {}", report.generated_at);

    let events = match &report.result {
        TraceResult::Success { events, exit_code, .. } => {
            println!("  Status: success (exit code {:?})", exit_code);
            events
        }
        TraceResult::Failure { kind, message } => {
            println!("  Status: failure ({})", kind);
            println!("  Message: {}", message);
            return Ok(());
        }
    };

    let summary = TraceSummary::from_events(events);
    println!("  Events: {}", summary.total_events);

    let issues = check_sequence(events);
    let mut fatal = 0;
    for issue in &issues {
        println!("  ! {}", issue);
        if !matches!(issue, crate::protocol::SequenceIssue::ParseError { .. }) {
            fatal += 1;
        }
    }

    if fatal > 0 {
        anyhow::bail!("{} ordering issue(s) in event sequence", fatal);
    }
    println!("✓ Event sequence is ordered");
    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Stepscope Trace Report Schema");
    println!("Current Version: {}", REPORT_SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string             - Schema version (e.g., '1.0.0')");
        println!("  class_name: string          - Class that was traced");
        println!("  method_name: string         - Entry method that was traced");
        println!("  generated_at: string        - RFC 3339 timestamp");
        println!("  result: object              - Tagged by 'status'");
        println!("    status: 'success'");
        println!("      events: array           - Trace events in emission order");
        println!("        step: number          - Strictly increasing, from 1");
        println!("        event_type: string    - method_entry | variable_update | return | parse_error | ...");
        println!("        action: string        - Human-readable description");
        println!("        vars: object          - Name to textual value");
        println!("        timestamp: number     - Epoch milliseconds");
        println!("      raw_output: string      - stdout and stderr, merged");
        println!("      instrumented_source: string");
        println!("      exit_code: number?      - Absent when killed by a signal");
        println!("    status: 'failure'");
        println!("      kind: string            - invalid_request | parse_failure | instrumentation_error |");
        println!("                                compile_error | compile_timeout | execution_timeout | execution_error");
        println!("      message: string");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Stepscope v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", REPORT_SCHEMA_VERSION);
    println!();
    println!("Step-by-step execution tracing for Java programs.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{write_report, TraceReport};
    use crate::protocol::parse_trace_output;

    fn report_with(raw: &str) -> TraceReport {
        TraceReport::new(
            "Main",
            "main",
            TraceResult::Success {
                events: parse_trace_output(raw),
                raw_output: raw.to_string(),
                instrumented_source: String::new(),
                exit_code: Some(0),
            },
        )
    }

    #[test]
    fn test_validate_ordered_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let raw = "TRACE:{\"step\":1,\"event_type\":\"method_entry\",\"action\":\"\",\"vars\":{},\"timestamp\":5}\nTRACE:broken\n";
        write_report(&report_with(raw), &path).unwrap();
        assert!(validate_report_file(&path).is_ok());
    }

    #[test]
    fn test_validate_rejects_disorder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let raw = concat!(
            "TRACE:{\"step\":2,\"event_type\":\"method_entry\",\"action\":\"\",\"vars\":{},\"timestamp\":5}\n",
            "TRACE:{\"step\":1,\"event_type\":\"variable_update\",\"action\":\"\",\"vars\":{},\"timestamp\":6}\n",
        );
        write_report(&report_with(raw), &path).unwrap();
        assert!(validate_report_file(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_non_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        std::fs::write(&path, "{\"hello\": 1}").unwrap();
        assert!(validate_report_file(&path).is_err());
    }
}
