//! JSON report output.
//!
//! Writes `TraceReport`s to disk with pretty formatting and reads them back
//! for `validate`.

use crate::pipeline::TraceResult;
use crate::utils::config::REPORT_SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// One trace request and its outcome, as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReport {
    /// Report schema version
    pub version: String,

    pub class_name: String,

    pub method_name: String,

    /// RFC 3339 timestamp of report creation
    pub generated_at: String,

    pub result: TraceResult,
}

impl TraceReport {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>, result: TraceResult) -> Self {
        Self {
            version: REPORT_SCHEMA_VERSION.to_string(),
            class_name: class_name.into(),
            method_name: method_name.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            result,
        }
    }
}

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report to write
/// * `output_path` - Path to output JSON file; parent directories are created
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
pub fn write_report(report: &TraceReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;

    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;

    info!(
        "Report written successfully ({} bytes)",
        std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0)
    );
    Ok(())
}

/// Write any text output (e.g. instrumented source) next to reports
pub fn write_text(text: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    validate_output_path(output_path)?;
    create_parent_dirs(output_path)?;
    std::fs::write(output_path, text)?;
    debug!("Wrote {} bytes to {}", text.len(), output_path.display());
    Ok(())
}

/// Read a report back
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reused for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<TraceReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path)?;
    let report: TraceReport = serde_json::from_reader(std::io::BufReader::new(file))?;

    debug!(
        "Report loaded: version {}, {}.{}",
        report.version, report.class_name, report.method_name
    );
    Ok(report)
}

/// Reject paths that can never be written as a file
pub fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FailureKind;
    use crate::protocol::parse_trace_output;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn create_test_report() -> TraceReport {
        let raw = "TRACE:{\"step\":1,\"event_type\":\"method_entry\",\"action\":\"Entering method main\",\"vars\":{\"method\":\"main\"},\"timestamp\":1000}\nhi\n";
        TraceReport::new(
            "Main",
            "main",
            TraceResult::Success {
                events: parse_trace_output(raw),
                raw_output: raw.to_string(),
                instrumented_source: "class Main {}".to_string(),
                exit_code: Some(0),
            },
        )
    }

    #[test]
    fn test_write_and_read_report() {
        let report = create_test_report();
        let temp_file = NamedTempFile::new().unwrap();

        write_report(&report, temp_file.path()).unwrap();
        let loaded = read_report(temp_file.path()).unwrap();

        assert_eq!(loaded, report);
        assert_eq!(loaded.version, REPORT_SCHEMA_VERSION);
    }

    #[test]
    fn test_generated_at_is_rfc3339() {
        let report = create_test_report();
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
    }

    #[test]
    fn test_failure_report_shape() {
        let report = TraceReport::new(
            "Main",
            "main",
            TraceResult::Failure {
                kind: FailureKind::CompileError,
                message: "Compilation failed: Main.java:3: error".to_string(),
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"]["status"], "failure");
        assert_eq!(json["result"]["kind"], "compile_error");
    }

    #[test]
    fn test_validate_output_path_empty() {
        assert!(validate_output_path(Path::new("")).is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/trace.json");

        write_report(&create_test_report(), &nested_path).unwrap();
        assert!(nested_path.exists());

        let source_path = temp_dir.path().join("out/Main.java");
        write_text("class Main {}\n", &source_path).unwrap();
        assert_eq!(std::fs::read_to_string(source_path).unwrap(), "class Main {}\n");
    }

    #[test]
    fn test_read_missing_file_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = read_report(temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, OutputError::WriteFailed(_)));
    }
}
