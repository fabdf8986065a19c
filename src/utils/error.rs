//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while tokenizing or parsing Java source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Errors that can occur while rewriting a parsed unit
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("Class not found in source: {0}")]
    ClassNotFound(String),

    #[error("Entry method '{method}' not found (expected in class {class})")]
    EntryMethodNotFound { class: String, method: String },

    #[error("Member name '{0}' uses the reserved trace prefix")]
    ReservedName(String),

    #[error("Trace runtime template is invalid: {0}")]
    Shim(SyntaxError),
}

/// Errors that can occur while compiling or running generated code
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to prepare workspace: {0}")]
    Workspace(std::io::Error),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Compilation timeout after {} seconds", .0.as_secs())]
    CompileTimeout(Duration),

    #[error("Compilation failed: {diagnostics}")]
    CompileError { diagnostics: String },

    #[error("Execution timeout after {} seconds", .0.as_secs())]
    ExecutionTimeout(Duration),

    #[error("Process I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A single trace line that could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("empty event record")]
    Empty,
}

/// Pipeline-level failure, one variant per fatal stage
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to parse source code: {0}")]
    Parse(#[from] SyntaxError),

    #[error("Instrumentation failed: {0}")]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
