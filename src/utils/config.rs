//! Configuration and constants for the tracer.

use std::time::Duration;

/// Prefix marking protocol lines in the traced program's output
pub const TRACE_SENTINEL: &str = "TRACE:";

/// Reserved prefix for every member the trace runtime injects
pub const SHIM_PREFIX: &str = "__trace";

/// Reference bound for `javac`
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(10);

/// Reference bound for the traced program
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Output beyond this is drained but discarded
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 8 * 1024 * 1024;

/// Workspace directory name prefix under the system temp root
pub const WORKSPACE_PREFIX: &str = "stepscope_";

pub const SOURCE_EXTENSION: &str = "java";

pub const DEFAULT_COMPILER: &str = "javac";
pub const DEFAULT_RUNTIME: &str = "java";

/// Current report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

// Java keywords and literals that can never be used as identifiers
pub const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];
