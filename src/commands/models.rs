use crate::instrument::ValuePolicy;
use crate::utils::config::{
    DEFAULT_COMPILER, DEFAULT_COMPILE_TIMEOUT, DEFAULT_EXECUTION_TIMEOUT, DEFAULT_RUNTIME,
};
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the trace command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct TraceArgs {
    /// Class the source declares and that receives the runtime
    pub class_name: String,

    /// Entry method to trace
    pub method_name: String,

    /// Java source file
    pub source: PathBuf,

    /// Output path for the JSON report
    pub output_json: PathBuf,

    /// Print text summary to stdout
    pub print_summary: bool,

    pub value_policy: ValuePolicy,

    pub trace_returns: bool,

    pub compiler: PathBuf,

    pub runtime: PathBuf,

    pub compile_timeout: Duration,

    pub execution_timeout: Duration,
}

impl Default for TraceArgs {
    fn default() -> Self {
        Self {
            class_name: "Main".to_string(),
            method_name: "main".to_string(),
            source: PathBuf::from("Main.java"),
            output_json: PathBuf::from("trace.json"),
            print_summary: false,
            value_policy: ValuePolicy::default(),
            trace_returns: false,
            compiler: PathBuf::from(DEFAULT_COMPILER),
            runtime: PathBuf::from(DEFAULT_RUNTIME),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }
}

/// Arguments for the instrument command
#[derive(Debug, Clone)]
pub struct InstrumentArgs {
    pub class_name: String,

    pub method_name: String,

    pub source: PathBuf,

    /// Where to write the instrumented source; stdout when `None`
    pub output: Option<PathBuf>,

    pub value_policy: ValuePolicy,

    pub trace_returns: bool,
}

impl Default for InstrumentArgs {
    fn default() -> Self {
        Self {
            class_name: "Main".to_string(),
            method_name: "main".to_string(),
            source: PathBuf::from("Main.java"),
            output: None,
            value_policy: ValuePolicy::default(),
            trace_returns: false,
        }
    }
}
