//! Pipeline façade: validate, parse, instrument, execute, decode.
//!
//! `Tracer::execute_and_trace` never fails; every fatal stage error is folded
//! into `TraceResult::Failure` with a stable kind. Callers who want the
//! underlying error use `try_execute_and_trace`.

use crate::executor::{ExecutionOutput, Executor, ExecutorConfig};
use crate::instrument::{instrument, InstrumentOptions, Instrumented, ValuePolicy};
use crate::protocol::{parse_trace_output, TraceEvent};
use crate::syntax::parse_compilation_unit;
use crate::utils::config::{RESERVED_WORDS, SHIM_PREFIX};
use crate::utils::error::{ExecutorError, InstrumentError, TraceError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything the pipeline needs besides the request itself
#[derive(Debug, Clone, Default)]
pub struct TracerConfig {
    pub executor: ExecutorConfig,
    pub value_policy: ValuePolicy,
    pub trace_returns: bool,
}

impl TracerConfig {
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_value_policy(mut self, value_policy: ValuePolicy) -> Self {
        self.value_policy = value_policy;
        self
    }

    pub fn with_trace_returns(mut self, trace_returns: bool) -> Self {
        self.trace_returns = trace_returns;
        self
    }
}

/// Stable failure category, one per fatal stage outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRequest,
    ParseFailure,
    InstrumentationError,
    CompileError,
    CompileTimeout,
    ExecutionTimeout,
    ExecutionError,
}

impl FailureKind {
    pub fn of(err: &TraceError) -> Self {
        match err {
            TraceError::InvalidRequest(_) => FailureKind::InvalidRequest,
            TraceError::Parse(_) => FailureKind::ParseFailure,
            TraceError::Instrument(_) => FailureKind::InstrumentationError,
            TraceError::Executor(ExecutorError::CompileError { .. }) => FailureKind::CompileError,
            TraceError::Executor(ExecutorError::CompileTimeout(_)) => FailureKind::CompileTimeout,
            TraceError::Executor(ExecutorError::ExecutionTimeout(_)) => {
                FailureKind::ExecutionTimeout
            }
            TraceError::Executor(_) => FailureKind::ExecutionError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::ParseFailure => "parse_failure",
            FailureKind::InstrumentationError => "instrumentation_error",
            FailureKind::CompileError => "compile_error",
            FailureKind::CompileTimeout => "compile_timeout",
            FailureKind::ExecutionTimeout => "execution_timeout",
            FailureKind::ExecutionError => "execution_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one trace request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceResult {
    Success {
        events: Vec<TraceEvent>,
        raw_output: String,
        instrumented_source: String,
        exit_code: Option<i32>,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl TraceResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TraceResult::Success { .. })
    }

    pub fn events(&self) -> &[TraceEvent] {
        match self {
            TraceResult::Success { events, .. } => events,
            TraceResult::Failure { .. } => &[],
        }
    }

    pub fn failure(err: &TraceError) -> Self {
        TraceResult::Failure {
            kind: FailureKind::of(err),
            message: err.to_string(),
        }
    }
}

/// Successful run before it is flattened into a `TraceResult`
#[derive(Debug, Clone)]
pub struct TraceOutcome {
    pub instrumented: Instrumented,
    pub execution: ExecutionOutput,
    pub events: Vec<TraceEvent>,
}

impl From<TraceOutcome> for TraceResult {
    fn from(outcome: TraceOutcome) -> Self {
        TraceResult::Success {
            events: outcome.events,
            raw_output: outcome.execution.raw_output,
            instrumented_source: outcome.instrumented.source,
            exit_code: outcome.execution.exit_code,
        }
    }
}

/// Stateless between calls; safe to share across threads
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    config: TracerConfig,
    executor: Executor,
}

impl Tracer {
    pub fn new(config: TracerConfig) -> Self {
        let executor = Executor::new(config.executor.clone());
        Self { config, executor }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Trace one program end to end
    ///
    /// **Public** - main entry point of the library
    ///
    /// # Arguments
    /// * `class_name` - Class whose source this is; receives the runtime
    /// * `method_name` - Entry method to trace (usually `main`)
    /// * `source` - Complete compilation unit
    ///
    /// # Returns
    /// `Success` with events in emission order, or `Failure` naming the stage
    pub fn execute_and_trace(&self, class_name: &str, method_name: &str, source: &str) -> TraceResult {
        match self.try_execute_and_trace(class_name, method_name, source) {
            Ok(outcome) => outcome.into(),
            Err(err) => {
                warn!("Trace failed ({}): {}", FailureKind::of(&err), err);
                TraceResult::failure(&err)
            }
        }
    }

    pub fn try_execute_and_trace(
        &self,
        class_name: &str,
        method_name: &str,
        source: &str,
    ) -> Result<TraceOutcome, TraceError> {
        info!("Tracing {}.{}", class_name, method_name);

        let instrumented = self.instrument_only(class_name, method_name, source)?;

        info!("Executing instrumented program...");
        let execution = self.executor.run(
            &instrumented.source,
            instrumented.file_stem(),
            &instrumented.main_class(),
        )?;

        info!("Decoding trace...");
        let events = parse_trace_output(&execution.raw_output);
        info!("✓ Captured {} events", events.len());

        Ok(TraceOutcome {
            instrumented,
            execution,
            events,
        })
    }

    /// Validate, parse and instrument without compiling
    pub fn instrument_only(
        &self,
        class_name: &str,
        method_name: &str,
        source: &str,
    ) -> Result<Instrumented, TraceError> {
        validate_identifier("class", class_name)?;
        validate_identifier("method", method_name)?;

        info!("Parsing source ({} bytes)...", source.len());
        let unit = parse_compilation_unit(source)?;
        debug!("Parsed {} top-level types", unit.types.len());

        info!("Instrumenting...");
        let options = InstrumentOptions::new(class_name, method_name)
            .with_value_policy(self.config.value_policy)
            .with_trace_returns(self.config.trace_returns);
        Ok(instrument(unit, &options)?)
    }
}

/// Java identifier that is neither a keyword nor in the reserved trace namespace
pub fn validate_identifier(what: &str, name: &str) -> Result<(), TraceError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');

    if !valid_start || !valid_rest {
        return Err(TraceError::InvalidRequest(format!(
            "{} name {:?} is not a valid identifier",
            what, name
        )));
    }
    if RESERVED_WORDS.contains(&name) {
        return Err(TraceError::InvalidRequest(format!(
            "{} name {:?} is a reserved word",
            what, name
        )));
    }
    if name.starts_with(SHIM_PREFIX) {
        return Err(TraceError::Instrument(InstrumentError::ReservedName(name.to_string())));
    }
    Ok(())
}
