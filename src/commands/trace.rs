//! Trace command implementation.
//!
//! The trace command:
//! 1. Reads the source file
//! 2. Runs the pipeline (instrument, compile, run, decode)
//! 3. Writes the JSON report
//! 4. Optionally prints a summary

use super::models::TraceArgs;
use crate::executor::ExecutorConfig;
use crate::output::{write_report, TraceReport};
use crate::pipeline::{validate_identifier, TraceResult, Tracer, TracerConfig};
use crate::protocol::{EventType, TraceSummary};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use std::time::{Duration, Instant};

/// Execute the trace command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Trace command arguments
///
/// # Returns
/// The pipeline result. The report is written for failures too; a failed
/// trace is then reported as an error so the process exits non-zero.
///
/// # Errors
/// * Source file cannot be read
/// * Report cannot be written
/// * The pipeline reported a failure
pub fn execute_trace(args: TraceArgs) -> Result<TraceResult> {
    let start_time = Instant::now();

    info!("Starting trace of {}.{}", args.class_name, args.method_name);

    info!("Step 1/3: Reading source...");
    let source = std::fs::read_to_string(&args.source)
        .with_context(|| format!("Failed to read source file {}", args.source.display()))?;
    debug!("Read {} bytes from {}", source.len(), args.source.display());

    info!("Step 2/3: Running pipeline...");
    let tracer = Tracer::new(tracer_config(&args));
    let result = tracer.execute_and_trace(&args.class_name, &args.method_name, &source);

    info!("Step 3/3: Writing report...");
    let report = TraceReport::new(&args.class_name, &args.method_name, result.clone());
    write_report(&report, &args.output_json).context("Failed to write trace report")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if args.print_summary {
        print_summary(&args, &result);
    }

    let elapsed = start_time.elapsed();
    info!("Trace completed in {:.2}s", elapsed.as_secs_f64());

    if let TraceResult::Failure { kind, message } = &result {
        anyhow::bail!("Trace failed ({}): {}", kind, message);
    }
    Ok(result)
}

fn tracer_config(args: &TraceArgs) -> TracerConfig {
    let executor = ExecutorConfig::default()
        .with_compiler(&args.compiler)
        .with_runtime(&args.runtime)
        .with_compile_timeout(args.compile_timeout)
        .with_execution_timeout(args.execution_timeout);

    TracerConfig::default()
        .with_executor(executor)
        .with_value_policy(args.value_policy)
        .with_trace_returns(args.trace_returns)
}

fn print_summary(args: &TraceArgs, result: &TraceResult) {
    println!("\n{}", "=".repeat(80));
    println!("TRACE SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Target: {}.{}", args.class_name, args.method_name);

    match result {
        TraceResult::Success { events, exit_code, .. } => {
            let summary = TraceSummary::from_events(events);
            println!("Exit Code:   {}", exit_code.map_or("signal".to_string(), |c| c.to_string()));
            println!("Events:      {}", summary.total_events);
            println!("Duration:    {} ms", summary.duration_ms);
            for event_type in [
                EventType::MethodEntry,
                EventType::VariableUpdate,
                EventType::Return,
                EventType::ParseError,
            ] {
                println!("  {:<16} {}", event_type.as_str(), summary.count(event_type));
            }
            if !summary.last_values.is_empty() {
                println!("\nFinal values:");
                for (name, value) in &summary.last_values {
                    println!("  {} = {}", name, value);
                }
            }
        }
        TraceResult::Failure { kind, message } => {
            println!("Failed:      {}", kind);
            println!("{}", message);
        }
    }
    println!("{}", "=".repeat(80));
}

/// Validate trace arguments
///
/// **Public** - can be called before execute_trace for early validation
pub fn validate_args(args: &TraceArgs) -> Result<()> {
    validate_request(&args.class_name, &args.method_name, &args.source)?;

    if args.compile_timeout == Duration::ZERO {
        anyhow::bail!("compile timeout must be greater than 0");
    }

    if args.execution_timeout == Duration::ZERO {
        anyhow::bail!("execution timeout must be greater than 0");
    }

    if args.output_json.is_dir() {
        anyhow::bail!("Output path is a directory: {}", args.output_json.display());
    }

    Ok(())
}

/// Checks shared by every command that takes a class, method and source
pub fn validate_request(class_name: &str, method_name: &str, source: &Path) -> Result<()> {
    validate_identifier("class", class_name)?;
    validate_identifier("method", method_name)?;

    if !source.is_file() {
        anyhow::bail!("Source file not found: {}", source.display());
    }

    Ok(())
}
