//! Instrument command: print or write the rewritten source without running it.

use super::models::InstrumentArgs;
use super::trace::validate_request;
use crate::output::write_text;
use crate::pipeline::{Tracer, TracerConfig};
use anyhow::{Context, Result};
use log::info;

/// Execute the instrument command
///
/// **Public** - called from main.rs
///
/// # Errors
/// * Source cannot be read, parsed or instrumented
/// * Output cannot be written
pub fn execute_instrument(args: InstrumentArgs) -> Result<String> {
    validate_request(&args.class_name, &args.method_name, &args.source)?;

    let source = std::fs::read_to_string(&args.source)
        .with_context(|| format!("Failed to read source file {}", args.source.display()))?;

    let tracer = Tracer::new(
        TracerConfig::default()
            .with_value_policy(args.value_policy)
            .with_trace_returns(args.trace_returns),
    );
    let instrumented = tracer
        .instrument_only(&args.class_name, &args.method_name, &source)
        .context("Failed to instrument source")?;

    let summary = instrumented.plan_summary;
    info!(
        "Planned {} entry, {} variable and {} return hooks",
        summary.entry_hooks, summary.variable_hooks, summary.return_hooks
    );

    match &args.output {
        Some(path) => {
            write_text(&instrumented.source, path).context("Failed to write instrumented source")?;
            info!("✓ Instrumented source written to: {}", path.display());
        }
        None => print!("{}", instrumented.source),
    }

    Ok(instrumented.source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Main.java");
        std::fs::write(
            &source,
            "public class Main { public static void main(String[] args) { int x = 1; } }",
        )
        .unwrap();
        let output = dir.path().join("out/Main.java");

        let text = execute_instrument(InstrumentArgs {
            source,
            output: Some(output.clone()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), text);
        assert!(text.contains("Main.__traceVariable(\"x\", x);"));
    }

    #[test]
    fn test_instrument_reports_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Main.java");
        std::fs::write(&source, "class Main { void run() {} }").unwrap();

        let err = execute_instrument(InstrumentArgs {
            source,
            ..Default::default()
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Entry method 'main' not found"));
    }
}
