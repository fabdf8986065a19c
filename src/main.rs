//! Stepscope CLI
//!
//! Traces a Java program step by step and writes the events as a JSON report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::time::Duration;

use stepscope::commands::{
    display_schema, display_version, execute_instrument, execute_trace, validate_args,
    validate_report_file, InstrumentArgs, TraceArgs,
};
use stepscope::instrument::ValuePolicy;
use stepscope::utils::config::{DEFAULT_COMPILER, DEFAULT_RUNTIME};

/// Stepscope - step-by-step execution tracing for Java
#[derive(Parser, Debug)]
#[command(name = "stepscope")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Instrument, compile and run a program, recording its trace
    Trace {
        /// Class declared in the source; receives the trace runtime
        #[arg(short, long, default_value = "Main")]
        class: String,

        /// Entry method to trace
        #[arg(short, long, default_value = "main")]
        method: String,

        /// Java source file
        #[arg(short, long)]
        source: PathBuf,

        /// Output path for JSON report
        #[arg(short, long, default_value = "trace.json")]
        output: PathBuf,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// How values are rendered in events
        #[arg(long, value_enum, default_value_t = ValuePolicy::Deep)]
        value_policy: ValuePolicy,

        /// Also record values returned from the entry method
        #[arg(long)]
        trace_returns: bool,

        /// Java compiler
        #[arg(long, env = "STEPSCOPE_JAVAC", default_value = DEFAULT_COMPILER)]
        javac: PathBuf,

        /// Java runtime
        #[arg(long, env = "STEPSCOPE_JAVA", default_value = DEFAULT_RUNTIME)]
        java: PathBuf,

        /// Compilation bound in seconds
        #[arg(long, env = "STEPSCOPE_COMPILE_TIMEOUT", default_value = "10")]
        compile_timeout: u64,

        /// Execution bound in seconds
        #[arg(long, env = "STEPSCOPE_EXEC_TIMEOUT", default_value = "5")]
        exec_timeout: u64,
    },

    /// Print the instrumented source without compiling it
    Instrument {
        #[arg(short, long, default_value = "Main")]
        class: String,

        #[arg(short, long, default_value = "main")]
        method: String,

        #[arg(short, long)]
        source: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ValuePolicy::Deep)]
        value_policy: ValuePolicy,

        #[arg(long)]
        trace_returns: bool,
    },

    /// Validate a trace report file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `instrument` output stays clean on stdout
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Trace {
            class,
            method,
            source,
            output,
            summary,
            value_policy,
            trace_returns,
            javac,
            java,
            compile_timeout,
            exec_timeout,
        } => {
            let args = TraceArgs {
                class_name: class,
                method_name: method,
                source,
                output_json: output,
                print_summary: summary,
                value_policy,
                trace_returns,
                compiler: javac,
                runtime: java,
                compile_timeout: Duration::from_secs(compile_timeout),
                execution_timeout: Duration::from_secs(exec_timeout),
            };

            validate_args(&args)?;
            execute_trace(args)?;
        }

        Commands::Instrument {
            class,
            method,
            source,
            output,
            value_policy,
            trace_returns,
        } => {
            execute_instrument(InstrumentArgs {
                class_name: class,
                method_name: method,
                source,
                output,
                value_policy,
                trace_returns,
            })?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
