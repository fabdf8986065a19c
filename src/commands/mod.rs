//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components to perform user tasks.

pub mod instrument;
pub mod models;
pub mod trace;
pub mod utils;

// Re-export main command functions
pub use instrument::execute_instrument;
pub use models::{InstrumentArgs, TraceArgs};
pub use trace::{execute_trace, validate_args};
pub use utils::{display_schema, display_version, validate_report_file};
