//! Stepscope
//!
//! Step-by-step execution tracing for Java programs.
//!
//! A source file is parsed, rewritten so that the running program reports
//! its own variable updates and method entries, compiled and run in a
//! throwaway workspace, and the reported events are decoded back into an
//! ordered trace.
//!
//! ## Getting Started
//!
//! ```ignore
//! use stepscope::pipeline::{Tracer, TracerConfig};
//!
//! let tracer = Tracer::new(TracerConfig::default());
//! let result = tracer.execute_and_trace("Main", "main", &source);
//! for event in result.events() {
//!     println!("{} {}", event.step, event.action);
//! }
//! ```

pub mod commands;
pub mod executor;
pub mod instrument;
pub mod output;
pub mod pipeline;
pub mod protocol;
pub mod syntax;
pub mod utils;

pub use pipeline::{FailureKind, TraceResult, Tracer, TracerConfig};
pub use protocol::{EventType, TraceEvent};
