//! Sandboxed build-and-run: workspace, bounded child processes, compile/run.

pub mod process;
pub mod runner;
pub mod workspace;

pub use process::{run_bounded, CapturedRun, ChildHandle};
pub use runner::{ExecutionOutput, Executor, ExecutorConfig};
pub use workspace::Workspace;
