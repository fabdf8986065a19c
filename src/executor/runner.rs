//! Compile-then-run for one instrumented source.
//!
//! Each call gets its own workspace, so concurrent runs never share files.
//! The workspace is removed when `run` returns, whatever the outcome.

use super::process::run_bounded;
use super::workspace::Workspace;
use crate::utils::config::{
    DEFAULT_COMPILER, DEFAULT_COMPILE_TIMEOUT, DEFAULT_EXECUTION_TIMEOUT,
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_RUNTIME,
};
use crate::utils::error::ExecutorError;
use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// JVM properties that make every text stream UTF-8, matching `-encoding UTF-8`
/// at compile time. `stdout.encoding` is honored from JDK 18 on and ignored
/// before that.
const RUNTIME_ENCODING_FLAGS: &[&str] = &[
    "-Dfile.encoding=UTF-8",
    "-Dsun.stdout.encoding=UTF-8",
    "-Dsun.stderr.encoding=UTF-8",
    "-Dstdout.encoding=UTF-8",
    "-Dstderr.encoding=UTF-8",
];

/// Tool locations and bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub compiler: PathBuf,
    pub runtime: PathBuf,
    pub compile_timeout: Duration,
    pub execution_timeout: Duration,
    pub max_output_bytes: usize,
    /// Parent of per-run workspaces; system temp root when `None`
    pub workspace_root: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            runtime: PathBuf::from(DEFAULT_RUNTIME),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            workspace_root: None,
        }
    }
}

impl ExecutorConfig {
    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_runtime(mut self, runtime: impl Into<PathBuf>) -> Self {
        self.runtime = runtime.into();
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }
}

/// What the traced program produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutput {
    /// stdout and stderr merged in write order
    pub raw_output: String,

    /// `None` when the program was ended by a signal
    pub exit_code: Option<i32>,

    /// Output exceeded the configured cap
    pub truncated: bool,

    pub process_id: Option<u32>,
}

/// Compiles and runs generated sources in throwaway workspaces
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Compile `source` and run its `main`
    ///
    /// **Public** - the executor's single entry point
    ///
    /// # Arguments
    /// * `source` - Complete compilation unit
    /// * `file_stem` - File name without extension; must match the public type
    /// * `main_class` - Binary name passed to the runtime (package-qualified)
    ///
    /// # Errors
    /// * `ExecutorError::CompileTimeout` / `ExecutionTimeout` - bound exceeded, child killed
    /// * `ExecutorError::CompileError` - compiler exited non-zero; carries its output
    /// * `ExecutorError::Workspace` / `Spawn` / `Io` - environment failures
    pub fn run(
        &self,
        source: &str,
        file_stem: &str,
        main_class: &str,
    ) -> Result<ExecutionOutput, ExecutorError> {
        info!("Step 1/3: Preparing workspace...");
        let workspace = match &self.config.workspace_root {
            Some(root) => Workspace::create_in(root)?,
            None => Workspace::create()?,
        };
        let source_file = workspace.write_source(file_stem, source)?;
        debug!("Wrote {}", source_file.display());

        info!("Step 2/3: Compiling {}...", file_stem);
        self.compile(workspace.path(), &source_file)?;

        info!("Step 3/3: Running {}...", main_class);
        let output = self.execute(workspace.path(), main_class)?;

        info!(
            "Program exited with {:?} ({} bytes of output)",
            output.exit_code,
            output.raw_output.len()
        );
        Ok(output)
    }

    fn compile(&self, workspace: &Path, source_file: &Path) -> Result<(), ExecutorError> {
        let mut command = Command::new(&self.config.compiler);
        command
            .arg("-encoding")
            .arg("UTF-8")
            .arg("-cp")
            .arg(workspace)
            .arg("-d")
            .arg(workspace)
            .arg(source_file)
            .current_dir(workspace);

        let run = run_bounded(
            command,
            self.config.compile_timeout,
            self.config.max_output_bytes,
        )?;

        match run.status {
            None => Err(ExecutorError::CompileTimeout(self.config.compile_timeout)),
            Some(status) if !status.success() => Err(ExecutorError::CompileError {
                diagnostics: run.output_lossy().trim_end().to_string(),
            }),
            Some(_) => {
                debug!("Compilation succeeded");
                Ok(())
            }
        }
    }

    fn execute(&self, workspace: &Path, main_class: &str) -> Result<ExecutionOutput, ExecutorError> {
        let mut command = Command::new(&self.config.runtime);
        command
            .args(RUNTIME_ENCODING_FLAGS)
            .arg("-cp")
            .arg(workspace)
            .arg(main_class)
            .current_dir(workspace);

        let run = run_bounded(
            command,
            self.config.execution_timeout,
            self.config.max_output_bytes,
        )?;

        let Some(status) = run.status else {
            return Err(ExecutorError::ExecutionTimeout(self.config.execution_timeout));
        };

        Ok(ExecutionOutput {
            raw_output: run.output_lossy(),
            exit_code: status.code(),
            truncated: run.truncated,
            process_id: run.process_id,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn stand_in(tools: &Path, javac: &str, java: &str) -> (Executor, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let config = ExecutorConfig::default()
            .with_compiler(script(tools, "javac", javac))
            .with_runtime(script(tools, "java", java))
            .with_compile_timeout(Duration::from_secs(5))
            .with_execution_timeout(Duration::from_secs(5))
            .with_workspace_root(root.path());
        (Executor::new(config), root)
    }

    #[test]
    fn test_runs_main_class_and_reports_exit_code() {
        let tools = tempfile::tempdir().unwrap();
        let (executor, root) = stand_in(
            tools.path(),
            "exit 0",
            "for arg; do last=$arg; done; echo \"out $last\"; echo err 1>&2; exit 3",
        );

        let output = executor.run("class Main {}", "Main", "demo.Main").unwrap();
        assert_eq!(output.raw_output, "out demo.Main\nerr\n");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.truncated);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_compile_failure_carries_diagnostics() {
        let tools = tempfile::tempdir().unwrap();
        let (executor, root) = stand_in(
            tools.path(),
            "echo \"Main.java:1: error: ';' expected\" 1>&2; exit 1",
            "exit 0",
        );

        let err = executor.run("class Main {", "Main", "Main").unwrap_err();
        match err {
            ExecutorError::CompileError { diagnostics } => {
                assert_eq!(diagnostics, "Main.java:1: error: ';' expected");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_compiler_sees_source_file() {
        let tools = tempfile::tempdir().unwrap();
        let (executor, _root) = stand_in(
            tools.path(),
            "test -f \"$7\" || exit 1; test \"$2\" = UTF-8",
            "exit 0",
        );
        assert!(executor.run("class Hello {}", "Hello", "Hello").is_ok());
    }

    #[test]
    fn test_runtime_gets_utf8_streams() {
        let tools = tempfile::tempdir().unwrap();
        let (executor, _root) = stand_in(
            tools.path(),
            "exit 0",
            "for arg; do case $arg in -D*) echo \"$arg\";; esac; done; printf 'h\\303\\251llo\\n'",
        );
        let output = executor.run("class Main {}", "Main", "Main").unwrap();
        for flag in RUNTIME_ENCODING_FLAGS {
            assert!(output.raw_output.contains(flag), "missing {}", flag);
        }
        assert!(output.raw_output.ends_with("héllo\n"));
    }

    #[test]
    fn test_timeouts_map_to_stage() {
        let tools = tempfile::tempdir().unwrap();
        let (executor, _root) = stand_in(tools.path(), "exec sleep 10", "exit 0");
        let executor = Executor::new(
            executor.config().clone().with_compile_timeout(Duration::from_millis(300)),
        );
        let err = executor.run("class Main {}", "Main", "Main").unwrap_err();
        assert!(matches!(err, ExecutorError::CompileTimeout(_)));

        let tools = tempfile::tempdir().unwrap();
        let (executor, root) = stand_in(tools.path(), "exit 0", "exec sleep 10");
        let executor = Executor::new(
            executor.config().clone().with_execution_timeout(Duration::from_millis(300)),
        );
        let err = executor.run("class Main {}", "Main", "Main").unwrap_err();
        assert!(matches!(err, ExecutorError::ExecutionTimeout(_)));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_output_cap_truncates() {
        let tools = tempfile::tempdir().unwrap();
        let (executor, _root) = stand_in(
            tools.path(),
            "exit 0",
            "i=0; while [ $i -lt 100 ]; do echo 0123456789; i=$((i+1)); done",
        );
        let executor = Executor::new(executor.config().clone().with_max_output_bytes(50));
        let output = executor.run("class Main {}", "Main", "Main").unwrap();
        assert!(output.truncated);
        assert_eq!(output.raw_output.len(), 50);
        assert_eq!(output.exit_code, Some(0));
    }
}
