//! Child process control with a wall-clock bound and merged output.

use crate::utils::error::ExecutorError;
use log::{debug, warn};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Platform-neutral handle to a running child
///
/// **Public** - the only process API the runner uses
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    reaped: bool,
}

impl ChildHandle {
    pub fn new(child: Child) -> Self {
        Self { child, reaped: false }
    }

    /// OS process id while the child has not been reaped
    pub fn process_id(&self) -> Option<u32> {
        (!self.reaped).then(|| self.child.id())
    }

    /// Wait up to `timeout`; `None` means still running
    pub fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let status = self.child.wait_timeout(timeout)?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// Kill and reap; a child that already exited is not an error
    pub fn kill(&mut self) -> io::Result<()> {
        if self.reaped {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => {}
            Err(err) => return Err(err),
        }
        self.child.wait()?;
        self.reaped = true;
        Ok(())
    }
}

/// What a bounded run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRun {
    /// `None` when the wall-clock bound was hit and the child killed
    pub status: Option<ExitStatus>,
    /// stdout and stderr interleaved in write order
    pub output: Vec<u8>,
    pub truncated: bool,
    pub process_id: Option<u32>,
}

impl CapturedRun {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Spawn `command` with stdin closed and stdout/stderr sharing one pipe
///
/// **Public** - used for both the compiler and the traced program
///
/// # Arguments
/// * `command` - Fully configured command; consumed so the parent's copies
///   of the pipe's write end are closed right after spawning
/// * `timeout` - Wall-clock bound for the child
/// * `max_output_bytes` - Output kept; the rest is drained and discarded
///
/// # Errors
/// * `ExecutorError::Spawn` - program could not be started
/// * `ExecutorError::Io` - pipe creation or waiting failed
pub fn run_bounded(
    mut command: Command,
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<CapturedRun, ExecutorError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let (reader, writer) = io::pipe()?;
    command
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);

    let child = command.spawn().map_err(|source| ExecutorError::Spawn {
        program: program.clone(),
        source,
    })?;
    drop(command);

    let mut handle = ChildHandle::new(child);
    let process_id = handle.process_id();
    debug!("Started {} (pid {:?})", program, process_id);

    // Drained concurrently so a chatty child never blocks on a full pipe
    let drain = thread::spawn(move || read_to_end_capped(reader, max_output_bytes));

    let status = match handle.wait_timeout(timeout) {
        Ok(status) => status,
        Err(err) => {
            let _ = handle.kill();
            return Err(err.into());
        }
    };

    let Some(status) = status else {
        warn!("{} exceeded {:?}, killing", program, timeout);
        handle.kill()?;
        // Descendants may still hold the pipe open; the drain thread is detached
        return Ok(CapturedRun {
            status: None,
            output: Vec::new(),
            truncated: false,
            process_id,
        });
    };

    let (output, truncated) = join_drain(drain, &program)?;
    if truncated {
        warn!("Output of {} truncated at {} bytes", program, max_output_bytes);
    }

    Ok(CapturedRun {
        status: Some(status),
        output,
        truncated,
        process_id,
    })
}

/// Collect the drain thread's result; a panicked reader is an I/O failure
fn join_drain(
    drain: thread::JoinHandle<io::Result<(Vec<u8>, bool)>>,
    program: &str,
) -> Result<(Vec<u8>, bool), ExecutorError> {
    let drained = drain
        .join()
        .map_err(|_| io::Error::other(format!("output reader for {} panicked", program)))?;
    Ok(drained?)
}

/// Read everything, keeping at most `cap` bytes
pub fn read_to_end_capped<R: Read>(mut reader: R, cap: usize) -> io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match reader.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        if truncated {
            continue;
        }

        let remaining = cap.saturating_sub(buf.len());
        if n <= remaining {
            buf.extend_from_slice(&tmp[..n]);
        } else {
            buf.extend_from_slice(&tmp[..remaining]);
            truncated = true;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_end_capped_keeps_prefix() {
        let data = vec![b'a'; 20_000];
        let (buf, truncated) = read_to_end_capped(&data[..], 10_000).unwrap();
        assert_eq!(buf.len(), 10_000);
        assert!(truncated);

        let (buf, truncated) = read_to_end_capped(&b"short"[..], 10_000).unwrap();
        assert_eq!(buf, b"short");
        assert!(!truncated);
    }

    #[cfg(unix)]
    #[test]
    fn test_merged_streams_keep_order() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo one; echo two 1>&2; echo three");
        let run = run_bounded(command, Duration::from_secs(5), 1024).unwrap();
        assert!(run.status.is_some_and(|s| s.success()));
        assert_eq!(run.output_lossy(), "one\ntwo\nthree\n");
        assert!(run.process_id.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("exec sleep 10");
        let run = run_bounded(command, Duration::from_millis(200), 1024).unwrap();
        assert!(run.timed_out());

        // Killed and reaped: the pid no longer names a process we can signal
        let pid = run.process_id.unwrap().to_string();
        let alive = Command::new("kill").arg("-0").arg(&pid).status().unwrap();
        assert!(!alive.success());
    }

    #[test]
    fn test_panicked_reader_is_io_error() {
        let drain = thread::spawn(|| -> io::Result<(Vec<u8>, bool)> { panic!("reader failed") });
        let err = join_drain(drain, "java").unwrap_err();
        assert!(matches!(err, ExecutorError::Io(_)));
        assert!(err.to_string().contains("java"));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let command = Command::new("definitely-not-a-real-program-xyz");
        let err = run_bounded(command, Duration::from_secs(1), 1024).unwrap_err();
        assert!(matches!(err, ExecutorError::Spawn { .. }));
    }
}
