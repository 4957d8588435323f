// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix process runner (spec §4.4). Runs the configured command through
//! `sh -c`, with manually created pipes so that a grandchild which
//! inherited the write end keeps the read end alive after the direct
//! child exits (spec §4.4 "Pipe lifetime", SPEC_FULL §4.4 implementation
//! note).

use crate::error::{Result, RunnerError};
use crate::{ExitResult, OutputLine, ProcessRunner, Signal, Signaler, Spawn, Spawned};
use async_trait::async_trait;
use nix::sys::signal::{self};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::process::CommandExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Spawns children via `sh -c` in the caller's own process group
/// (`process_group(0)`), so signaling the negated pid reaches the whole
/// group. Reads stdout/stderr off manually created pipes on blocking
/// threads, independent of the child's wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixRunner;

impl UnixRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for UnixRunner {
    async fn start(&self, spawn: Spawn) -> Result<Spawned> {
        let (stdout_read, stdout_write) = nix::unistd::pipe()
            .map_err(|e| RunnerError::StartFailed(format!("stdout pipe: {e}")))?;
        let (stderr_read, stderr_write) = nix::unistd::pipe()
            .map_err(|e| RunnerError::StartFailed(format!("stderr pipe: {e}")))?;

        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg(&spawn.cmd);
        cmd.envs(&spawn.env);
        if let Some(cwd) = &spawn.cwd {
            cmd.current_dir(cwd);
        }
        // New process group so signals can be delivered to the whole tree
        // (spec §4.4 "setpgid"). No `pre_exec` closure needed: `process_group`
        // is a safe, stable wrapper around the same syscall.
        cmd.process_group(0);
        cmd.stdin(std::process::Stdio::null());
        // Moving the write-end `OwnedFd` into `Stdio` hands it to the child;
        // our copy is closed when the `Command` finishes spawning, per spec
        // §4.4 "the parent closes its write ends immediately after spawn."
        cmd.stdout(std::process::Stdio::from(stdout_write));
        cmd.stderr(std::process::Stdio::from(stderr_write));

        let mut tokio_cmd = tokio::process::Command::from(cmd);
        let mut child = tokio_cmd
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| RunnerError::StartFailed(e.to_string()))?;
        let pid = child
            .id()
            .ok_or_else(|| RunnerError::StartFailed("child exited before pid was observed".into()))?;

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        let cap = spawn.line_buffer_cap.clamp(1, crate::MAX_LINE_BUFFER_CAP);
        tokio::task::spawn_blocking(move || drain_pipe(File::from(stdout_read), cap, stdout_tx));
        tokio::task::spawn_blocking(move || drain_pipe(File::from(stderr_read), cap, stderr_tx));

        // The exit wait runs on its own task immediately, so an unawaited
        // `exit` receiver never delays reaping the child (spec §4.5 "done
        // signal").
        let (exit_tx, exit_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) => ExitResult::from_status(status),
                Err(e) => {
                    warn!("wait() failed: {e}");
                    ExitResult { code: -1 }
                }
            };
            let _ = exit_tx.send(result);
        });

        Ok(Spawned {
            pid,
            signaler: Arc::new(UnixSignaler { pid }),
            stdout: stdout_rx,
            stderr: stderr_rx,
            exit: exit_rx,
        })
    }
}

/// Read newline-delimited lines off `file` until EOF, forwarding each to
/// `tx`. Runs on a blocking thread since the fd is a raw pipe, not
/// registered with the tokio reactor (spec §4.4 implementation note).
/// A line longer than `cap` bytes is flushed as-is rather than grown
/// without bound.
fn drain_pipe(file: File, cap: usize, tx: mpsc::UnboundedSender<OutputLine>) {
    let mut reader = BufReader::with_capacity(cap, file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(OutputLine { line }).is_err() {
                    break;
                }
                if buf.len() >= cap {
                    warn!("line exceeded {cap}-byte buffer, flushed without trailing newline");
                }
            }
            Err(e) => {
                warn!("drainer read error: {e}");
                break;
            }
        }
    }
}

struct UnixSignaler {
    pid: u32,
}

impl Signaler for UnixSignaler {
    fn signal(&self, sig: Signal) -> Result<()> {
        // Negated pid targets the whole process group (spec §4.4).
        let pgid = Pid::from_raw(-(self.pid as i32));
        match signal::kill(pgid, sig) {
            Ok(()) => Ok(()),
            Err(nix::errno::Errno::ESRCH) => Ok(()), // already gone
            Err(e) => Err(RunnerError::SignalFailed(e.to_string())),
        }
    }
}
