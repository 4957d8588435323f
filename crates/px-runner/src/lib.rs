// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! px-runner: the process runner capability (spec §4.4) — a narrow,
//! dyn-safe trait for spawning a shell command with manually-owned pipes,
//! a POSIX process group, and signal delivery to that group. Mirrors the
//! capability-trait shape of `oj-daemon`'s `AgentAdapter`: a small surface
//! that both a real Unix runner and a mock runner for tests can satisfy.

mod error;
#[cfg(any(test, feature = "test-support"))]
mod mock;
mod unix;

pub use error::{Result, RunnerError};
#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockBehavior, MockRunner};
pub use nix::sys::signal::Signal;
pub use unix::UnixRunner;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// The exit outcome of a child process. A signal termination is reported as
/// the negated signal number, matching `WIFSIGNALED`/`WTERMSIG` semantics
/// (spec §4.4 "Exit result").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitResult {
    pub code: i32,
}

impl ExitResult {
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        match status.signal() {
            Some(sig) => Self { code: -sig },
            None => Self { code: status.code().unwrap_or(0) },
        }
    }
}

/// What to run and how to compose its environment (spec §4.4 "Environment
/// composition"): the inherited parent environment, overlaid with
/// process-specific variables.
#[derive(Debug, Clone)]
pub struct Spawn {
    pub cmd: String,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
    /// Scanner buffer size for line reading, in bytes (spec §4.4, default
    /// 64 KiB, configurable up to 1 MiB).
    pub line_buffer_cap: usize,
}

pub const DEFAULT_LINE_BUFFER_CAP: usize = 64 * 1024;
pub const MAX_LINE_BUFFER_CAP: usize = 1024 * 1024;

impl Spawn {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into(), env: HashMap::new(), cwd: None, line_buffer_cap: DEFAULT_LINE_BUFFER_CAP }
    }
}

/// One captured line from a child's stdout or stderr, read off a manually
/// owned pipe independent of the child's exit (spec §4.4 "Pipe lifetime").
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub line: String,
}

/// A lock-free handle for delivering signals to a running child's process
/// group. Kept separate from the exit future so that a caller signaling the
/// process never contends with the task awaiting its exit (spec §4.5
/// "concurrent callers coalesce by waiting on done", §5 "Managed process"
/// locking model).
pub trait Signaler: Send + Sync {
    /// Deliver `sig` to the negated process group id, so grandchildren that
    /// inherited the group membership are also signaled (spec §4.4).
    fn signal(&self, sig: Signal) -> Result<()>;
}

/// Everything a caller gets back from a successful spawn (spec §4.4's
/// `start(config, env) -> handle`): the pid, a signaler, the two output
/// line streams, and a one-shot future that resolves with the exit result.
/// The exit wait itself already runs on a background task internally, so
/// holding `exit` unawaited never blocks the child from being reaped.
pub struct Spawned {
    pub pid: u32,
    pub signaler: Arc<dyn Signaler>,
    pub stdout: mpsc::UnboundedReceiver<OutputLine>,
    pub stderr: mpsc::UnboundedReceiver<OutputLine>,
    pub exit: oneshot::Receiver<ExitResult>,
}

/// The runner capability: spawn a shell command and hand back a
/// [`Spawned`] process. A `UnixRunner` is the production implementation; a
/// `MockRunner` satisfies the same trait for supervisor tests that don't
/// want to fork real processes (spec §9 "Dynamic dispatch for the runner").
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn start(&self, spawn: Spawn) -> Result<Spawned>;
}
