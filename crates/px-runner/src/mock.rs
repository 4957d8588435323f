// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted runner for supervisor tests that want deterministic timing
//! without forking real processes (spec §9 "a mock runner satisfies the
//! same capability set for tests").

use crate::error::Result;
use crate::{ExitResult, OutputLine, ProcessRunner, Signal, Signaler, Spawn, Spawned};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Behavior a [`MockRunner`]-spawned child exhibits when signaled.
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Exits with the given code as soon as it is started.
    ExitImmediately(i32),
    /// Never exits until signaled; SIGTERM exits cleanly, anything else is
    /// ignored (used to drive the escalation-to-SIGKILL path in tests).
    IgnoresTerm,
    /// Exits cleanly on the first signal received, regardless of kind.
    ExitsOnAnySignal,
}

#[derive(Clone)]
pub struct MockRunner {
    behavior: MockBehavior,
    stdout_lines: Vec<String>,
}

impl MockRunner {
    pub fn new(behavior: MockBehavior) -> Self {
        Self { behavior, stdout_lines: Vec::new() }
    }

    pub fn with_stdout_lines(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stdout_lines.extend(lines.into_iter().map(Into::into));
        self
    }
}

static NEXT_PID: AtomicU32 = AtomicU32::new(9000);

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn start(&self, _spawn: Spawn) -> Result<Spawned> {
        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (_stderr_tx, stderr_rx) = mpsc::unbounded_channel();
        for line in &self.stdout_lines {
            let _ = stdout_tx.send(OutputLine { line: line.clone() });
        }
        let (exit_tx, exit_rx) = tokio::sync::oneshot::channel();
        let pid = NEXT_PID.fetch_add(1, Ordering::Relaxed);
        let exit_tx = Arc::new(Mutex::new(Some(exit_tx)));

        if let MockBehavior::ExitImmediately(code) = self.behavior {
            if let Some(tx) = exit_tx.lock().await.take() {
                let _ = tx.send(ExitResult { code });
            }
        }

        Ok(Spawned {
            pid,
            signaler: Arc::new(MockSignaler { behavior: self.behavior, exit_tx }),
            stdout: stdout_rx,
            stderr: stderr_rx,
            exit: exit_rx,
        })
    }
}

struct MockSignaler {
    behavior: MockBehavior,
    exit_tx: Arc<Mutex<Option<tokio::sync::oneshot::Sender<ExitResult>>>>,
}

impl Signaler for MockSignaler {
    fn signal(&self, sig: Signal) -> Result<()> {
        let should_exit = match self.behavior {
            MockBehavior::ExitImmediately(_) => false,
            MockBehavior::IgnoresTerm => sig != Signal::SIGTERM,
            MockBehavior::ExitsOnAnySignal => true,
        };
        if should_exit {
            let code = -(sig as i32);
            let exit_tx = Arc::clone(&self.exit_tx);
            tokio::spawn(async move {
                if let Some(tx) = exit_tx.lock().await.take() {
                    let _ = tx.send(ExitResult { code });
                }
            });
        }
        Ok(())
    }
}
