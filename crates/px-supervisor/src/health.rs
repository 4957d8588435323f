// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health checker (spec §4.6): periodic execution of a user command,
//! tracking consecutive failures and flipping status after a retry
//! threshold. Cancellation stops the loop between checks and during a
//! running check, via a `CancellationToken` cutting through the bounded
//! per-check timeout (spec §5 "supervisor-wide context cancels health
//! checkers").

use parking_lot::Mutex;
use px_core::{Clock, HealthConfig, HealthState};
use px_runner::{ProcessRunner, Spawn};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct HealthChecker {
    state: Mutex<HealthState>,
    cancel: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl HealthChecker {
    /// Start the health-check loop for `process_name`. Sleeps
    /// `config.start_period`, runs one check immediately, then repeats
    /// every `config.interval` until cancelled.
    pub fn spawn<C: Clock>(
        config: HealthConfig,
        runner: Arc<dyn ProcessRunner>,
        clock: C,
        process_name: String,
    ) -> Arc<Self> {
        let checker = Arc::new(Self {
            state: Mutex::new(HealthState::default()),
            cancel: CancellationToken::new(),
            join: Mutex::new(None),
        });
        let loop_checker = Arc::clone(&checker);
        let cancel = checker.cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(config.start_period) => {}
            }
            loop {
                let (exit_code, output) = run_check(runner.as_ref(), &config.cmd, config.timeout).await;
                let now = clock.epoch_ms();
                {
                    let mut state = loop_checker.state.lock();
                    if exit_code == 0 {
                        state.record_success(now, &output);
                    } else {
                        state.record_failure(now, &output, config.retries);
                    }
                    debug!(process = %process_name, status = ?state.status, exit_code, "health check result");
                }
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(config.interval) => {}
                }
            }
        });
        *checker.join.lock() = Some(handle);
        checker
    }

    pub fn snapshot(&self) -> HealthState {
        self.state.lock().clone()
    }

    /// Stop the loop. Idempotent: cancelling an already-cancelled token is a
    /// no-op in `tokio-util`.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.join.lock().take() {
            handle.abort();
        }
    }
}

/// Run one health-check command under a bounded timeout, combining stdout
/// and stderr into a single string (spec §4.6).
async fn run_check(runner: &dyn ProcessRunner, cmd: &str, timeout: std::time::Duration) -> (i32, String) {
    let check = async {
        let mut spawned = match runner.start(Spawn::new(cmd)).await {
            Ok(s) => s,
            Err(e) => return (-1, format!("failed to start health check: {e}")),
        };
        let mut output = String::new();
        while let Some(line) = spawned.stdout.recv().await {
            output.push_str(&line.line);
            output.push('\n');
        }
        while let Some(line) = spawned.stderr.recv().await {
            output.push_str(&line.line);
            output.push('\n');
        }
        let exit_code = spawned.exit.await.map(|e| e.code).unwrap_or(-1);
        (exit_code, output)
    };
    match tokio::time::timeout(timeout, check).await {
        Ok(result) => result,
        Err(_) => (-1, "health check timed out".to_string()),
    }
}
