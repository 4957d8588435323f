// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed process state machine (spec §4.5): one incarnation at a time,
//! protected by a single mutex over state, pid, signaler, and the done
//! signal, mirroring the locking model in §5 ("one mutex protects state,
//! current handle, health checker pointer, and the done signal").

use crate::health::HealthChecker;
use crate::supervisor::EventFanout;
use parking_lot::Mutex;
use px_core::{Error, HealthCheckInfo, HealthConfig, HealthState, LogEntry, ProcessInfo, ProcessState, Stream, SupervisorEvent};
use px_logs::SharedLogManager;
use px_runner::{ExitResult, OutputLine, ProcessRunner, Signal, Spawn};
use px_core::Clock;
use px_core::SystemClock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::warn;

pub type Result<T> = std::result::Result<T, Error>;

/// Bound on waiting for both drainers to finish after the child exits
/// (spec §4.5).
pub const DRAIN_DEADLINE: Duration = Duration::from_secs(5);
/// Extra wait after SIGKILL before giving up on a clean done signal
/// (spec §4.5 "a further short bounded interval").
pub const KILL_GRACE: Duration = Duration::from_secs(1);

struct Inner {
    state: ProcessState,
    pid: Option<u32>,
    started_at: Option<u64>,
    restart_count: u32,
    signaler: Option<Arc<dyn px_runner::Signaler>>,
    done_rx: Option<watch::Receiver<bool>>,
    health_checker: Option<Arc<HealthChecker>>,
    last_health: HealthState,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: ProcessState::Stopped,
            pid: None,
            started_at: None,
            restart_count: 0,
            signaler: None,
            done_rx: None,
            health_checker: None,
            last_health: HealthState::default(),
        }
    }
}

/// One configured process under supervision. Holds a non-owning handle to
/// the log manager (spec §9 "unidirectional ownership") and the shared
/// runner capability; never owns the supervisor's process map.
pub struct ManagedProcess<C: Clock = SystemClock> {
    name: String,
    cmd: String,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    health_config: Option<HealthConfig>,
    runner: Arc<dyn ProcessRunner>,
    log_manager: SharedLogManager<C>,
    clock: C,
    events: Arc<EventFanout>,
    inner: Mutex<Inner>,
}

impl<C: Clock> ManagedProcess<C> {
    pub fn new(
        name: impl Into<String>,
        cmd: impl Into<String>,
        env: HashMap<String, String>,
        cwd: Option<PathBuf>,
        health_config: Option<HealthConfig>,
        runner: Arc<dyn ProcessRunner>,
        log_manager: SharedLogManager<C>,
        clock: C,
        events: Arc<EventFanout>,
    ) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            env,
            cwd,
            health_config,
            runner,
            log_manager,
            clock,
            events,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot for the admin API / event payloads (spec §6 Process info
    /// JSON).
    pub fn info(&self) -> ProcessInfo {
        let inner = self.inner.lock();
        let health = match &inner.health_checker {
            Some(hc) => hc.snapshot(),
            None => inner.last_health.clone(),
        };
        ProcessInfo {
            name: self.name.clone(),
            status: inner.state,
            pid: inner.pid,
            started_at: inner.started_at,
            restarts: inner.restart_count,
            health: health.status,
            healthcheck: self.health_config.as_ref().map(|_| HealthCheckInfo {
                enabled: true,
                status: health.status,
                last_check: health.last_check,
                last_output: health.last_output.clone(),
                consecutive_failures: health.consecutive_failures,
            }),
        }
    }

    /// `stopped|crashed --start()--> starting --> running` (spec §4.5).
    /// Fails with `process_already_running` if a live incarnation exists.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_live() {
                return Err(Error::ProcessAlreadyRunning(self.name.clone()));
            }
            inner.state = ProcessState::Starting;
        }

        let mut spawn = Spawn::new(&self.cmd);
        spawn.env = self.env.clone();
        spawn.cwd = self.cwd.clone();
        let spawned = match self.runner.start(spawn).await {
            Ok(spawned) => spawned,
            Err(e) => {
                let mut inner = self.inner.lock();
                inner.state = ProcessState::Crashed;
                inner.pid = None;
                return Err(Error::StartFailed { name: self.name.clone(), reason: e.to_string() });
            }
        };

        let (done_tx, done_rx) = watch::channel(false);
        {
            let mut inner = self.inner.lock();
            inner.state = ProcessState::Running;
            inner.pid = Some(spawned.pid);
            inner.started_at = Some(self.clock.epoch_ms());
            inner.signaler = Some(Arc::clone(&spawned.signaler));
            inner.done_rx = Some(done_rx);
            inner.last_health = HealthState::default();
        }

        if let Some(cfg) = self.health_config.clone() {
            let checker = HealthChecker::spawn(cfg, Arc::clone(&self.runner), self.clock.clone(), self.name.clone());
            self.inner.lock().health_checker = Some(checker);
        }

        let stdout_handle = self.spawn_drainer(spawned.stdout, Stream::Stdout);
        let stderr_handle = self.spawn_drainer(spawned.stderr, Stream::Stderr);
        self.spawn_monitor(spawned.exit, stdout_handle, stderr_handle, done_tx);

        Ok(())
    }

    /// `running|starting --stop()--> stopping --> stopped` (spec §4.5).
    /// Concurrent callers coalesce on the same done signal rather than each
    /// re-signaling the group.
    pub async fn stop(self: &Arc<Self>, deadline: Duration) -> Result<()> {
        let (initiator, signaler, mut done_rx) = {
            let mut inner = self.inner.lock();
            if !inner.state.is_live() {
                return Err(Error::ProcessNotRunning(self.name.clone()));
            }
            let initiator = inner.state != ProcessState::Stopping;
            if initiator {
                inner.state = ProcessState::Stopping;
            }
            match (inner.signaler.clone(), inner.done_rx.clone()) {
                (Some(signaler), Some(done_rx)) => (initiator, signaler, done_rx),
                _ => return Ok(()),
            }
        };

        if initiator {
            let _ = signaler.signal(Signal::SIGTERM);
        }

        if wait_for_done(&mut done_rx, deadline).await {
            return Ok(());
        }

        if !initiator {
            // Another caller owns the escalation; just keep waiting.
            let _ = wait_for_done(&mut done_rx, KILL_GRACE * 10).await;
            return Ok(());
        }

        self.log_manager
            .write_system(&self.name, format!("sending SIGKILL to {} (graceful shutdown timed out)", self.name));
        let _ = signaler.signal(Signal::SIGKILL);
        wait_for_done(&mut done_rx, KILL_GRACE).await;
        Ok(())
    }

    /// `restart()` = stop (ignoring `process_not_running`) → increment
    /// restart count → start (spec §4.5).
    pub async fn restart(self: &Arc<Self>, deadline: Duration) -> Result<()> {
        match self.stop(deadline).await {
            Ok(()) => {}
            Err(Error::ProcessNotRunning(_)) => {}
            Err(e) => return Err(e),
        }
        self.inner.lock().restart_count += 1;
        self.start().await
    }

    fn spawn_drainer(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<OutputLine>, stream: Stream) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                this.log_manager.write(LogEntry::new(this.clock.epoch_ms(), &this.name, stream, line.line));
            }
        })
    }

    fn spawn_monitor(
        self: &Arc<Self>,
        exit_rx: oneshot::Receiver<ExitResult>,
        stdout: JoinHandle<()>,
        stderr: JoinHandle<()>,
        done_tx: watch::Sender<bool>,
    ) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let exit = exit_rx.await.unwrap_or(ExitResult { code: -1 });

            let drain = async {
                let _ = stdout.await;
                let _ = stderr.await;
            };
            if tokio::time::timeout(DRAIN_DEADLINE, drain).await.is_err() {
                warn!(process = %this.name, "drainers did not finish within drain deadline");
            }

            let was_stopping = this.inner.lock().state == ProcessState::Stopping;
            let message = if was_stopping {
                format!("stopped (rc={})", exit.code)
            } else {
                format!("exited unexpectedly (rc={})", exit.code)
            };
            this.log_manager.write_system(&this.name, message);

            {
                let mut inner = this.inner.lock();
                inner.state = if was_stopping { ProcessState::Stopped } else { ProcessState::Crashed };
                inner.pid = None;
                inner.signaler = None;
                inner.done_rx = None;
                if let Some(hc) = inner.health_checker.take() {
                    inner.last_health = hc.snapshot();
                    hc.cancel();
                }
            }

            if !was_stopping {
                // starting|running --observes unexpected exit--> crashed
                // (spec §3, §4.5): notify subscribers, not just the log.
                this.events.broadcast(&SupervisorEvent::process_crashed(this.clock.epoch_ms(), this.info()));
            }

            let _ = done_tx.send(true);
        });
    }
}

/// Wait for the done signal to flip true, bounded by `timeout`. Returns
/// whether it closed in time.
async fn wait_for_done(done_rx: &mut watch::Receiver<bool>, timeout: Duration) -> bool {
    let wait = async {
        loop {
            if *done_rx.borrow() {
                return;
            }
            if done_rx.changed().await.is_err() {
                return;
            }
        }
    };
    tokio::time::timeout(timeout, wait).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use px_core::{FakeClock, HealthStatus};
    use px_logs::{Fanout, LogManager};
    use px_runner::{MockBehavior, MockRunner};

    fn test_events() -> Arc<EventFanout> {
        Arc::new(Fanout::new(px_logs::DEFAULT_QUEUE_SIZE))
    }

    fn process(runner: MockRunner) -> Arc<ManagedProcess<FakeClock>> {
        let log_manager = Arc::new(LogManager::with_clock(100, FakeClock::new()));
        Arc::new(ManagedProcess::new(
            "web",
            "irrelevant under a mock runner",
            HashMap::new(),
            None,
            None,
            Arc::new(runner),
            log_manager,
            FakeClock::new(),
            test_events(),
        ))
    }

    #[tokio::test]
    async fn start_transitions_to_running_and_records_pid() {
        let proc = process(MockRunner::new(MockBehavior::ExitsOnAnySignal));
        proc.start().await.unwrap();
        let info = proc.info();
        assert_eq!(info.status, ProcessState::Running);
        assert!(info.pid.is_some());
    }

    #[tokio::test]
    async fn start_while_running_is_rejected() {
        let proc = process(MockRunner::new(MockBehavior::ExitsOnAnySignal));
        proc.start().await.unwrap();
        let err = proc.start().await.unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::ProcessAlreadyRunning);
    }

    #[tokio::test]
    async fn stop_while_stopped_is_rejected() {
        let proc = process(MockRunner::new(MockBehavior::ExitsOnAnySignal));
        let err = proc.stop(Duration::from_millis(100)).await.unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::ProcessNotRunning);
    }

    #[tokio::test]
    async fn stop_signals_term_and_settles_stopped() {
        let proc = process(MockRunner::new(MockBehavior::ExitsOnAnySignal));
        proc.start().await.unwrap();
        proc.stop(Duration::from_secs(1)).await.unwrap();
        // allow the monitor task to observe the exit and flip state
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(proc.info().status, ProcessState::Stopped);
    }

    #[tokio::test]
    async fn ignored_term_escalates_to_kill() {
        let proc = process(MockRunner::new(MockBehavior::IgnoresTerm));
        proc.start().await.unwrap();
        proc.stop(Duration::from_millis(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(proc.info().status, ProcessState::Stopped);
    }

    #[tokio::test]
    async fn immediate_exit_is_reported_as_crashed() {
        let proc = process(MockRunner::new(MockBehavior::ExitImmediately(7)));
        proc.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(proc.info().status, ProcessState::Crashed);
    }

    #[tokio::test]
    async fn crash_broadcasts_process_crashed_event() {
        let log_manager = Arc::new(LogManager::with_clock(100, FakeClock::new()));
        let events = test_events();
        let proc = Arc::new(ManagedProcess::new(
            "web",
            "irrelevant under a mock runner",
            HashMap::new(),
            None,
            None,
            Arc::new(MockRunner::new(MockBehavior::ExitImmediately(7))),
            log_manager,
            FakeClock::new(),
            Arc::clone(&events),
        ));
        let mut sub = events.subscribe((|_: &px_core::SupervisorEvent| true) as fn(&px_core::SupervisorEvent) -> bool);
        proc.start().await.unwrap();
        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.kind, px_core::SupervisorEventKind::ProcessCrashed);
        assert_eq!(event.process_name.as_deref(), Some("web"));
    }

    #[tokio::test]
    async fn restart_increments_count_and_ends_running() {
        let proc = process(MockRunner::new(MockBehavior::ExitsOnAnySignal));
        proc.start().await.unwrap();
        proc.restart(Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let info = proc.info();
        assert_eq!(info.restarts, 1);
        assert_eq!(info.status, ProcessState::Running);
    }

    #[tokio::test]
    async fn restart_on_already_stopped_process_ignores_not_running() {
        let proc = process(MockRunner::new(MockBehavior::ExitsOnAnySignal));
        proc.restart(Duration::from_millis(50)).await.unwrap();
        assert_eq!(proc.info().restarts, 1);
        assert_eq!(proc.info().status, ProcessState::Running);
    }

    #[tokio::test]
    async fn health_status_visible_on_info_after_start() {
        let log_manager = Arc::new(LogManager::with_clock(100, FakeClock::new()));
        let health = HealthConfig {
            cmd: "true".to_string(),
            interval: Duration::from_millis(50),
            timeout: Duration::from_secs(1),
            retries: 2,
            start_period: Duration::from_millis(10),
        };
        let proc = Arc::new(ManagedProcess::new(
            "web",
            "irrelevant",
            HashMap::new(),
            None,
            Some(health),
            Arc::new(px_runner::UnixRunner::new()),
            log_manager,
            FakeClock::new(),
            test_events(),
        ));
        proc.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let info = proc.info();
        assert_eq!(info.health, HealthStatus::Healthy);
        proc.stop(Duration::from_secs(1)).await.unwrap();
    }
}
