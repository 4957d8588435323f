// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor (spec §4.7): owns the process map and orchestrates bulk and
//! per-process lifecycle, emitting `SupervisorEvent`s over a bounded
//! fan-out. One mutex protects the process map and top-level state; a
//! separate `Fanout` protects the event-subscriber list (spec §5).

use crate::managed_process::ManagedProcess;
use futures_util::future::join_all;
use indexmap::IndexMap;
use parking_lot::Mutex;
use px_core::{Clock, Error, ProcessConfig, ProcessState, SubscriptionId, SupervisorEvent, SystemClock};
use px_logs::{Fanout, SharedLogManager, Subscription};
use px_runner::ProcessRunner;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub(crate) type EventFanout = Fanout<SupervisorEvent, fn(&SupervisorEvent) -> bool>;

fn always(_: &SupervisorEvent) -> bool {
    true
}

/// Top-level supervisor lifecycle, separate from any single process's
/// `ProcessState` (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupervisorState {
    Stopped,
    Running,
    Stopping,
}

/// Outcome of a bulk `start()` call (spec §4.7): per-process errors are
/// accumulated rather than aborting the whole call.
#[derive(Debug, Default)]
pub struct StartResult {
    pub started: Vec<String>,
    pub failed: HashMap<String, Error>,
}

struct Processes<C: Clock> {
    state: SupervisorState,
    map: IndexMap<String, Arc<ManagedProcess<C>>>,
}

/// Owns every configured process and the event fan-out. Per-process control
/// methods delegate to `ManagedProcess` without holding the process-map lock
/// across an `.await` (spec §9 "admin API as a thin read/command layer").
pub struct Supervisor<C: Clock = SystemClock> {
    runner: Arc<dyn ProcessRunner>,
    log_manager: SharedLogManager<C>,
    clock: C,
    processes: Mutex<Processes<C>>,
    events: Arc<EventFanout>,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(configs: Vec<ProcessConfig>, runner: Arc<dyn ProcessRunner>, log_manager: SharedLogManager<C>, clock: C) -> Self {
        let events = Arc::new(Fanout::new(px_logs::DEFAULT_QUEUE_SIZE));
        let mut map = IndexMap::new();
        for config in configs {
            let process = Arc::new(ManagedProcess::new(
                config.name.clone(),
                config.cmd.clone(),
                config.env.clone(),
                config.cwd.clone(),
                config.health.clone(),
                Arc::clone(&runner),
                Arc::clone(&log_manager),
                clock.clone(),
                Arc::clone(&events),
            ));
            map.insert(config.name, process);
        }
        Self {
            runner,
            log_manager,
            clock,
            processes: Mutex::new(Processes { state: SupervisorState::Stopped, map }),
            events,
        }
    }

    /// Start all configured processes, or only `names` when non-empty (spec
    /// §4.7). The supervisor transitions `stopped -> running` atomically;
    /// starting while already running is rejected without side effects.
    pub async fn start(&self, names: &[String]) -> Result<StartResult, Error> {
        let targets: Vec<Arc<ManagedProcess<C>>> = {
            let mut processes = self.processes.lock();
            if processes.state != SupervisorState::Stopped {
                return Err(Error::Internal("supervisor already running".to_string()));
            }
            let targets = if names.is_empty() {
                processes.map.values().cloned().collect()
            } else {
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    match processes.map.get(name) {
                        Some(process) => targets.push(Arc::clone(process)),
                        None => return Err(Error::ProcessNotFound(name.clone())),
                    }
                }
                targets
            };
            processes.state = SupervisorState::Running;
            targets
        };

        self.events.broadcast(&SupervisorEvent::supervisor_start(self.clock.epoch_ms()));

        let mut result = StartResult::default();
        let outcomes = join_all(targets.iter().map(|process| {
            let process = Arc::clone(process);
            async move {
                let outcome = process.start().await;
                (process.name().to_string(), outcome)
            }
        }))
        .await;

        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    if let Some(process) = self.processes.lock().map.get(&name).cloned() {
                        self.events.broadcast(&SupervisorEvent::process_started(self.clock.epoch_ms(), process.info()));
                    }
                    result.started.push(name);
                }
                Err(e) => {
                    result.failed.insert(name, e);
                }
            }
        }

        Ok(result)
    }

    /// Fan out `stop(deadline)` to every managed process in parallel, then
    /// transition to `stopped` (spec §4.7). Individual errors are logged,
    /// never fail the call.
    pub async fn stop(&self, deadline: Duration) {
        {
            let mut processes = self.processes.lock();
            processes.state = SupervisorState::Stopping;
        }

        let targets: Vec<Arc<ManagedProcess<C>>> = self.processes.lock().map.values().cloned().collect();
        join_all(targets.iter().map(|process| {
            let process = Arc::clone(process);
            async move {
                if let Err(e) = process.stop(deadline).await {
                    warn!(process = %process.name(), error = %e, "stop failed during supervisor shutdown");
                }
            }
        }))
        .await;

        for process in &targets {
            self.events.broadcast(&SupervisorEvent::process_stopped(self.clock.epoch_ms(), process.info()));
        }

        {
            let mut processes = self.processes.lock();
            processes.state = SupervisorState::Stopped;
        }
        self.events.broadcast(&SupervisorEvent::supervisor_stop(self.clock.epoch_ms()));
        self.log_manager.shutdown();
        self.events.close();
    }

    fn get(&self, name: &str) -> Result<Arc<ManagedProcess<C>>, Error> {
        self.processes.lock().map.get(name).cloned().ok_or_else(|| Error::ProcessNotFound(name.to_string()))
    }

    pub async fn start_process(&self, name: &str) -> Result<(), Error> {
        let process = self.get(name)?;
        process.start().await?;
        self.events.broadcast(&SupervisorEvent::process_started(self.clock.epoch_ms(), process.info()));
        Ok(())
    }

    pub async fn stop_process(&self, name: &str, deadline: Duration) -> Result<(), Error> {
        let process = self.get(name)?;
        process.stop(deadline).await?;
        self.events.broadcast(&SupervisorEvent::process_stopped(self.clock.epoch_ms(), process.info()));
        Ok(())
    }

    pub async fn restart_process(&self, name: &str, deadline: Duration) -> Result<(), Error> {
        let process = self.get(name)?;
        process.restart(deadline).await?;
        self.events.broadcast(&SupervisorEvent::process_started(self.clock.epoch_ms(), process.info()));
        Ok(())
    }

    pub fn info(&self, name: &str) -> Result<px_core::ProcessInfo, Error> {
        Ok(self.get(name)?.info())
    }

    pub fn processes(&self) -> Vec<px_core::ProcessInfo> {
        self.processes.lock().map.values().map(|process| process.info()).collect()
    }

    pub fn subscribe(&self) -> Subscription<SupervisorEvent> {
        self.events.subscribe(always as fn(&SupervisorEvent) -> bool)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use px_core::FakeClock;
    use px_logs::LogManager;
    use px_runner::{MockBehavior, MockRunner};

    fn config(name: &str) -> ProcessConfig {
        ProcessConfig { name: name.to_string(), cmd: "irrelevant".to_string(), env: HashMap::new(), cwd: None, env_file: None, health: None }
    }

    fn supervisor(behavior: MockBehavior) -> Supervisor<FakeClock> {
        let log_manager = Arc::new(LogManager::with_clock(100, FakeClock::new()));
        Supervisor::new(
            vec![config("web"), config("worker")],
            Arc::new(MockRunner::new(behavior)),
            log_manager,
            FakeClock::new(),
        )
    }

    #[tokio::test]
    async fn bulk_start_reports_all_started() {
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        let result = sup.start(&[]).await.unwrap();
        assert_eq!(result.started.len(), 2);
        assert!(result.failed.is_empty());
        let infos = sup.processes();
        assert!(infos.iter().all(|i| i.status == ProcessState::Running));
    }

    #[tokio::test]
    async fn starting_named_subset_only_starts_those() {
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        let result = sup.start(&["web".to_string()]).await.unwrap();
        assert_eq!(result.started, vec!["web".to_string()]);
        assert_eq!(sup.info("worker").unwrap().status, ProcessState::Stopped);
    }

    #[tokio::test]
    async fn starting_unknown_process_name_fails() {
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        let err = sup.start(&["nonexistent".to_string()]).await.unwrap_err();
        assert_eq!(err.code(), px_core::ErrorCode::ProcessNotFound);
    }

    #[tokio::test]
    async fn starting_unknown_process_name_leaves_supervisor_stopped() {
        // A rejected name lookup must not wedge the supervisor in `running`
        // with nothing actually started — a subsequent valid start() has to
        // succeed.
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        sup.start(&["nonexistent".to_string()]).await.unwrap_err();
        let result = sup.start(&[]).await.unwrap();
        assert_eq!(result.started.len(), 2);
    }

    #[tokio::test]
    async fn stop_settles_all_processes_stopped() {
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        sup.start(&[]).await.unwrap();
        sup.stop(Duration::from_secs(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sup.processes().iter().all(|i| i.status == ProcessState::Stopped));
    }

    #[tokio::test]
    async fn per_process_restart_increments_count() {
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        sup.start(&[]).await.unwrap();
        sup.restart_process("web", Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sup.info("web").unwrap().restarts, 1);
    }

    #[tokio::test]
    async fn event_subscription_observes_start_then_process_started() {
        let sup = supervisor(MockBehavior::ExitsOnAnySignal);
        let mut sub = sup.subscribe();
        sup.start(&["web".to_string()]).await.unwrap();
        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.kind, px_core::SupervisorEventKind::SupervisorStart);
        let second = sub.receiver.recv().await.unwrap();
        assert_eq!(second.kind, px_core::SupervisorEventKind::ProcessStarted);
    }

    #[tokio::test]
    async fn unsolicited_crash_broadcasts_process_crashed() {
        // spec §3/§4.5: starting|running --observes unexpected exit-->
        // crashed must notify subscribers, not just the system log.
        let sup = supervisor(MockBehavior::ExitImmediately(7));
        let mut sub = sup.subscribe();
        sup.start(&["web".to_string()]).await.unwrap();

        let mut saw_crash = false;
        for _ in 0..4 {
            let event = sub.receiver.recv().await.unwrap();
            if event.kind == px_core::SupervisorEventKind::ProcessCrashed {
                assert_eq!(event.process_name.as_deref(), Some("web"));
                saw_crash = true;
                break;
            }
        }
        assert!(saw_crash, "expected a ProcessCrashed event after the process exited on its own");
    }
}
