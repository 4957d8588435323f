// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state behind every admin API handler (SPEC_FULL §4.12). Handlers
//! never hold the supervisor's internal locks across an `.await` — they
//! call methods that already internalize their own locking (SPEC_FULL §9).

use px_core::{Clock, SystemClock};
use px_logs::SharedLogManager;
use px_proxy::ProxyService;
use px_supervisor::Supervisor;
use std::sync::Arc;
use std::time::Duration;

/// Deadline applied to API-triggered stop/restart calls (SPEC_FULL §4.13
/// "per-call deadlines... not for the spawned process").
pub const DEFAULT_CONTROL_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState<C: Clock = SystemClock> {
    pub supervisor: Arc<Supervisor<C>>,
    pub log_manager: SharedLogManager<C>,
    pub proxy: Option<Arc<ProxyService<C>>>,
    pub control_deadline: Duration,
}

impl<C: Clock> AppState<C> {
    pub fn new(supervisor: Arc<Supervisor<C>>, log_manager: SharedLogManager<C>, proxy: Option<Arc<ProxyService<C>>>) -> Self {
        Self { supervisor, log_manager, proxy, control_deadline: DEFAULT_CONTROL_DEADLINE }
    }
}
