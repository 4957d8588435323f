// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! px-supervisor: the managed-process state machine, health checker, and
//! supervisor that composes them (spec §4.5–§4.7). Grounded on
//! `oj-engine`/`oj-daemon::engine`'s runtime/monitor/lifecycle split.

pub mod health;
pub mod managed_process;
pub mod supervisor;

pub use health::HealthChecker;
pub use managed_process::{ManagedProcess, DRAIN_DEADLINE, KILL_GRACE};
pub use supervisor::{StartResult, Supervisor};
