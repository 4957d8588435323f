// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon binary, in the
//! teacher's `oj-daemon::env` style.

use std::time::Duration;

/// Deadline given to `Supervisor::stop` on `SIGINT`/`SIGTERM` (SPEC_FULL
/// §4.13), overridable via `PROX_SHUTDOWN_TIMEOUT_MS` (default 10s).
pub fn shutdown_timeout() -> Duration {
    std::env::var("PROX_SHUTDOWN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(10))
}
