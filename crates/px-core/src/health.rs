// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health checker configuration and observed state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum bytes of combined stdout/stderr retained from a health check.
pub const MAX_HEALTH_OUTPUT_LEN: usize = 1000;
const TRUNCATION_MARKER: &str = "... (truncated)";

/// User-configured health check (spec §3/§4.6). `cmd` is run via `sh -c`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthConfig {
    pub cmd: String,
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(with = "humantime_serde", default = "default_start_period")]
    pub start_period: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}
fn default_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_retries() -> u32 {
    3
}
fn default_start_period() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

/// Observed health state for a single managed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    pub status: HealthStatus,
    pub last_check: Option<u64>,
    pub last_output: String,
    pub consecutive_failures: u32,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_check: None,
            last_output: String::new(),
            consecutive_failures: 0,
        }
    }
}

impl HealthState {
    /// Record a successful check: resets the failure count and flips to healthy.
    pub fn record_success(&mut self, at: u64, output: &str) {
        self.status = HealthStatus::Healthy;
        self.consecutive_failures = 0;
        self.last_check = Some(at);
        self.last_output = truncate_output(output);
    }

    /// Record a failed check (non-zero exit or timeout). Flips to unhealthy
    /// once `consecutive_failures` reaches `retries`.
    pub fn record_failure(&mut self, at: u64, output: &str, retries: u32) {
        self.consecutive_failures += 1;
        self.last_check = Some(at);
        self.last_output = truncate_output(output);
        if self.consecutive_failures >= retries {
            self.status = HealthStatus::Unhealthy;
        }
    }
}

/// Truncate combined health-check output to [`MAX_HEALTH_OUTPUT_LEN`] bytes,
/// appending a marker when truncation occurs (spec §3 HealthState).
pub fn truncate_output(output: &str) -> String {
    if output.len() <= MAX_HEALTH_OUTPUT_LEN {
        return output.to_string();
    }
    let mut end = MAX_HEALTH_OUTPUT_LEN;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &output[..end], TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_resets_failures_and_flips_healthy() {
        let mut state = HealthState { consecutive_failures: 2, status: HealthStatus::Unhealthy, ..Default::default() };
        state.record_success(10, "ok");
        assert_eq!(state.status, HealthStatus::Healthy);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.last_output, "ok");
    }

    #[test]
    fn failures_below_retries_stay_unknown_or_current() {
        let mut state = HealthState::default();
        state.record_failure(1, "err", 3);
        state.record_failure(2, "err", 3);
        assert_eq!(state.status, HealthStatus::Unknown);
        assert_eq!(state.consecutive_failures, 2);
    }

    #[test]
    fn failures_reaching_retries_flip_unhealthy() {
        let mut state = HealthState::default();
        for _ in 0..3 {
            state.record_failure(1, "err", 3);
        }
        assert_eq!(state.status, HealthStatus::Unhealthy);
        assert_eq!(state.consecutive_failures, 3);
    }

    #[test]
    fn output_over_cap_is_truncated_with_marker() {
        let long = "x".repeat(MAX_HEALTH_OUTPUT_LEN + 50);
        let truncated = truncate_output(&long);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncated.len(), MAX_HEALTH_OUTPUT_LEN + TRUNCATION_MARKER.len());
    }

    #[test]
    fn output_at_or_under_cap_is_untouched() {
        let short = "short output";
        assert_eq!(truncate_output(short), short);
    }
}
