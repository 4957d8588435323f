// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration and lifecycle state.

use crate::health::{HealthConfig, HealthStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A single configured process (spec §3 ProcessConfig). Immutable once the
/// supervisor has started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessConfig {
    pub name: String,
    pub cmd: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Read relative to the config file's directory and composed into `env`
    /// at load time (SPEC_FULL §4.11 env composition order).
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    #[serde(default)]
    pub health: Option<HealthConfig>,
}

/// Lifecycle state of a managed process (spec §3/§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Crashed,
}

impl ProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Crashed => "crashed",
        }
    }

    /// Whether a live child (and health checker) may exist in this state.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }
}

/// Point-in-time snapshot of a managed process, used for the admin API's
/// `ProcessInfo` JSON (spec §6) and for `SupervisorEvent` snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    pub status: ProcessState,
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub restarts: u32,
    pub health: HealthStatus,
    pub healthcheck: Option<HealthCheckInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckInfo {
    pub enabled: bool,
    pub status: HealthStatus,
    pub last_check: Option<u64>,
    pub last_output: String,
    pub consecutive_failures: u32,
}
