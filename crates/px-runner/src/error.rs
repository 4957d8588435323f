// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start process: {0}")]
    StartFailed(String),

    #[error("signal delivery failed: {0}")]
    SignalFailed(String),

    #[error("wait failed: {0}")]
    WaitFailed(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
