// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared by the supervisor and proxy, with a stable mapping to
//! the admin API's error codes (spec §6/§7).

use thiserror::Error;

/// Stable error codes exposed across the admin API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ProcessNotFound,
    ProcessAlreadyRunning,
    ProcessNotRunning,
    InvalidPattern,
    ShutdownInProgress,
    ConfigNotFound,
    InvalidConfig,
    StartFailed,
    TransportFailure,
    ProxyNotEnabled,
    StreamingNotSupported,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessNotFound => "PROCESS_NOT_FOUND",
            Self::ProcessAlreadyRunning => "PROCESS_ALREADY_RUNNING",
            Self::ProcessNotRunning => "PROCESS_NOT_RUNNING",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::ShutdownInProgress => "SHUTDOWN_IN_PROGRESS",
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::StartFailed => "START_FAILED",
            Self::TransportFailure => "TRANSPORT_FAILURE",
            Self::ProxyNotEnabled => "PROXY_NOT_ENABLED",
            Self::StreamingNotSupported => "STREAMING_NOT_SUPPORTED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Errors produced by the core domain and the supervisor/proxy that sit on
/// top of it. Every variant has a stable [`ErrorCode`] via [`Error::code`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("process not found: {0}")]
    ProcessNotFound(String),

    #[error("process already running: {0}")]
    ProcessAlreadyRunning(String),

    #[error("process not running: {0}")]
    ProcessNotRunning(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("shutdown in progress")]
    ShutdownInProgress,

    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to start process {name}: {reason}")]
    StartFailed { name: String, reason: String },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("proxy not enabled")]
    ProxyNotEnabled,

    #[error("streaming not supported: {0}")]
    StreamingNotSupported(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProcessNotFound(_) => ErrorCode::ProcessNotFound,
            Self::ProcessAlreadyRunning(_) => ErrorCode::ProcessAlreadyRunning,
            Self::ProcessNotRunning(_) => ErrorCode::ProcessNotRunning,
            Self::InvalidPattern(_) => ErrorCode::InvalidPattern,
            Self::ShutdownInProgress => ErrorCode::ShutdownInProgress,
            Self::ConfigNotFound(_) => ErrorCode::ConfigNotFound,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::StartFailed { .. } => ErrorCode::StartFailed,
            Self::TransportFailure(_) => ErrorCode::TransportFailure,
            Self::ProxyNotEnabled => ErrorCode::ProxyNotEnabled,
            Self::StreamingNotSupported(_) => ErrorCode::StreamingNotSupported,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
