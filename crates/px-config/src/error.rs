// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config-loading errors (SPEC_FULL §7 `ConfigError`), with a stable
//! mapping onto the admin API's error codes.

use px_core::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid YAML in {path}: {reason}")]
    InvalidYaml { path: PathBuf, reason: String },

    #[error("invalid config: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("env file not found: {0}")]
    EnvFileNotFound(PathBuf),
}

impl ConfigError {
    /// Stable mapping onto the admin API's error codes (SPEC_FULL §7): only
    /// `NotFound` maps to `config_not_found`, every other variant
    /// (malformed YAML, a rejected field, a missing env file) maps to
    /// `invalid_config`.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::ConfigNotFound,
            Self::InvalidYaml { .. } | Self::InvalidConfig { .. } | Self::EnvFileNotFound(_) => {
                ErrorCode::InvalidConfig
            }
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field: field.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
