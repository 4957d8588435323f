// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The YAML document shape (SPEC_FULL §6) and the resolved [`Config`] it
//! loads into. Deserialization structs mirror the wire document closely and
//! reject unknown fields; [`Config`] is the post-validation, post-env-
//! composition form the rest of Prox consumes.

use indexmap::IndexMap;
use px_core::{CertConfig, HealthConfig, ProcessConfig, ProxyConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    9090
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { host: default_api_host(), port: default_api_port() }
    }
}

/// Raw per-process document entry — the map key (not a field here) supplies
/// the process name (SPEC_FULL §3 "ProcessConfig").
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawProcessConfig {
    pub cmd: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    #[serde(default)]
    pub health: Option<HealthConfig>,
}

/// Raw top-level document (SPEC_FULL §6 YAML shape). Unknown keys at any
/// documented level are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    #[serde(default)]
    pub processes: IndexMap<String, RawProcessConfig>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub certs: Option<CertConfig>,
}

/// The fully resolved, validated configuration document handed to the
/// daemon (SPEC_FULL §3 `Config`). Env composition (parent env_file →
/// process env_file → explicit `env`, SPEC_FULL §4.11) and `${VAR}`
/// interpolation of `cmd` have already happened by the time this is built.
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub processes: IndexMap<String, ProcessConfig>,
    pub proxy: Option<ProxyConfig>,
    pub certs: Option<CertConfig>,
}
