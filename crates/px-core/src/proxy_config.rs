// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proxy configuration domain types (SPEC_FULL §3 `ProxyConfig`,
//! `ServiceTarget`, `CertConfig`). Kept in `px-core` rather than `px-config`
//! so that `px-proxy` can depend on the shapes without depending on the
//! config-loading crate itself (SPEC_FULL §9 "config as a pure data
//! boundary").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Where a subdomain's traffic is forwarded (spec §3). Accepts either a bare
/// port number or the `{port, host}` form in YAML (SPEC_FULL §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceTarget {
    Port(u16),
    Full {
        #[serde(default = "default_host")]
        host: String,
        port: u16,
    },
}

impl ServiceTarget {
    pub fn host(&self) -> &str {
        match self {
            Self::Port(_) => "127.0.0.1",
            Self::Full { host, .. } => host,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Port(port) => *port,
            Self::Full { port, .. } => *port,
        }
    }
}

/// Proxy block of the top-level config (spec §3/§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub https_port: Option<u16>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub services: HashMap<String, ServiceTarget>,
    /// Capture configuration (SPEC_FULL §4.9); not part of the original
    /// distilled spec's wire contract but needed for a runnable capture
    /// store, so it defaults to disabled and is additive only.
    #[serde(default)]
    pub capture: Option<CaptureConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default)]
    pub overflow_to_file: bool,
    #[serde(default = "default_capture_dir")]
    pub dir: PathBuf,
}

fn default_max_body_size() -> usize {
    64 * 1024
}

fn default_capture_dir() -> PathBuf {
    PathBuf::from(".prox/captures")
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_body_size: default_max_body_size(),
            overflow_to_file: false,
            dir: default_capture_dir(),
        }
    }
}

/// Cert block (spec §3 `CertConfig`). Provisioning is out of scope (spec
/// §1) — Prox only loads pre-provisioned cert/key paths under `dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CertConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub auto_generate: bool,
}

impl CertConfig {
    pub fn cert_path(&self) -> PathBuf {
        self.dir.join("cert.pem")
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join("key.pem")
    }
}
