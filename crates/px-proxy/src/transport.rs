// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared backend connection pool (spec §4.10 "Transport"): one
//! `reqwest::Client` reused across every proxied request, configured with a
//! dial timeout, keepalive, a per-request timeout standing in for a
//! per-backend response-header timeout (`reqwest` has no separate knob for
//! that — see DESIGN.md), and idle-connection bounds.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub dial_timeout: Duration,
    pub keepalive: Duration,
    pub response_header_timeout: Duration,
    pub max_idle_connections: usize,
    pub idle_connection_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            keepalive: Duration::from_secs(60),
            response_header_timeout: Duration::from_secs(30),
            max_idle_connections: 100,
            idle_connection_timeout: Duration::from_secs(90),
        }
    }
}

/// Build the shared transport. Construction only fails if the TLS backend
/// itself cannot initialize, which in practice never happens with the
/// `rustls-tls` feature.
pub fn build_client(config: &TransportConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(config.dial_timeout)
        .tcp_keepalive(config.keepalive)
        .timeout(config.response_header_timeout)
        .pool_max_idle_per_host(config.max_idle_connections)
        .pool_idle_timeout(config.idle_connection_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_default()
}
